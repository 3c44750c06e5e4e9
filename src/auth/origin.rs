// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use rocket::http::uri::Host;
use rocket::request::{FromRequest, Outcome};
use rocket::Request;

use super::AuthState;

/// Request guard giving the public origin of the request and whether it
/// came over HTTPS
///
/// The origin is `server.public_origin` when configured. Otherwise it is
/// built from the request host (the parsed authority, or the raw `Host`
/// header when the authority was not recorded), with the scheme taken from
/// the listener (TLS enabled) or from `X-Forwarded-Proto` when a proxy
/// terminates TLS.
///
/// The guard never fails: a request without a usable host only matters when
/// the default callback location is needed, see [`RequestOrigin::callback_uri`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    /// `scheme://host[:port]`, no trailing slash.
    pub origin: Option<String>,
    pub secure: bool,
}

impl RequestOrigin {
    /// Default callback location for this origin, if the origin is known.
    pub fn callback_uri(&self) -> Option<String> {
        self.origin
            .as_deref()
            .map(|origin| format!("{}/auth/entra/callback", origin))
    }
}

fn forwarded_https(req: &Request<'_>) -> bool {
    req.headers()
        .get_one("X-Forwarded-Proto")
        .and_then(|proto| proto.split(',').next())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}

/// Host of the request, only when it parses as a URI authority host.
fn request_host(req: &Request<'_>) -> Option<String> {
    if let Some(host) = req.host() {
        return Some(host.to_string());
    }
    req.headers()
        .get_one("Host")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| Host::parse(value).ok())
        .map(|host| host.to_string())
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestOrigin {
    type Error = std::convert::Infallible;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let configured = req
            .rocket()
            .state::<AuthState>()
            .and_then(|state| state.public_origin.clone());

        if let Some(origin) = configured {
            let origin = origin.trim_end_matches('/').to_string();
            let secure = origin.starts_with("https://");
            return Outcome::Success(RequestOrigin {
                origin: Some(origin),
                secure,
            });
        }

        let secure = req.rocket().config().tls_enabled() || forwarded_https(req);
        let scheme = if secure { "https" } else { "http" };
        Outcome::Success(RequestOrigin {
            origin: request_host(req).map(|host| format!("{}://{}", scheme, host)),
            secure,
        })
    }
}
