// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Transport cookies carrying the authorization request between the
//! redirect and the callback
//!
//! The browser holds the only copy of `state` and `code_verifier`; nothing is
//! kept server-side.

use rocket::http::{Cookie, CookieJar, SameSite};
use rocket::time::{Duration, OffsetDateTime};

use super::pkce::PkceBundle;

pub const STATE_COOKIE: &str = "entra_oauth_state";
pub const VERIFIER_COOKIE: &str = "entra_oauth_verifier";

/// Lifetime of a pending authorization request, in seconds.
pub const TRANSPORT_MAX_AGE_SECS: i64 = 600;

fn transport_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::seconds(TRANSPORT_MAX_AGE_SECS))
        .build()
}

/// An already expired cookie; the browser drops its copy on receipt.
fn expired_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .path("/")
        .max_age(Duration::ZERO)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Store `state` and `code_verifier`, replacing any pending request.
pub fn store_authorization_request(jar: &CookieJar<'_>, bundle: &PkceBundle, secure: bool) {
    jar.add(transport_cookie(STATE_COOKIE, bundle.state.clone(), secure));
    jar.add(transport_cookie(
        VERIFIER_COOKIE,
        bundle.code_verifier.clone(),
        secure,
    ));
}

/// Values of the pending authorization request, if both cookies came back.
#[derive(Clone, PartialEq, Eq)]
pub struct PendingAuthorization {
    pub state: String,
    pub code_verifier: String,
}

impl std::fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("state", &"<redacted>")
            .field("code_verifier", &"<redacted>")
            .finish()
    }
}

/// Read the pending request. Empty values count as absent.
pub fn pending_authorization(jar: &CookieJar<'_>) -> Option<PendingAuthorization> {
    let read = |name: &str| {
        jar.get(name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    };
    Some(PendingAuthorization {
        state: read(STATE_COOKIE)?,
        code_verifier: read(VERIFIER_COOKIE)?,
    })
}

/// Expire both transport cookies.
///
/// Always emits the two `Set-Cookie` headers, whether or not the request
/// carried the cookies.
pub fn clear_authorization_request(jar: &CookieJar<'_>, secure: bool) {
    jar.add(expired_cookie(STATE_COOKIE, secure));
    jar.add(expired_cookie(VERIFIER_COOKIE, secure));
}
