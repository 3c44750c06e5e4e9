// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Site locale resolution
//!
//! The locale is taken from, in order: the first path segment, the
//! `NEXT_LOCALE` cookie, the `Accept-Language` header, and finally the
//! configured default.

use rocket::http::CookieJar;
use rocket::request::{FromRequest, Outcome};
use rocket::response::Redirect;
use rocket::{get, Request};

use crate::config::LocaleConfig;

/// Cookie remembering the visitor's locale choice.
pub const LOCALE_COOKIE: &str = "NEXT_LOCALE";

fn supported<'a>(candidate: &str, config: &'a LocaleConfig) -> Option<&'a str> {
    let candidate = candidate.trim();
    // "pt-BR" matches "pt"
    let primary = candidate.split(['-', '_']).next().unwrap_or(candidate);
    config
        .supported
        .iter()
        .find(|l| l.eq_ignore_ascii_case(candidate) || l.eq_ignore_ascii_case(primary))
        .map(String::as_str)
}

/// Languages of an `Accept-Language` header, highest quality first.
fn accepted_languages(header: &str) -> Vec<&str> {
    let mut languages: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut fields = part.split(';');
            let tag = fields.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let quality = fields
                .find_map(|f| f.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (quality > 0.0).then_some((tag, quality))
        })
        .collect();
    // Stable sort keeps header order for equal weights
    languages.sort_by(|a, b| b.1.total_cmp(&a.1));
    languages.into_iter().map(|(tag, _)| tag).collect()
}

/// Resolve the locale of a request.
pub fn resolve_locale<'a>(
    path: &str,
    cookie: Option<&str>,
    accept_language: Option<&str>,
    config: &'a LocaleConfig,
) -> &'a str {
    let first_segment = path.trim_start_matches('/').split('/').next().unwrap_or("");
    if let Some(locale) = config
        .supported
        .iter()
        .find(|l| l.as_str() == first_segment)
    {
        return locale;
    }
    if let Some(locale) = cookie.and_then(|c| supported(c, config)) {
        return locale;
    }
    if let Some(locale) = accept_language
        .map(accepted_languages)
        .and_then(|langs| langs.into_iter().find_map(|l| supported(l, config)))
    {
        return locale;
    }
    &config.default
}

/// Request guard carrying the resolved locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLocale(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestLocale {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let default_config = LocaleConfig::default();
        let config = req
            .rocket()
            .state::<LocaleConfig>()
            .unwrap_or(&default_config);
        let cookies: &CookieJar<'_> = req.cookies();
        let locale = resolve_locale(
            req.uri().path().as_str(),
            cookies.get(LOCALE_COOKIE).map(|c| c.value()),
            req.headers().get_one("Accept-Language"),
            config,
        );
        Outcome::Success(RequestLocale(locale.to_string()))
    }
}

/// Send visitors of `/` to their localized home page.
#[get("/")]
pub fn root_redirect(locale: RequestLocale) -> Redirect {
    Redirect::temporary(format!("/{}", locale.0))
}
