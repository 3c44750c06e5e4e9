// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Entra ID login routes
//!
//! - `GET /auth/entra` starts an Authorization Code + PKCE login
//! - `GET /auth/entra/callback` completes it and issues the CMS session
//! - `GET /auth/entra/status` tells the login page whether to show the button

use log::{debug, error, info, warn};
use rocket::http::CookieJar;
use rocket::response::Redirect;
use rocket::serde::json::Json;
use rocket::{get, State};
use serde::{Deserialize, Serialize};

use super::cookies::{
    clear_authorization_request, pending_authorization, store_authorization_request,
};
use super::error::EntraAuthError;
use super::origin::RequestOrigin;
use super::pkce::PkceBundle;
use super::provider::TokenExchangeError;
use super::settings::ActiveSettings;
use super::users::{LocalUser, NewUser, UserStoreError};
use super::AuthState;

/// Redirect URI sent to the provider; identical for both legs of the flow.
fn redirect_uri(
    settings: &ActiveSettings<'_>,
    origin: &RequestOrigin,
) -> Result<String, EntraAuthError> {
    match settings.redirect_uri {
        Some(uri) => Ok(uri.to_string()),
        None => origin.callback_uri().ok_or(EntraAuthError::UnknownOrigin),
    }
}

/// Start a login: store `state`/`code_verifier` and send the browser to the
/// provider.
#[get("/auth/entra")]
pub async fn start_login(
    origin: RequestOrigin,
    jar: &CookieJar<'_>,
    auth: &State<AuthState>,
) -> Result<Redirect, EntraAuthError> {
    let settings = auth.settings.entra_settings().await?;
    let active = settings.active().ok_or(EntraAuthError::NotConfigured)?;

    let bundle = PkceBundle::generate()?;
    let redirect_uri = redirect_uri(&active, &origin)?;
    let url = auth
        .provider
        .authorize_url(&active, &redirect_uri, &bundle.state, &bundle.code_challenge)
        .map_err(|e| EntraAuthError::Provider(e.to_string()))?;

    store_authorization_request(jar, &bundle, origin.secure);
    debug!("Redirecting to Entra tenant {}", active.tenant_id);
    Ok(Redirect::found(url.to_string()))
}

/// Find the user by email, creating an OAuth-only account on first login.
async fn resolve_user(
    auth: &AuthState,
    email: &str,
    entra_id: Option<String>,
) -> Result<LocalUser, EntraAuthError> {
    if let Some(user) = auth.users.find_by_email(email).await? {
        return Ok(user);
    }
    match auth.users.create(NewUser::oauth_only(email, entra_id)?).await {
        Ok(user) => {
            info!("Created user {} on first Entra login", user.id);
            Ok(user)
        }
        // Lost a race with a concurrent first login
        Err(UserStoreError::Duplicate(_)) => auth
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| UserStoreError::Unavailable("user vanished after create".into()).into()),
        Err(e) => Err(e.into()),
    }
}

/// Complete a login.
///
/// The transport cookies are expired before anything else, so every exit
/// path (success or failure) leaves no reusable `state`/`code_verifier`.
#[get("/auth/entra/callback?<code>&<state>")]
pub async fn callback(
    code: Option<String>,
    state: Option<String>,
    origin: RequestOrigin,
    jar: &CookieJar<'_>,
    auth: &State<AuthState>,
) -> Result<Redirect, EntraAuthError> {
    let pending = pending_authorization(jar);
    clear_authorization_request(jar, origin.secure);

    let (code, pending) = match (code, state, pending) {
        (Some(code), Some(state), Some(pending)) if !code.is_empty() && state == pending.state => {
            (code, pending)
        }
        _ => {
            warn!("Rejected Entra callback: missing or mismatched state");
            return Err(EntraAuthError::InvalidState);
        }
    };

    let settings = auth.settings.entra_settings().await?;
    let active = settings.active().ok_or(EntraAuthError::NotConfigured)?;

    let redirect_uri = redirect_uri(&active, &origin)?;
    let token = auth
        .provider
        .exchange_code(&active, &code, &pending.code_verifier, &redirect_uri)
        .await
        .map_err(|e| {
            match &e {
                TokenExchangeError::Rejected(_) => warn!("Entra code exchange failed: {}", e),
                _ => error!("Entra code exchange failed: {}", e),
            }
            EntraAuthError::ExchangeFailed(e)
        })?;
    let id_token = token
        .id_token
        .ok_or(EntraAuthError::ExchangeFailed(TokenExchangeError::MissingIdToken))?;

    let claims = auth.claims.extract(&id_token, &active).await.map_err(|e| {
        warn!("Entra identity token rejected: {}", e);
        EntraAuthError::IdToken(e)
    })?;
    let email = match claims.resolve_email() {
        Some(email) => email.to_string(),
        None => {
            warn!("Entra identity token carries no email claim");
            return Err(EntraAuthError::NoEmail);
        }
    };

    if !claims.is_member_of(active.allowed_group_id) {
        warn!("Entra login refused: user is not in the allowed group");
        return Err(EntraAuthError::NotAllowed);
    }

    let user = resolve_user(auth, &email, claims.oid.clone()).await?;
    let session = auth.sessions.issue(&user, &email, origin.secure).await?;
    jar.add(session.cookie);

    info!("Entra login succeeded for user {}", user.id);
    Ok(Redirect::found(auth.admin_path.clone()))
}

/// Response of the status endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntraStatus {
    pub enabled: bool,
}

/// Whether the integration is usable. A settings failure reports
/// `enabled: false`.
#[get("/auth/entra/status")]
pub async fn status(auth: &State<AuthState>) -> Json<EntraStatus> {
    let enabled = match auth.settings.entra_settings().await {
        Ok(settings) => settings.is_active(),
        Err(e) => {
            error!("Could not read Entra settings: {}", e);
            false
        }
    };
    Json(EntraStatus { enabled })
}
