// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Microsoft identity platform (v2.0) endpoints
//!
//! Builds the authorize URL and performs the authorization-code exchange.
//! Calls carry an explicit timeout and are never retried: an authorization
//! code is single-use, so a failed exchange is reported and the user starts
//! over.

use std::time::Duration;

use log::debug;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use super::settings::ActiveSettings;

/// Scopes requested on every login.
pub const SCOPES: &str = "openid profile email";

/// Token endpoint response; only the identity token is consumed.
#[derive(Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum TokenExchangeError {
    #[error("Token endpoint rejected the code with status {0}")]
    Rejected(u16),

    #[error("Token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Token response carries no id_token")]
    MissingIdToken,

    #[error("Invalid provider URL: {0}")]
    Url(#[from] url::ParseError),
}

/// HTTP client bound to one authority host.
#[derive(Debug, Clone)]
pub struct EntraClient {
    http: reqwest::Client,
    authority_host: String,
}

impl EntraClient {
    /// Client for `authority_host` (e.g. `https://login.microsoftonline.com`).
    pub fn new(authority_host: &str, timeout: Duration) -> Result<Self, TokenExchangeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            authority_host: authority_host.trim_end_matches('/').to_string(),
        })
    }

    pub fn authorize_endpoint(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/authorize", self.authority_host, tenant_id)
    }

    pub fn token_endpoint(&self, tenant_id: &str) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, tenant_id)
    }

    /// Authorize URL carrying the PKCE challenge.
    pub fn authorize_url(
        &self,
        settings: &ActiveSettings<'_>,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<Url, TokenExchangeError> {
        let mut url = Url::parse(&self.authorize_endpoint(settings.tenant_id))?;
        url.query_pairs_mut()
            .append_pair("client_id", settings.client_id)
            .append_pair("response_type", "code")
            .append_pair("response_mode", "query")
            .append_pair("scope", SCOPES)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "S256");
        Ok(url)
    }

    /// Redeem an authorization code with the PKCE verifier.
    ///
    /// `redirect_uri` must be the exact value sent to the authorize endpoint.
    pub async fn exchange_code(
        &self,
        settings: &ActiveSettings<'_>,
        code: &str,
        code_verifier: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, TokenExchangeError> {
        let mut form = vec![
            ("client_id", settings.client_id),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = settings.client_secret {
            form.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(self.token_endpoint(settings.tenant_id))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("Token endpoint answered {}: {}", status, body);
            return Err(TokenExchangeError::Rejected(status.as_u16()));
        }

        let token: TokenResponse = response.json().await?;
        if token.id_token.as_deref().map_or(true, str::is_empty) {
            return Err(TokenExchangeError::MissingIdToken);
        }
        Ok(token)
    }
}
