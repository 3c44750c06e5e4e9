// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Entra ID (Microsoft identity platform) login for the CMS admin
//!
//! Implements the OAuth 2.0 Authorization Code flow with PKCE and, on
//! success, issues the same session cookie the CMS password login does.
//!
//! The flow is stateless on the server: `state` and `code_verifier` travel in
//! two short-lived HTTP-only cookies between [`handlers::start_login`] and
//! [`handlers::callback`].
//!
//! External systems are reached through collaborator traits so they can be
//! replaced:
//!
//! - [`settings::SettingsStore`] for the integration settings
//! - [`users::UserStore`] for local user records
//! - [`session::SessionIssuer`] for the session token and cookie
//! - [`id_token::ClaimsExtractor`] for reading the identity token

pub mod cookies;
pub mod error;
pub mod handlers;
pub mod id_token;
pub mod origin;
pub mod pkce;
pub mod provider;
pub mod session;
pub mod settings;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::config::{Config, SettingsSource};
use id_token::{ClaimsExtractor, JwksClaims, UnverifiedClaims};
use provider::EntraClient;
use session::{JwtSessionIssuer, SessionIssuer};
use settings::{CmsSettingsStore, SettingsStore, StaticSettingsStore};
use users::{MemoryUserStore, UserStore};

pub use error::EntraAuthError;
pub use handlers::EntraStatus;

/// Shared state of the login routes, managed by Rocket.
#[derive(Clone)]
pub struct AuthState {
    pub settings: Arc<dyn SettingsStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionIssuer>,
    pub claims: Arc<dyn ClaimsExtractor>,
    pub provider: EntraClient,
    /// Overrides the origin computed from the request.
    pub public_origin: Option<String>,
    /// Where a successful login lands.
    pub admin_path: String,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("provider", &self.provider)
            .field("public_origin", &self.public_origin)
            .field("admin_path", &self.admin_path)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Build the default collaborators from the configuration.
    ///
    /// Users are kept in memory; pass another [`UserStore`] to
    /// [`AuthState::with_users`] to persist them elsewhere.
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_secs(config.identity.http_timeout_secs);

        let settings: Arc<dyn SettingsStore> = match config.identity.source {
            SettingsSource::Static => Arc::new(StaticSettingsStore::new(
                config.identity.static_settings.clone(),
            )),
            SettingsSource::Cms => {
                let base_url = config
                    .identity
                    .cms_base_url
                    .as_deref()
                    .context("identity.cms_base_url is required when source is cms")?;
                info!("Reading Entra settings from CMS at {}", base_url);
                Arc::new(
                    CmsSettingsStore::new(
                        base_url,
                        &config.identity.settings_slug,
                        config.identity.cms_api_key.clone(),
                        timeout,
                    )
                    .context("Failed to build the CMS settings client")?,
                )
            }
        };

        let claims: Arc<dyn ClaimsExtractor> = if config.identity.verify_id_token {
            Arc::new(
                JwksClaims::new(&config.identity.authority_host, timeout)
                    .context("Failed to build the JWKS client")?,
            )
        } else {
            warn!("Entra identity tokens are decoded without signature verification");
            Arc::new(UnverifiedClaims)
        };

        let sessions = JwtSessionIssuer::from_config(&config.session)
            .context("Failed to initialise the session issuer")?;
        let provider = EntraClient::new(&config.identity.authority_host, timeout)
            .context("Failed to build the Entra HTTP client")?;

        Ok(Self {
            settings,
            users: Arc::new(MemoryUserStore::new()),
            sessions: Arc::new(sessions),
            claims,
            provider,
            public_origin: config.server.public_origin.clone(),
            admin_path: config.server.admin_path.clone(),
        })
    }

    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_users(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = users;
        self
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionIssuer>) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_claims(mut self, claims: Arc<dyn ClaimsExtractor>) -> Self {
        self.claims = claims;
        self
    }
}
