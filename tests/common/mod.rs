// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared helpers for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rocket::http::Header;
use rocket::local::asynchronous::{Client, LocalResponse};
use rust_entra_login::auth::settings::{IdentityProviderSettings, StaticSettingsStore};
use rust_entra_login::auth::users::MemoryUserStore;
use rust_entra_login::auth::AuthState;
use rust_entra_login::config::Config;
use rust_entra_login::contact::ContactState;
use rust_entra_login::server;
use serde_json::Value;
use wiremock::MockServer;

pub const TEST_HOST: &str = "site.example";

/// Generate a test configuration for Rocket
pub fn get_test_figment() -> rocket::figment::Figment {
    rocket::Config::figment()
        .merge(("port", 0))
        .merge(("address", "127.0.0.1"))
        .merge(("log_level", rocket::config::LogLevel::Off))
        .merge(("secret_key", "/qCJ7RyQIugza05wgFNN6R+c2/afrKlG5jJfZ0oQPis="))
}

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn host() -> Header<'static> {
    Header::new("Host", TEST_HOST)
}

/// `enabled: true, tenantId: t1, clientId: c1`
pub fn enabled_settings() -> IdentityProviderSettings {
    IdentityProviderSettings {
        enabled: true,
        tenant_id: Some("t1".to_string()),
        client_id: Some("c1".to_string()),
        ..Default::default()
    }
}

/// Unsigned compact JWT carrying `claims`.
pub fn unsigned_id_token(claims: Value) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT","kid":"k"}"#),
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

/// A running server with a mocked Microsoft identity platform.
pub struct TestServer {
    pub client: Client,
    pub provider: MockServer,
    pub settings: StaticSettingsStore,
    pub users: MemoryUserStore,
    pub config: Config,
}

impl TestServer {
    pub async fn start(settings: IdentityProviderSettings) -> Self {
        Self::start_with(settings, |_| {}).await
    }

    pub async fn start_with<F: FnOnce(&mut Config)>(
        settings: IdentityProviderSettings,
        customize: F,
    ) -> Self {
        init_logger();
        let provider = MockServer::start().await;

        let mut config = Config::default();
        config.identity.authority_host = provider.uri();
        config.identity.static_settings = settings.clone();
        customize(&mut config);

        let settings = StaticSettingsStore::new(settings);
        let users = MemoryUserStore::new();
        let auth = AuthState::from_config(&config)
            .expect("valid auth state")
            .with_settings(Arc::new(settings.clone()))
            .with_users(Arc::new(users.clone()));
        let contact = ContactState::from_config(&config.contact).expect("valid contact state");

        let rocket = server::build_rocket(get_test_figment(), &config, auth, contact);
        let client = Client::tracked(rocket).await.expect("valid rocket instance");

        Self {
            client,
            provider,
            settings,
            users,
            config,
        }
    }
}

/// All `Set-Cookie` headers of a response.
pub fn set_cookies(response: &LocalResponse<'_>) -> Vec<String> {
    response
        .headers()
        .get("Set-Cookie")
        .map(str::to_string)
        .collect()
}

/// The `Set-Cookie` header for `name`, if any.
pub fn set_cookie<'a>(headers: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{}=", name);
    headers.iter().find(|h| h.starts_with(&prefix))
}
