// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Session cookie configuration

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Configuration for the signed session cookie issued after login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// HS256 signing key, Base64 encoded. Must decode to at least 32 bytes.
    #[serde(default = "default_session_secret")]
    pub secret: String,

    /// Lifetime of the session token and cookie in seconds. Default is 7200.
    #[serde(default = "default_token_expiration_secs")]
    pub token_expiration_secs: i64,

    /// Cookie name prefix; the cookie is named `<prefix>-token`.
    #[serde(default = "default_cookie_prefix")]
    pub cookie_prefix: String,

    /// User collection slug embedded in the token.
    #[serde(default = "default_collection")]
    pub collection: String,
}

/// Generate a random session secret.
///
/// Sessions signed with a generated secret do not survive a restart.
fn default_session_secret() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    let secret: [u8; 32] = rng.random();
    base64::engine::general_purpose::STANDARD.encode(secret)
}

fn default_token_expiration_secs() -> i64 {
    7200
}

fn default_cookie_prefix() -> String {
    "payload".to_string()
}

fn default_collection() -> String {
    "users".to_string()
}

impl SessionConfig {
    /// Name of the session cookie.
    pub fn cookie_name(&self) -> String {
        format!("{}-token", self.cookie_prefix)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: default_session_secret(),
            token_expiration_secs: default_token_expiration_secs(),
            cookie_prefix: default_cookie_prefix(),
            collection: default_collection(),
        }
    }
}
