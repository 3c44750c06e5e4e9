// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local session issuance
//!
//! Once a [`LocalUser`] is resolved, a [`SessionIssuer`] mints the signed
//! token the CMS admin accepts and the cookie carrying it. The bundled
//! [`JwtSessionIssuer`] produces an HS256 JWT with the same claims and cookie
//! shape as the CMS's own password login, so the admin panel cannot tell the
//! two apart.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::{Cookie, SameSite};
use rocket::time::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::users::LocalUser;
use crate::config::SessionConfig;

/// Claims of the session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Local user id.
    pub id: String,
    /// User collection slug.
    pub collection: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// A minted session: the raw token and the cookie to set.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub cookie: Cookie<'static>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session secret: {0}")]
    Secret(String),

    #[error("Session token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

/// The session/cookie issuer collaborator.
#[async_trait]
pub trait SessionIssuer: Send + Sync {
    /// Mint a session for `user`, authenticated as `email`.
    ///
    /// `secure` marks the cookie `Secure`; set it for HTTPS requests.
    async fn issue(
        &self,
        user: &LocalUser,
        email: &str,
        secure: bool,
    ) -> Result<IssuedSession, SessionError>;
}

/// HS256 session tokens following the configured expiration.
pub struct JwtSessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    collection: String,
    expiration_secs: i64,
}

impl std::fmt::Debug for JwtSessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSessionIssuer")
            .field("encoding_key", &"<EncodingKey>")
            .field("decoding_key", &"<DecodingKey>")
            .field("cookie_name", &self.cookie_name)
            .field("collection", &self.collection)
            .field("expiration_secs", &self.expiration_secs)
            .finish()
    }
}

impl JwtSessionIssuer {
    /// Create an issuer from the `session` configuration section.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let secret = base64::engine::general_purpose::STANDARD
            .decode(&config.secret)
            .map_err(|e| SessionError::Secret(e.to_string()))?;
        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret),
            decoding_key: DecodingKey::from_secret(&secret),
            cookie_name: config.cookie_name(),
            collection: config.collection.clone(),
            expiration_secs: config.token_expiration_secs,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Decode and validate a session token (signature and `exp`).
    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.required_spec_claims.insert("exp".to_string());
        let data = decode::<SessionClaims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}

#[async_trait]
impl SessionIssuer for JwtSessionIssuer {
    async fn issue(
        &self,
        user: &LocalUser,
        email: &str,
        secure: bool,
    ) -> Result<IssuedSession, SessionError> {
        let iat = Utc::now().timestamp();
        let claims = SessionClaims {
            id: user.id.to_string(),
            collection: self.collection.clone(),
            email: email.to_string(),
            iat,
            exp: iat + self.expiration_secs,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        let cookie = Cookie::build((self.cookie_name.clone(), token.clone()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(secure)
            .path("/")
            .max_age(Duration::seconds(self.expiration_secs))
            .build();

        Ok(IssuedSession { token, cookie })
    }
}
