// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity token claim extraction
//!
//! Two extractors are available behind the [`ClaimsExtractor`] trait:
//!
//! - [`UnverifiedClaims`] decodes the payload segment only. No signature,
//!   issuer, audience or expiry check is made, so any party able to reach the
//!   callback with a crafted token response would be trusted. It is the
//!   default and matches the historical behaviour of the site.
//! - [`JwksClaims`] verifies the RS256 signature against the tenant's
//!   published keys and validates `iss`, `aud` and `exp` before any claim is
//!   used. Enable it with `identity.verify_id_token: true`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use log::debug;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use super::settings::ActiveSettings;

/// Claims read from the Entra ID token.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct IdTokenClaims {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub unique_name: Option<String>,
    /// Object id of the user in the tenant.
    #[serde(default)]
    pub oid: Option<String>,
    #[serde(default, deserialize_with = "groups_or_empty")]
    pub groups: Vec<String>,
}

fn groups_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl IdTokenClaims {
    /// First non-blank of `email`, `preferred_username`, `upn`, `unique_name`.
    pub fn resolve_email(&self) -> Option<&str> {
        [
            &self.email,
            &self.preferred_username,
            &self.upn,
            &self.unique_name,
        ]
        .into_iter()
        .filter_map(|claim| claim.as_deref())
        .map(str::trim)
        .find(|claim| !claim.is_empty())
    }

    /// Group policy: when `allowed_group_id` is unset everyone is allowed.
    pub fn is_member_of(&self, allowed_group_id: Option<&str>) -> bool {
        match allowed_group_id {
            None => true,
            Some(group) => self.groups.iter().any(|g| g == group),
        }
    }
}

#[derive(Debug, Error)]
pub enum IdTokenError {
    #[error("Identity token is not a JWT")]
    Malformed,

    #[error("Identity token payload is not valid Base64URL: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Identity token payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Identity token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("No signing key matches kid {0:?}")]
    UnknownKey(Option<String>),

    #[error("Signing keys unavailable: {0}")]
    Keys(String),
}

/// Turns the raw `id_token` into claims.
#[async_trait]
pub trait ClaimsExtractor: Send + Sync {
    async fn extract(
        &self,
        id_token: &str,
        settings: &ActiveSettings<'_>,
    ) -> Result<IdTokenClaims, IdTokenError>;
}

/// Payload decoding without signature verification.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedClaims;

/// Decode the middle segment of a compact JWT.
pub fn decode_payload(id_token: &str) -> Result<IdTokenClaims, IdTokenError> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_)) if !payload.is_empty() => payload,
        _ => return Err(IdTokenError::Malformed),
    };
    // Some issuers pad their segments
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl ClaimsExtractor for UnverifiedClaims {
    async fn extract(
        &self,
        id_token: &str,
        _settings: &ActiveSettings<'_>,
    ) -> Result<IdTokenClaims, IdTokenError> {
        decode_payload(id_token)
    }
}

/// Signature and standard-claim verification against the tenant JWKS.
///
/// Key sets are cached per tenant. A token signed with a `kid` missing from
/// the cached set triggers one refetch, which picks up key rotation.
#[derive(Debug, Clone)]
pub struct JwksClaims {
    client: reqwest::Client,
    authority_host: String,
    keys: Arc<RwLock<HashMap<String, Arc<JwkSet>>>>,
}

impl JwksClaims {
    pub fn new(authority_host: &str, timeout: Duration) -> Result<Self, IdTokenError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdTokenError::Keys(e.to_string()))?;
        Ok(Self {
            client,
            authority_host: authority_host.trim_end_matches('/').to_string(),
            keys: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    fn keys_url(&self, tenant_id: &str) -> String {
        format!("{}/{}/discovery/v2.0/keys", self.authority_host, tenant_id)
    }

    fn issuer(&self, tenant_id: &str) -> String {
        format!("{}/{}/v2.0", self.authority_host, tenant_id)
    }

    fn cached_keys(&self, tenant_id: &str) -> Option<Arc<JwkSet>> {
        self.keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .cloned()
    }

    /// Key set of `tenant_id` containing `kid`, refetched when the cached
    /// set does not know it.
    async fn keys_for(&self, tenant_id: &str, kid: &str) -> Result<Arc<JwkSet>, IdTokenError> {
        if let Some(keys) = self.cached_keys(tenant_id) {
            if keys.find(kid).is_some() {
                return Ok(keys);
            }
        }
        let keys = Arc::new(self.fetch_keys(tenant_id).await?);
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant_id.to_string(), keys.clone());
        Ok(keys)
    }

    async fn fetch_keys(&self, tenant_id: &str) -> Result<JwkSet, IdTokenError> {
        let url = self.keys_url(tenant_id);
        debug!("Fetching signing keys from {}", url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| IdTokenError::Keys(e.to_string()))?;
        if !response.status().is_success() {
            return Err(IdTokenError::Keys(format!(
                "key endpoint answered with status {}",
                response.status()
            )));
        }
        response
            .json::<JwkSet>()
            .await
            .map_err(|e| IdTokenError::Keys(e.to_string()))
    }
}

#[async_trait]
impl ClaimsExtractor for JwksClaims {
    async fn extract(
        &self,
        id_token: &str,
        settings: &ActiveSettings<'_>,
    ) -> Result<IdTokenClaims, IdTokenError> {
        let header = decode_header(id_token)?;
        let kid = header
            .kid
            .as_deref()
            .ok_or(IdTokenError::UnknownKey(None))?;
        let keys = self.keys_for(settings.tenant_id, kid).await?;
        let jwk = keys
            .find(kid)
            .ok_or_else(|| IdTokenError::UnknownKey(Some(kid.to_string())))?;
        let key = DecodingKey::from_jwk(jwk)?;

        // Entra signs ID tokens with RS256 only
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[settings.client_id]);
        validation.set_issuer(&[self.issuer(settings.tenant_id)]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);

        let data = decode::<IdTokenClaims>(id_token, &key, &validation)?;
        Ok(data.claims)
    }
}
