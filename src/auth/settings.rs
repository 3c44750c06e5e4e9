// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Entra ID integration settings and where they are read from
//!
//! The settings are owned by the CMS administrators and fetched on every
//! request, so toggling the integration takes effect immediately. Two stores
//! are provided:
//!
//! - [`StaticSettingsStore`] serves settings from the configuration file and
//!   can be swapped at runtime.
//! - [`CmsSettingsStore`] reads the CMS global (`GET /api/globals/<slug>`) and
//!   decodes its `entra` group.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Settings of the Entra ID integration, as stored in the CMS global.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityProviderSettings {
    #[serde(default, deserialize_with = "null_as_false")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_group_id: Option<String>,
}

impl std::fmt::Debug for IdentityProviderSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityProviderSettings")
            .field("enabled", &self.enabled)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("redirect_uri", &self.redirect_uri)
            .field("allowed_group_id", &self.allowed_group_id)
            .finish()
    }
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Settings that passed the configuration gate.
///
/// Only obtainable through [`IdentityProviderSettings::active`], so holding
/// one proves the integration is enabled with a tenant and a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSettings<'a> {
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: Option<&'a str>,
    pub redirect_uri: Option<&'a str>,
    pub allowed_group_id: Option<&'a str>,
}

impl IdentityProviderSettings {
    /// The usable settings, or `None` when disabled or missing tenant/client.
    ///
    /// Blank strings count as missing.
    pub fn active(&self) -> Option<ActiveSettings<'_>> {
        if !self.enabled {
            return None;
        }
        Some(ActiveSettings {
            tenant_id: non_empty(&self.tenant_id)?,
            client_id: non_empty(&self.client_id)?,
            client_secret: non_empty(&self.client_secret),
            redirect_uri: non_empty(&self.redirect_uri),
            allowed_group_id: non_empty(&self.allowed_group_id),
        })
    }

    /// `enabled && tenantId present && clientId present`.
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }
}

/// Errors raised while fetching settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Settings endpoint answered with status {0}")]
    Status(u16),

    #[error("Settings store unavailable: {0}")]
    Unavailable(String),
}

/// Source of [`IdentityProviderSettings`] (the CMS `findGlobal` collaborator).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn entra_settings(&self) -> Result<IdentityProviderSettings, SettingsError>;
}

/// Settings held in memory, initialised from the configuration file.
#[derive(Debug, Clone, Default)]
pub struct StaticSettingsStore {
    settings: Arc<RwLock<IdentityProviderSettings>>,
}

impl StaticSettingsStore {
    pub fn new(settings: IdentityProviderSettings) -> Self {
        Self {
            settings: Arc::new(RwLock::new(settings)),
        }
    }

    /// Replace the served settings; clones share the update.
    pub fn replace(&self, settings: IdentityProviderSettings) -> Result<(), SettingsError> {
        let mut guard = self
            .settings
            .write()
            .map_err(|e| SettingsError::Unavailable(e.to_string()))?;
        *guard = settings;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for StaticSettingsStore {
    async fn entra_settings(&self) -> Result<IdentityProviderSettings, SettingsError> {
        self.settings
            .read()
            .map(|guard| guard.clone())
            .map_err(|e| SettingsError::Unavailable(e.to_string()))
    }
}

/// Shape of the CMS global document; only the `entra` group is read.
#[derive(Debug, Deserialize)]
struct GlobalDocument {
    #[serde(default)]
    entra: Option<IdentityProviderSettings>,
}

/// Settings read from the CMS REST API on every call.
#[derive(Debug, Clone)]
pub struct CmsSettingsStore {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl CmsSettingsStore {
    /// Store reading `{base_url}/api/globals/{slug}`.
    pub fn new(
        base_url: &str,
        slug: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SettingsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: format!("{}/api/globals/{}", base_url.trim_end_matches('/'), slug),
            api_key,
        })
    }
}

#[async_trait]
impl SettingsStore for CmsSettingsStore {
    async fn entra_settings(&self) -> Result<IdentityProviderSettings, SettingsError> {
        debug!("Fetching identity settings from {}", self.url);
        let mut request = self.client.get(&self.url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("users API-Key {}", key));
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SettingsError::Status(status.as_u16()));
        }
        let document: GlobalDocument = response.json().await?;
        Ok(document.entra.unwrap_or_default())
    }
}
