// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Identity provider configuration
//!
//! Controls where the Entra ID integration settings are read from and how the
//! Microsoft identity platform is reached.

use serde::{Deserialize, Serialize};

use crate::auth::settings::IdentityProviderSettings;

/// Where [`IdentityProviderSettings`] are fetched from on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingsSource {
    /// Use `identity.static_settings` from this file.
    #[default]
    Static,
    /// Read the CMS global through its REST API.
    Cms,
}

/// Configuration for the Entra ID login integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Settings source. Default is `static`.
    #[serde(default)]
    pub source: SettingsSource,

    /// Settings served when `source` is `static`.
    #[serde(default)]
    pub static_settings: IdentityProviderSettings,

    /// Base URL of the CMS (e.g. `https://cms.example.com`), required for `cms`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_base_url: Option<String>,

    /// Optional CMS API key sent as `Authorization: users API-Key <key>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cms_api_key: Option<String>,

    /// Slug of the CMS global holding the `entra` group.
    #[serde(default = "default_settings_slug")]
    pub settings_slug: String,

    /// Microsoft identity platform host. Overridable for sovereign clouds and tests.
    #[serde(default = "default_authority_host")]
    pub authority_host: String,

    /// Timeout in seconds for every outbound call (CMS, token, JWKS).
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Verify the ID token signature against the tenant JWKS.
    ///
    /// When `false` the payload is decoded without any signature check.
    #[serde(default)]
    pub verify_id_token: bool,
}

fn default_settings_slug() -> String {
    "site-settings".to_string()
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            source: SettingsSource::default(),
            static_settings: IdentityProviderSettings::default(),
            cms_base_url: None,
            cms_api_key: None,
            settings_slug: default_settings_slug(),
            authority_host: default_authority_host(),
            http_timeout_secs: default_http_timeout_secs(),
            verify_id_token: false,
        }
    }
}
