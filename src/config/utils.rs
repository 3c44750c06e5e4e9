// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::debug;
use url::Url;

use super::{Config, SettingsSource, CONFIG_SCHEMA};

/// Minimum decoded length of the session signing secret.
const MIN_SESSION_SECRET_BYTES: usize = 32;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_entra_login --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

fn is_local_host(url: &Url) -> bool {
    matches!(
        url.host_str(),
        Some("localhost") | Some("127.0.0.1") | Some("[::1]") | Some("::1")
    )
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Returns
///
/// * `Ok(())` if all validations pass
/// * `Err(anyhow::Error)` with descriptive message if any validation fails
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    if !is_valid_ip_address(&config.server.address) {
        anyhow::bail!("Invalid server address: {}", config.server.address);
    }

    if let Some(origin) = &config.server.public_origin {
        let url = Url::parse(origin)
            .with_context(|| format!("Invalid server.public_origin: {}", origin))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("server.public_origin must be an http(s) URL: {}", origin);
        }
    }

    if !config.server.admin_path.starts_with('/') {
        anyhow::bail!(
            "server.admin_path must be an absolute path: {}",
            config.server.admin_path
        );
    }

    debug!("Validating session secret");
    let secret = base64::engine::general_purpose::STANDARD
        .decode(&config.session.secret)
        .context("session.secret is not valid base64")?;
    if secret.len() < MIN_SESSION_SECRET_BYTES {
        anyhow::bail!(
            "session.secret must decode to at least {} bytes, got {}",
            MIN_SESSION_SECRET_BYTES,
            secret.len()
        );
    }
    if config.session.token_expiration_secs <= 0 {
        anyhow::bail!("session.token_expiration_secs must be positive");
    }

    if config.identity.source == SettingsSource::Cms {
        let base = config
            .identity
            .cms_base_url
            .as_deref()
            .context("identity.cms_base_url is required when identity.source is cms")?;
        let url =
            Url::parse(base).with_context(|| format!("Invalid identity.cms_base_url: {}", base))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("identity.cms_base_url must be an http(s) URL: {}", base);
        }
    }

    let authority = Url::parse(&config.identity.authority_host).with_context(|| {
        format!(
            "Invalid identity.authority_host: {}",
            config.identity.authority_host
        )
    })?;
    if authority.scheme() != "https" && !is_local_host(&authority) {
        anyhow::bail!(
            "identity.authority_host must use https: {}",
            config.identity.authority_host
        );
    }

    if config.identity.http_timeout_secs == 0 {
        anyhow::bail!("identity.http_timeout_secs must be at least 1");
    }

    if !config
        .locale
        .supported
        .iter()
        .any(|locale| locale == &config.locale.default)
    {
        anyhow::bail!(
            "locale.default '{}' is not in locale.supported {:?}",
            config.locale.default,
            config.locale.supported
        );
    }

    if config.contact.max_requests == 0
        || config.contact.window_secs == 0
        || config.contact.capacity == 0
    {
        anyhow::bail!("contact.max_requests, contact.window_secs and contact.capacity must be non-zero");
    }

    Ok(())
}
