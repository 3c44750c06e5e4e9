// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the site backend
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! The configuration is organized as a nested structure with sections:
//! - `server`: Network binding and public origin of the Rocket server
//! - `identity`: Where the Entra ID settings come from and how the provider is reached
//! - `session`: Signing and lifetime of the local session cookie
//! - `contact`: Contact form throttling and delivery
//! - `locale`: Supported site locales
//!
//! ## Usage
//!
//! ```no_run
//! use rust_entra_login::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(8081),                                // Web port
//!     Some("0.0.0.0".to_string()),               // Web address
//!     None,                                      // Session secret
//!     Some("https://cms.example.com".to_string()), // CMS base URL
//! );
//!
//! println!("Server port: {}", config.server.port);
//! ```

pub mod contact;
pub mod identity;
pub mod locale;
pub mod server;
pub mod session;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use contact::ContactConfig;
pub use identity::{IdentityConfig, SettingsSource};
pub use locale::LocaleConfig;
pub use server::ServerConfig;
pub use session::SessionConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};

/// Embedded JSON schema used to validate configuration files before deserialization.
const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its defaults when omitted, so an empty YAML
/// document is a valid configuration that serves a disabled Entra login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Settings for the HTTP server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Identity provider settings source and provider endpoints.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Local session issuance.
    #[serde(default)]
    pub session: SessionConfig,

    /// Contact form.
    #[serde(default)]
    pub contact: ContactConfig,

    /// Supported locales and the default one.
    #[serde(default)]
    pub locale: LocaleConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is replaced by the default configuration, which is
    /// written back to `path`. Schema or rule violations produce a
    /// `<name>.sample.yaml` next to the rejected file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        Self::from_yaml_str(&contents).or_else(|err| {
            if let Err(sample_err) = Self::create_sample_config(path) {
                error!("Failed to create sample config: {}", sample_err);
            }
            Err(err.context(format!("Invalid configuration in {}", path.display())))
        })
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document is a valid, all-defaults configuration
        let yaml_value: serde_yml::Value = if contents.trim().is_empty() {
            serde_yml::Value::Mapping(Default::default())
        } else {
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?
        };

        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build JSON schema validator")?;

        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_json::from_value(json_value).context("Failed to deserialize configuration")?;

        validate_specific_rules(&config)?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were actually provided override the loaded values.
    /// Supplying a CMS base URL also switches the settings source to the CMS.
    pub fn apply_args(
        &mut self,
        web_port: Option<u16>,
        web_address: Option<String>,
        session_secret: Option<String>,
        cms_base_url: Option<String>,
    ) {
        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.server.port = web_port;
        }

        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.server.address = web_address;
        }

        if let Some(secret) = session_secret {
            debug!("Overriding session secret from command line");
            self.session.secret = secret;
        }

        if let Some(base_url) = cms_base_url {
            debug!("Overriding CMS base URL from command line: {}", base_url);
            self.identity.cms_base_url = Some(base_url);
            self.identity.source = SettingsSource::Cms;
        }
    }
}
