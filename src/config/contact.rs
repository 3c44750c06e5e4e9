// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Contact form configuration

use serde::{Deserialize, Serialize};

/// Configuration for `POST /api/contact`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Enable or disable the contact endpoint. Default is `true`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Submissions allowed per client within one window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum number of clients tracked at once.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Address the messages are delivered to.
    #[serde(default = "default_recipient")]
    pub recipient: String,

    /// Handlebars template for the mail subject.
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    600
}

fn default_capacity() -> usize {
    10_000
}

fn default_recipient() -> String {
    "contact@example.com".to_string()
}

fn default_subject_template() -> String {
    "[{{locale}}] Contact from {{name}}".to_string()
}

impl Default for ContactConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            capacity: default_capacity(),
            recipient: default_recipient(),
            subject_template: default_subject_template(),
        }
    }
}
