// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Locale configuration

use serde::{Deserialize, Serialize};

/// Supported site locales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Locale codes served by the site, lowercase.
    #[serde(default = "default_supported")]
    pub supported: Vec<String>,

    /// Fallback locale, must be one of `supported`.
    #[serde(default = "default_locale")]
    pub default: String,
}

fn default_supported() -> Vec<String> {
    vec!["pt".to_string(), "en".to_string()]
}

fn default_locale() -> String {
    "pt".to_string()
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            supported: default_supported(),
            default: default_locale(),
        }
    }
}
