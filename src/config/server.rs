// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server configuration

use serde::{Deserialize, Serialize};

/// Configuration for the Rocket server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The TCP port the server will listen on. Default is 8080.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server will bind to.
    ///
    /// Can be an IPv4/IPv6 address or "localhost". Default is "127.0.0.1".
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    /// The server name reported in HTTP headers and logs.
    #[serde(default = "default_name")]
    pub name: String,

    /// Externally visible origin (e.g. `https://www.example.com`).
    ///
    /// When set it replaces the origin computed from the `Host` header, which
    /// is needed behind proxies that rewrite it. Used for the default OAuth
    /// redirect URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_origin: Option<String>,

    /// Header set by a trusted reverse proxy with the client address
    /// (e.g. `X-Real-IP`).
    ///
    /// Unset means the peer address of the connection is used and client
    /// supplied address headers are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_header: Option<String>,

    /// Where a successful login lands.
    #[serde(default = "default_admin_path")]
    pub admin_path: String,
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    format!("EntraLoginServer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_admin_path() -> String {
    "/admin".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            name: default_name(),
            public_origin: None,
            ip_header: None,
            admin_path: default_admin_path(),
        }
    }
}
