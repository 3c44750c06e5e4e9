// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web server assembly
//!
//! Mounts on one Rocket instance:
//!
//! - the Entra ID login routes (`/auth/entra`, `/auth/entra/callback`,
//!   `/auth/entra/status`)
//! - the contact form (`POST /api/contact`)
//! - the localized root redirect (`GET /`)
//!
//! ## Example
//!
//! ```no_run
//! use rust_entra_login::config::Config;
//! use rust_entra_login::server;
//!
//! #[rocket::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let rocket = server::rocket_from_config(config)?;
//!     let _ = rocket.launch().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;

pub use builder::{build_rocket, figment_from_config, rocket_from_config};
