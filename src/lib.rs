// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Entra ID login for a headless CMS admin
//!
//! An OAuth 2.0 Authorization Code + PKCE flow against the Microsoft identity
//! platform that ends in the CMS's own session cookie, served by Rocket
//! together with the site's contact form and locale redirect.

pub mod auth;
pub mod config;
pub mod contact;
pub mod locale;
pub mod server;
