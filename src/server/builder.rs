// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder and configuration

use anyhow::Result;
use base64::Engine;
use log::{debug, info};
use rand::Rng;
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use crate::auth::handlers::{callback, start_login, status};
use crate::auth::AuthState;
use crate::config::Config;
use crate::contact::{submit_contact, ContactState};
use crate::locale::root_redirect;

/// Rocket figment for the `server` section of the configuration.
///
/// Rocket's own `secret_key` is random per process: the routes use no
/// private cookies, and session tokens are signed with `session.secret`.
pub fn figment_from_config(config: &Config) -> Figment {
    let secret_key: [u8; 32] = rand::rng().random();
    rocket::Config::figment()
        .merge(("ident", config.server.name.clone()))
        .merge(("limits", Limits::new().limit("json", 64.kibibytes())))
        .merge(("address", config.server.address.clone()))
        .merge(("port", config.server.port))
        .merge(("log_level", LogLevel::Normal))
        .merge((
            "secret_key",
            base64::engine::general_purpose::STANDARD.encode(secret_key),
        ))
}

/// Build a configured Rocket server instance
///
/// ### Parameters
///
/// * `figment` - The Rocket configuration figment containing server settings
/// * `config` - The application configuration
/// * `auth` - Collaborators of the Entra login routes
/// * `contact` - State of the contact form
///
/// ### Returns
///
/// A configured Rocket instance ready to be launched
pub fn build_rocket(
    figment: Figment,
    config: &Config,
    auth: AuthState,
    contact: ContactState,
) -> Rocket<Build> {
    debug!("Login routes land on {}", auth.admin_path);
    if !contact.enabled {
        info!("Contact form is disabled");
    }

    // Client addresses key the contact rate limit: only a proxy header named
    // in the configuration may override the peer address.
    let figment = match &config.server.ip_header {
        Some(header) => {
            info!("Client addresses are read from the {} header", header);
            figment.merge(("ip_header", header.clone()))
        }
        None => figment.merge(("ip_header", false)),
    };

    rocket::custom(figment)
        .mount("/", routes![start_login, callback, status])
        .mount("/", routes![submit_contact, root_redirect])
        .manage(auth)
        .manage(contact)
        .manage(config.locale.clone())
}

/// Build the server with the default collaborators for `config`.
pub fn rocket_from_config(config: Config) -> Result<Rocket<Build>> {
    let auth = AuthState::from_config(&config)?;
    let contact = ContactState::from_config(&config.contact)?;
    let figment = figment_from_config(&config);
    Ok(build_rocket(figment, &config, auth, contact))
}
