// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the Entra login server

use anyhow::Result;
use clap::Parser;
use log::info;
use rust_entra_login::config::{self, validate_specific_rules, Config};
use rust_entra_login::server;

use std::path::PathBuf;

/// Entra ID login and contact endpoints for the CMS site
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Web server port (default: 8080)
    #[arg(short = 'p')]
    web_port: Option<u16>,

    /// Web server address (default: 127.0.0.1)
    #[arg(short = 'a')]
    web_address: Option<String>,

    /// Base64 secret signing the session tokens
    #[arg(long)]
    session_secret: Option<String>,

    /// Read the Entra settings from this CMS instead of the configuration file
    #[arg(long, value_name = "URL")]
    cms_base_url: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.web_port,
        args.web_address.clone(),
        args.session_secret.clone(),
        args.cms_base_url.clone(),
    );
    validate_specific_rules(&config)?;

    info!(
        "Starting {} on {}:{}",
        config.server.name, config.server.address, config.server.port
    );
    let rocket = server::rocket_from_config(config)?;
    let _ = rocket.launch().await?;
    Ok(())
}
