// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Contact form endpoint
//!
//! `POST /api/contact` validates the submission, throttles it per client IP
//! and hands it to a [`mailer::Mailer`].

pub mod handlers;
pub mod mailer;
pub mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::ContactConfig;
use mailer::{LogMailer, MailRenderer, Mailer};
use rate_limit::RateLimiter;

pub use handlers::submit_contact;

/// Shared state of the contact endpoint, managed by Rocket.
#[derive(Clone)]
pub struct ContactState {
    pub enabled: bool,
    pub limiter: Arc<RateLimiter>,
    pub renderer: Arc<MailRenderer>,
    pub mailer: Arc<dyn Mailer>,
}

impl std::fmt::Debug for ContactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContactState")
            .field("enabled", &self.enabled)
            .field("limiter", &self.limiter)
            .field("renderer", &self.renderer)
            .finish_non_exhaustive()
    }
}

impl ContactState {
    /// State with the logging mailer.
    pub fn from_config(config: &ContactConfig) -> Result<Self> {
        let renderer =
            MailRenderer::from_config(config).context("Invalid contact.subject_template")?;
        Ok(Self {
            enabled: config.enabled,
            limiter: Arc::new(RateLimiter::new(
                config.max_requests,
                Duration::from_secs(config.window_secs),
                config.capacity,
            )),
            renderer: Arc::new(renderer),
            mailer: Arc::new(LogMailer),
        })
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}
