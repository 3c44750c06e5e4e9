// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Delivery of contact form messages

use async_trait::async_trait;
use handlebars::Handlebars;
use log::info;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ContactConfig;

/// Template of the message body.
const BODY_TEMPLATE: &str = include_str!("../../resources/mail/contact.hbs");

/// A validated contact form submission.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
    pub locale: String,
}

/// A rendered mail ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub reply_to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

impl From<handlebars::RenderError> for MailerError {
    fn from(err: handlebars::RenderError) -> Self {
        MailerError::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for MailerError {
    fn from(err: handlebars::TemplateError) -> Self {
        MailerError::Template(err.to_string())
    }
}

/// Renders contact messages into mails.
pub struct MailRenderer {
    registry: Handlebars<'static>,
    recipient: String,
}

impl std::fmt::Debug for MailRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailRenderer")
            .field("recipient", &self.recipient)
            .finish_non_exhaustive()
    }
}

impl MailRenderer {
    pub fn from_config(config: &ContactConfig) -> Result<Self, MailerError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string("subject", &config.subject_template)?;
        registry.register_template_string("body", BODY_TEMPLATE)?;
        Ok(Self {
            registry,
            recipient: config.recipient.clone(),
        })
    }

    pub fn render(&self, message: &ContactMessage) -> Result<OutgoingMail, MailerError> {
        let data = json!(message);
        // Subjects are a single header line
        let subject = self
            .registry
            .render("subject", &data)?
            .replace(['\r', '\n'], " ");
        let body = self.registry.render("body", &data)?;
        Ok(OutgoingMail {
            to: self.recipient.clone(),
            reply_to: message.email.clone(),
            subject,
            body,
        })
    }
}

/// Mail transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailerError>;
}

/// Writes mails to the log instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailerError> {
        info!(
            "Contact mail to {} (reply-to {}): {}\n{}",
            mail.to, mail.reply_to, mail.subject, mail.body
        );
        Ok(())
    }
}
