// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::net::IpAddr;

use log::{debug, error, warn};
use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::serde::json::{self, Json};
use rocket::{post, Request, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::mailer::ContactMessage;
use super::rate_limit::RateLimitResult;
use super::ContactState;
use crate::config::LocaleConfig;

pub const MAX_MESSAGE_CHARS: usize = 5000;
pub const MAX_NAME_CHARS: usize = 200;

/// Body of `POST /api/contact`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub locale: Option<String>,
}

/// JSON reply with an optional `Retry-After` header.
#[derive(Debug)]
pub struct ContactReply {
    status: Status,
    body: Value,
    retry_after: Option<u64>,
}

impl ContactReply {
    fn ok() -> Self {
        Self {
            status: Status::Ok,
            body: json!({ "ok": true }),
            retry_after: None,
        }
    }

    fn error(status: Status, message: &str) -> Self {
        Self {
            status,
            body: json!({ "error": message }),
            retry_after: None,
        }
    }
}

impl<'r> Responder<'r, 'static> for ContactReply {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let mut response = Json(self.body).respond_to(req)?;
        response.set_status(self.status);
        if let Some(secs) = self.retry_after {
            response.set_raw_header("Retry-After", secs.to_string());
        }
        Ok(response)
    }
}

/// Check the form and normalise it into a message.
pub fn validate(form: ContactForm, locales: &LocaleConfig) -> Result<ContactMessage, &'static str> {
    let name = form.name.trim();
    let email = form.email.trim();
    let message = form.message.trim();

    if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
        return Err("Invalid name");
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
        _ => return Err("Invalid email"),
    }
    if message.is_empty() {
        return Err("Message is required");
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err("Message is too long");
    }

    let locale = form
        .locale
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| locales.supported.iter().any(|s| s == l))
        .unwrap_or_else(|| locales.default.clone());

    Ok(ContactMessage {
        name: name.to_string(),
        email: email.to_string(),
        message: message.to_string(),
        locale,
    })
}

#[post("/api/contact", data = "<form>")]
pub async fn submit_contact(
    form: Result<Json<ContactForm>, json::Error<'_>>,
    client_ip: Option<IpAddr>,
    contact: &State<ContactState>,
    locales: &State<LocaleConfig>,
) -> ContactReply {
    if !contact.enabled {
        return ContactReply::error(Status::NotFound, "Not found");
    }

    let key = client_ip
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    if let RateLimitResult::Exceeded { retry_after_secs } = contact.limiter.check(&key) {
        warn!("Contact form rate limit hit by {}", key);
        let mut reply = ContactReply::error(Status::TooManyRequests, "Too many requests");
        reply.retry_after = Some(retry_after_secs);
        return reply;
    }

    let form = match form {
        Ok(form) => form.into_inner(),
        Err(e) => {
            debug!("Unreadable contact form: {}", e);
            return ContactReply::error(Status::BadRequest, "Invalid request body");
        }
    };
    let message = match validate(form, locales) {
        Ok(message) => message,
        Err(reason) => return ContactReply::error(Status::BadRequest, reason),
    };

    let mail = match contact.renderer.render(&message) {
        Ok(mail) => mail,
        Err(e) => {
            error!("Could not render contact mail: {}", e);
            return ContactReply::error(Status::InternalServerError, "Internal Server Error");
        }
    };
    if let Err(e) = contact.mailer.send(mail).await {
        error!("Contact mail delivery failed: {}", e);
        return ContactReply::error(Status::BadGateway, "Failed to send message");
    }
    ContactReply::ok()
}
