// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Failures of the login endpoints and their HTTP mapping
//!
//! Every variant answers with a short fixed plain-text message. Provider
//! error bodies, claim contents and store errors are logged, never returned.

use log::error;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use std::io::Cursor;
use thiserror::Error;

use super::id_token::IdTokenError;
use super::pkce::PkceError;
use super::provider::TokenExchangeError;
use super::session::SessionError;
use super::settings::SettingsError;
use super::users::UserStoreError;

#[derive(Debug, Error)]
pub enum EntraAuthError {
    /// Integration disabled or missing tenant/client.
    #[error("Entra ID login is not configured")]
    NotConfigured,

    /// Missing parameters or cookies, or a state mismatch.
    #[error("Invalid OAuth state")]
    InvalidState,

    /// No redirect URI configured and no host to derive one from.
    #[error("Request origin unknown")]
    UnknownOrigin,

    #[error("Failed to exchange OAuth code")]
    ExchangeFailed(#[source] TokenExchangeError),

    /// The identity token carries no usable email claim.
    #[error("No email found")]
    NoEmail,

    #[error("Not allowed to access admin")]
    NotAllowed,

    #[error("Identity token rejected: {0}")]
    IdToken(#[from] IdTokenError),

    #[error("Settings unavailable: {0}")]
    Settings(#[from] SettingsError),

    #[error("User store failure: {0}")]
    Users(#[from] UserStoreError),

    #[error("Session issuance failure: {0}")]
    Session(#[from] SessionError),

    #[error("Random source failure: {0}")]
    Random(#[from] PkceError),

    #[error("Provider client failure: {0}")]
    Provider(String),
}

impl From<TokenExchangeError> for EntraAuthError {
    fn from(err: TokenExchangeError) -> Self {
        EntraAuthError::ExchangeFailed(err)
    }
}

impl EntraAuthError {
    pub fn status(&self) -> Status {
        match self {
            EntraAuthError::NotConfigured => Status::NotFound,
            EntraAuthError::InvalidState | EntraAuthError::UnknownOrigin => Status::BadRequest,
            EntraAuthError::ExchangeFailed(_)
            | EntraAuthError::NoEmail
            | EntraAuthError::IdToken(_) => Status::Unauthorized,
            EntraAuthError::NotAllowed => Status::Forbidden,
            EntraAuthError::Settings(_)
            | EntraAuthError::Users(_)
            | EntraAuthError::Session(_)
            | EntraAuthError::Random(_)
            | EntraAuthError::Provider(_) => Status::InternalServerError,
        }
    }

    /// Body sent to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            EntraAuthError::NotConfigured => "Entra ID login is not configured",
            EntraAuthError::InvalidState => "Invalid OAuth state",
            EntraAuthError::UnknownOrigin => "Bad Request",
            EntraAuthError::ExchangeFailed(_) => "Failed to exchange OAuth code",
            EntraAuthError::NoEmail => "No email found",
            EntraAuthError::IdToken(_) => "Invalid identity token",
            EntraAuthError::NotAllowed => "Not allowed to access admin",
            _ => "Internal Server Error",
        }
    }
}

impl<'r> Responder<'r, 'static> for EntraAuthError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("Entra login failed: {}", self);
        }
        let body = self.public_message();
        Response::build()
            .status(status)
            .header(ContentType::Plain)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
