// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Local user records resolved after an Entra login

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::pkce::random_token;

/// A user of the CMS admin, keyed by email.
#[derive(Debug, Clone, Serialize)]
pub struct LocalUser {
    pub id: Uuid,
    pub email: String,
    /// Entra object id (`oid`) captured when the account was created.
    pub entra_id: Option<String>,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Data for a user created on first login.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub entra_id: Option<String>,
    /// Plain random password, hashed by the store and never used to log in.
    pub password: String,
}

impl NewUser {
    /// OAuth-only account with a random 256-bit password.
    pub fn oauth_only(email: &str, entra_id: Option<String>) -> Result<Self, UserStoreError> {
        let password =
            random_token().map_err(|e| UserStoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            email: email.to_string(),
            entra_id,
            password,
        })
    }
}

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("User '{0}' already exists")]
    Duplicate(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("User store unavailable: {0}")]
    Unavailable(String),
}

/// The CMS user collection (`find` / `create`).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-match lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>, UserStoreError>;

    async fn create(&self, user: NewUser) -> Result<LocalUser, UserStoreError>;
}

/// Users kept in process memory. Lookups are case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, LocalUser>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn hash_password(password: &str) -> Result<String, UserStoreError> {
    let hash = pwhash::bcrypt::hash(password).map_err(|e| UserStoreError::Hash(e.to_string()))?;
    // Stored Base64 encoded, the way access hashes are kept in configuration
    Ok(URL_SAFE_NO_PAD.encode(hash))
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<LocalUser>, UserStoreError> {
        let users = self
            .users
            .read()
            .map_err(|e| UserStoreError::Unavailable(e.to_string()))?;
        Ok(users.get(email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<LocalUser, UserStoreError> {
        let password_hash = hash_password(&user.password)?;
        let mut users = self
            .users
            .write()
            .map_err(|e| UserStoreError::Unavailable(e.to_string()))?;
        if users.contains_key(&user.email) {
            return Err(UserStoreError::Duplicate(user.email));
        }
        let created = LocalUser {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            entra_id: user.entra_id,
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.email, created.clone());
        Ok(created)
    }
}
