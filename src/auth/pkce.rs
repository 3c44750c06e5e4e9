// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-entra-login project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PKCE (Proof Key for Code Exchange) values for one authorization attempt
//!
//! Each attempt gets an independent `state` (CSRF token) and `code_verifier`,
//! both drawn from the operating system RNG and URL-safe Base64 encoded
//! without padding. The `code_challenge` is the S256 transform of the
//! verifier as defined in RFC 7636 §4.2.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of random bytes behind `state` and `code_verifier` (256 bits).
pub const RANDOM_BYTES: usize = 32;

/// Failure of the secure random source.
#[derive(Debug, Error)]
#[error("Secure random source failed: {0}")]
pub struct PkceError(String);

/// State, verifier and challenge of one authorization request.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceBundle {
    /// Opaque CSRF token round-tripped through the provider.
    pub state: String,
    /// Raw verifier, sent only to the token endpoint.
    pub code_verifier: String,
    /// `base64url(SHA-256(code_verifier))`, sent to the authorize endpoint.
    pub code_challenge: String,
}

impl std::fmt::Debug for PkceBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceBundle")
            .field("state", &"<redacted>")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

impl PkceBundle {
    /// Generate a fresh bundle.
    pub fn generate() -> Result<Self, PkceError> {
        let state = random_token()?;
        let code_verifier = random_token()?;
        let code_challenge = code_challenge(&code_verifier);
        Ok(Self {
            state,
            code_verifier,
            code_challenge,
        })
    }
}

/// `RANDOM_BYTES` from the OS RNG, URL-safe Base64 without padding.
pub fn random_token() -> Result<String, PkceError> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| PkceError(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// S256 code challenge of a verifier.
pub fn code_challenge(code_verifier: &str) -> String {
    let digest = Sha256::digest(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
