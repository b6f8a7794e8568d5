//! Secret generation and hashing
//!
//! Credentials are an opaque prefix plus URL-safe base64 over CSPRNG bytes.
//! Only the Argon2 hash is ever stored; verification parses the stored hash
//! and returns false for anything malformed.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::config::ApiKeySettings;
use crate::domain::DomainError;

/// A freshly generated secret and its stored form
#[derive(Debug, Clone)]
pub struct GeneratedSecret {
    /// The full credential handed to the caller, exactly once
    pub plaintext: String,
    /// The Argon2 hash that goes into the store
    pub hash: String,
}

/// Generates and verifies API key secrets
#[derive(Debug, Clone)]
pub struct SecretCodec {
    prefix: String,
    secret_bytes: usize,
}

impl SecretCodec {
    /// Create a codec with an explicit prefix and entropy size
    pub fn new(prefix: impl Into<String>, secret_bytes: usize) -> Self {
        Self {
            prefix: prefix.into(),
            secret_bytes,
        }
    }

    /// Create a codec from application settings
    pub fn from_settings(settings: &ApiKeySettings) -> Self {
        Self::new(settings.prefix.clone(), settings.secret_bytes)
    }

    /// The credential prefix this codec issues and expects
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Generate a new secret and its hash
    pub fn generate(&self) -> Result<GeneratedSecret, DomainError> {
        let mut bytes = vec![0u8; self.secret_bytes];
        rand::thread_rng().fill_bytes(&mut bytes);

        let plaintext = format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(&bytes));
        let hash = self.hash(&plaintext)?;

        Ok(GeneratedSecret { plaintext, hash })
    }

    /// Hash a plaintext credential for storage
    pub fn hash(&self, plaintext: &str) -> Result<String, DomainError> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| DomainError::internal(format!("Failed to hash secret: {}", e)))
    }

    /// Verify a plaintext credential against a stored hash
    ///
    /// A malformed stored hash verifies as false rather than erroring, so a
    /// corrupt record can never be matched.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Cheap shape check performed before any store access
    pub fn has_prefix(&self, plaintext: &str) -> bool {
        plaintext.starts_with(&self.prefix) && plaintext.len() > self.prefix.len()
    }
}

impl Default for SecretCodec {
    fn default() -> Self {
        Self::from_settings(&ApiKeySettings::default())
    }
}
