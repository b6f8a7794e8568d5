//! API Key entity and related types

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// API Key identifier - opaque, generated, never derived from the secret
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(String);

impl ApiKeyId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an API key
///
/// `Expired` and `Revoked` are terminal; only `Active` keys can validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyStatus {
    /// Key is active and can be used
    #[default]
    Active,
    /// Key is administratively disabled but can be resumed
    Inactive,
    /// Key has passed its expiry timestamp
    Expired,
    /// Key has been revoked and can never be used again
    Revoked,
}

impl ApiKeyStatus {
    /// Check if the key is usable
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Expired | Self::Revoked)
    }
}

/// API Key entity
///
/// `secret_hash` is the only trace of the credential; the plaintext is
/// handed to the caller once at generation and never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    /// Unique identifier for the key
    id: ApiKeyId,
    /// Display name for the key
    display_name: String,
    /// One-way hash of the secret (unique across all keys)
    secret_hash: String,
    /// Owner of the key (opaque reference, immutable)
    owner_id: String,
    /// Current status of the key
    status: ApiKeyStatus,
    /// Maximum requests per hourly window
    rate_limit: u32,
    /// Permission labels granted to this key
    permissions: HashSet<String>,
    /// Total successful validations over the key's lifetime
    usage_count: u64,
    /// Expiration timestamp (None = never expires)
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
    /// Last successful validation
    #[serde(skip_serializing_if = "Option::is_none")]
    last_used_at: Option<DateTime<Utc>>,
    /// Creation timestamp
    created_at: DateTime<Utc>,
    /// Last update timestamp
    updated_at: DateTime<Utc>,
}

impl ApiKey {
    /// Create a new API key
    pub fn new(
        id: ApiKeyId,
        display_name: impl Into<String>,
        secret_hash: impl Into<String>,
        owner_id: impl Into<String>,
        rate_limit: u32,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            display_name: display_name.into(),
            secret_hash: secret_hash.into(),
            owner_id: owner_id.into(),
            status: ApiKeyStatus::Active,
            rate_limit,
            permissions: HashSet::new(),
            usage_count: 0,
            expires_at: None,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set permissions
    pub fn with_permissions(mut self, permissions: HashSet<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Set expiration
    pub fn with_expiration(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    // Getters

    pub fn id(&self) -> &ApiKeyId {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn secret_hash(&self) -> &str {
        &self.secret_hash
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn status(&self) -> ApiKeyStatus {
        self.status
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }

    pub fn usage_count(&self) -> u64 {
        self.usage_count
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    // Status checks

    /// Check if the key has passed its expiry as of the given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => false,
        }
    }

    /// Check if the key is currently valid and usable
    pub fn is_valid(&self) -> bool {
        self.status.is_usable() && !self.is_expired_at(Utc::now())
    }

    // Mutators

    /// Update the display name
    pub fn set_display_name(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
        self.touch();
    }

    /// Update the status
    pub fn set_status(&mut self, status: ApiKeyStatus) {
        self.status = status;
        self.touch();
    }

    /// Update the hourly rate limit
    pub fn set_rate_limit(&mut self, rate_limit: u32) {
        self.rate_limit = rate_limit;
        self.touch();
    }

    /// Update permissions
    pub fn set_permissions(&mut self, permissions: HashSet<String>) {
        self.permissions = permissions;
        self.touch();
    }

    /// Record a successful validation
    pub fn record_usage(&mut self, at: DateTime<Utc>) {
        self.last_used_at = Some(at);
        self.usage_count += 1;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
