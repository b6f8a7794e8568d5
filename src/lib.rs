//! Keygate
//!
//! API key issuance, validation and rate limiting:
//! - Opaque `sk-` credentials with salted adaptive hashing
//! - Fixed hourly rate windows with per-key admission
//! - Key lifecycle (active, inactive, expired, revoked)
//! - Append-only usage logging

pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
pub use domain::{DomainError, ValidationError};
pub use infrastructure::api_key::{ApiKeyService, HourlyRateLimiter, SecretCodec};
