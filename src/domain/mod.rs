//! Domain layer - Core business logic and entities

pub mod api_key;
pub mod error;
pub mod usage;

pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus};
pub use error::{DomainError, ValidationError};
pub use usage::{UsageLogEntry, UsageLogRepository};
