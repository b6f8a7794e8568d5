//! API Key domain
//!
//! Domain types and traits for API key management: the key entity and its
//! lifecycle states, plus the storage trait implementations must satisfy.

mod entity;
mod repository;

pub use entity::{ApiKey, ApiKeyId, ApiKeyStatus};
pub use repository::ApiKeyRepository;

#[cfg(test)]
pub use repository::mock;
