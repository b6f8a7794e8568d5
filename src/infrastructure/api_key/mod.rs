//! API Key infrastructure
//!
//! Secret generation and hashing, hourly rate limiting, in-memory storage
//! and the lifecycle service tying them together.

mod rate_limiter;
mod repository;
mod secret;
mod service;

pub use rate_limiter::{HourlyRateLimiter, RateLimitDecision};
pub use repository::InMemoryApiKeyRepository;
pub use secret::{GeneratedSecret, SecretCodec};
pub use service::{ApiKeyService, GenerateKeyParams, GeneratedKey, RequestContext, ValidatedKey};
