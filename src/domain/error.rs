use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Duplicate secret hash: {message}")]
    DuplicateHash { message: String },

    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn duplicate_hash(message: impl Into<String>) -> Self {
        Self::DuplicateHash {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Outcome of rejecting a credential during validation
///
/// Credential-shaped failures are deliberately coarse: a well-formed
/// credential that matches nothing reports `InvalidCredential` whether or
/// not any candidate keys existed at all.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Presented value does not even look like one of our credentials
    #[error("Malformed credential")]
    MalformedCredential,

    /// Well-formed but matches no known key
    #[error("Invalid credential")]
    InvalidCredential,

    /// Matched a key past its expiry
    #[error("API key has expired")]
    Expired,

    /// Matched a revoked key
    #[error("API key has been revoked")]
    Revoked,

    /// Matched an active key that is out of quota for the current window
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// The verification scan exceeded its time budget
    #[error("Credential validation timed out")]
    Timeout,

    /// The key store could not answer; the credential is not admitted
    #[error("Store error during validation: {0}")]
    Store(#[from] DomainError),
}
