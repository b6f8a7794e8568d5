//! Usage log repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::UsageLogEntry;
use crate::domain::api_key::ApiKeyId;
use crate::domain::DomainError;

/// Append-only storage for usage log entries
#[async_trait]
pub trait UsageLogRepository: Send + Sync + Debug {
    /// Append an entry to the log
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError>;

    /// List entries for a key, newest first
    async fn find_by_key(&self, api_key_id: &ApiKeyId) -> Result<Vec<UsageLogEntry>, DomainError>;

    /// Total number of retained entries
    async fn count(&self) -> Result<usize, DomainError>;
}
