//! In-memory usage log repository

use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::api_key::ApiKeyId;
use crate::domain::usage::{UsageLogEntry, UsageLogRepository};
use crate::domain::DomainError;

/// In-memory append-only usage log
///
/// Entries are kept in append order and the oldest are evicted once the
/// bound is exceeded. Nothing ever mutates a stored entry.
#[derive(Debug)]
pub struct InMemoryUsageLogRepository {
    entries: RwLock<Vec<UsageLogEntry>>,
    max_entries: usize,
}

impl InMemoryUsageLogRepository {
    /// Create a new log bounded to the given number of entries
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }
}

impl Default for InMemoryUsageLogRepository {
    fn default() -> Self {
        Self::new(100000)
    }
}

#[async_trait]
impl UsageLogRepository for InMemoryUsageLogRepository {
    async fn append(&self, entry: UsageLogEntry) -> Result<(), DomainError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        entries.push(entry);

        if entries.len() > self.max_entries {
            let excess = entries.len() - self.max_entries;
            entries.drain(..excess);
        }

        Ok(())
    }

    async fn find_by_key(&self, api_key_id: &ApiKeyId) -> Result<Vec<UsageLogEntry>, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        let mut result: Vec<UsageLogEntry> = entries
            .iter()
            .filter(|e| e.api_key_id() == api_key_id)
            .cloned()
            .collect();

        result.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        Ok(result)
    }

    async fn count(&self) -> Result<usize, DomainError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(entries.len())
    }
}
