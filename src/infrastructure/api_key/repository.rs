//! In-memory API key repository

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus};
use crate::domain::DomainError;

/// In-memory implementation of the API key repository
///
/// Keeps a secondary index from secret hash to key id so hash uniqueness is
/// checked on insert rather than assumed. Mutations happen in place under
/// the write lock, so concurrent readers see whole records only.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyRepository {
    keys: Arc<RwLock<HashMap<ApiKeyId, ApiKey>>>,
    hash_index: Arc<RwLock<HashMap<String, ApiKeyId>>>,
}

impl InMemoryApiKeyRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    async fn with_key_mut<F>(&self, id: &ApiKeyId, f: F) -> Result<(), DomainError>
    where
        F: FnOnce(&mut ApiKey),
    {
        let mut keys = self.keys.write().await;

        match keys.get_mut(id) {
            Some(key) => {
                f(key);
                Ok(())
            }
            None => Err(DomainError::not_found(format!(
                "API key '{}' not found",
                id
            ))),
        }
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeyRepository {
    async fn insert(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
        let mut hash_index = self.hash_index.write().await;

        if hash_index.contains_key(api_key.secret_hash()) {
            return Err(DomainError::duplicate_hash(format!(
                "secret hash collides with an existing key for '{}'",
                api_key.id()
            )));
        }

        let mut keys = self.keys.write().await;

        if keys.contains_key(api_key.id()) {
            return Err(DomainError::validation(format!(
                "API key with ID '{}' already exists",
                api_key.id()
            )));
        }

        hash_index.insert(api_key.secret_hash().to_string(), api_key.id().clone());
        keys.insert(api_key.id().clone(), api_key.clone());

        Ok(api_key)
    }

    async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        let keys = self.keys.read().await;
        Ok(keys.get(id).cloned())
    }

    async fn find_by_status(
        &self,
        status: ApiKeyStatus,
        not_expired_as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.keys.read().await;

        Ok(keys
            .values()
            .filter(|k| k.status() == status)
            .filter(|k| match not_expired_as_of {
                Some(cutoff) => !k.is_expired_at(cutoff),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, DomainError> {
        let keys = self.keys.read().await;

        Ok(keys
            .values()
            .filter(|k| k.owner_id() == owner_id)
            .cloned()
            .collect())
    }

    async fn update_last_used(
        &self,
        id: &ApiKeyId,
        used_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.with_key_mut(id, |key| key.record_usage(used_at)).await
    }

    async fn update_status(&self, id: &ApiKeyId, status: ApiKeyStatus) -> Result<(), DomainError> {
        self.with_key_mut(id, |key| key.set_status(status)).await
    }

    async fn update_limits(
        &self,
        id: &ApiKeyId,
        rate_limit: Option<u32>,
        permissions: Option<HashSet<String>>,
    ) -> Result<(), DomainError> {
        self.with_key_mut(id, |key| {
            if let Some(limit) = rate_limit {
                key.set_rate_limit(limit);
            }
            if let Some(perms) = permissions {
                key.set_permissions(perms);
            }
        })
        .await
    }

    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
        let keys = self.keys.read().await;

        Ok(keys
            .values()
            .filter(|k| status.is_none_or(|s| k.status() == s))
            .count())
    }
}
