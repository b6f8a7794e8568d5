//! API Key repository trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Debug;

use super::entity::{ApiKey, ApiKeyId, ApiKeyStatus};
use crate::domain::DomainError;

/// Repository trait for API key storage
///
/// All mutations are atomic at the record level with respect to concurrent
/// readers. `insert` enforces secret-hash uniqueness.
#[async_trait]
pub trait ApiKeyRepository: Send + Sync + Debug {
    /// Insert a new API key, rejecting a duplicate secret hash
    async fn insert(&self, api_key: ApiKey) -> Result<ApiKey, DomainError>;

    /// Get an API key by its ID
    async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError>;

    /// List keys in a given status, optionally keeping only those not
    /// expired as of the given instant (keys without expiry always pass)
    async fn find_by_status(
        &self,
        status: ApiKeyStatus,
        not_expired_as_of: Option<DateTime<Utc>>,
    ) -> Result<Vec<ApiKey>, DomainError>;

    /// List all keys belonging to an owner
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, DomainError>;

    /// Stamp `last_used_at` and increment `usage_count` by one, atomically
    async fn update_last_used(
        &self,
        id: &ApiKeyId,
        used_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    /// Update the status of a key
    async fn update_status(&self, id: &ApiKeyId, status: ApiKeyStatus) -> Result<(), DomainError>;

    /// Update the mutable limit fields of a key
    async fn update_limits(
        &self,
        id: &ApiKeyId,
        rate_limit: Option<u32>,
        permissions: Option<HashSet<String>>,
    ) -> Result<(), DomainError>;

    /// Count API keys (optionally filtered by status)
    async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError>;

    /// Check if an API key ID exists
    async fn exists(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Mock API key repository for testing
    #[derive(Debug, Default)]
    pub struct MockApiKeyRepository {
        keys: Arc<RwLock<HashMap<String, ApiKey>>>,
        should_fail: Arc<RwLock<bool>>,
        should_fail_writes: Arc<RwLock<bool>>,
    }

    impl MockApiKeyRepository {
        /// Create a new mock repository
        pub fn new() -> Self {
            Self::default()
        }

        /// Set whether operations should fail
        pub async fn set_should_fail(&self, fail: bool) {
            *self.should_fail.write().await = fail;
        }

        /// Set whether only mutating operations should fail
        pub async fn set_should_fail_writes(&self, fail: bool) {
            *self.should_fail_writes.write().await = fail;
        }

        async fn check_should_fail(&self) -> Result<(), DomainError> {
            if *self.should_fail.read().await {
                return Err(DomainError::unavailable(
                    "Mock repository configured to fail",
                ));
            }
            Ok(())
        }

        async fn check_should_fail_writes(&self) -> Result<(), DomainError> {
            self.check_should_fail().await?;
            if *self.should_fail_writes.read().await {
                return Err(DomainError::unavailable(
                    "Mock repository configured to fail writes",
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ApiKeyRepository for MockApiKeyRepository {
        async fn insert(&self, api_key: ApiKey) -> Result<ApiKey, DomainError> {
            self.check_should_fail_writes().await?;
            let mut keys = self.keys.write().await;

            if keys
                .values()
                .any(|k| k.secret_hash() == api_key.secret_hash())
            {
                return Err(DomainError::duplicate_hash(
                    "secret hash already present",
                ));
            }

            keys.insert(api_key.id().as_str().to_string(), api_key.clone());
            Ok(api_key)
        }

        async fn find_by_id(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;
            Ok(keys.get(id.as_str()).cloned())
        }

        async fn find_by_status(
            &self,
            status: ApiKeyStatus,
            not_expired_as_of: Option<DateTime<Utc>>,
        ) -> Result<Vec<ApiKey>, DomainError> {
            self.check_should_fail().await?;
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
            self.check_should_fail().await?;
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
            self.check_should_fail_writes().await?;
            let mut keys = self.keys.write().await;

            match keys.get_mut(id.as_str()) {
                Some(key) => {
                    key.record_usage(used_at);
                    Ok(())
                }
                None => Err(DomainError::not_found(format!(
                    "API key '{}' not found",
                    id
                ))),
            }
        }

        async fn update_status(
            &self,
            id: &ApiKeyId,
            status: ApiKeyStatus,
        ) -> Result<(), DomainError> {
            self.check_should_fail_writes().await?;
            let mut keys = self.keys.write().await;

            match keys.get_mut(id.as_str()) {
                Some(key) => {
                    key.set_status(status);
                    Ok(())
                }
                None => Err(DomainError::not_found(format!(
                    "API key '{}' not found",
                    id
                ))),
            }
        }

        async fn update_limits(
            &self,
            id: &ApiKeyId,
            rate_limit: Option<u32>,
            permissions: Option<HashSet<String>>,
        ) -> Result<(), DomainError> {
            self.check_should_fail_writes().await?;
            let mut keys = self.keys.write().await;

            match keys.get_mut(id.as_str()) {
                Some(key) => {
                    if let Some(limit) = rate_limit {
                        key.set_rate_limit(limit);
                    }
                    if let Some(perms) = permissions {
                        key.set_permissions(perms);
                    }
                    Ok(())
                }
                None => Err(DomainError::not_found(format!(
                    "API key '{}' not found",
                    id
                ))),
            }
        }

        async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
            self.check_should_fail().await?;
            let keys = self.keys.read().await;

            Ok(keys
                .values()
                .filter(|k| status.is_none_or(|s| k.status() == s))
                .count())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn create_test_key(name: &str, hash: &str) -> ApiKey {
            ApiKey::new(ApiKeyId::generate(), name, hash, "user-1", 1000)
        }

        #[tokio::test]
        async fn test_insert_and_find() {
            let repo = MockApiKeyRepository::new();
            let key = create_test_key("test-1", "hash-1");

            repo.insert(key.clone()).await.unwrap();

            let retrieved = repo.find_by_id(key.id()).await.unwrap();
            assert!(retrieved.is_some());
            assert_eq!(retrieved.unwrap().display_name(), key.display_name());
        }

        #[tokio::test]
        async fn test_insert_rejects_duplicate_hash() {
            let repo = MockApiKeyRepository::new();

            repo.insert(create_test_key("test-1", "same-hash"))
                .await
                .unwrap();

            let result = repo.insert(create_test_key("test-2", "same-hash")).await;
            assert!(matches!(result, Err(DomainError::DuplicateHash { .. })));
        }

        #[tokio::test]
        async fn test_should_fail_switch() {
            let repo = MockApiKeyRepository::new();
            repo.set_should_fail(true).await;

            let result = repo.find_by_status(ApiKeyStatus::Active, None).await;
            assert!(matches!(result, Err(DomainError::Unavailable { .. })));
        }

        #[tokio::test]
        async fn test_should_fail_writes_keeps_reads_working() {
            let repo = MockApiKeyRepository::new();
            let key = create_test_key("test-1", "hash-1");
            repo.insert(key.clone()).await.unwrap();

            repo.set_should_fail_writes(true).await;

            let result = repo.update_last_used(key.id(), Utc::now()).await;
            assert!(matches!(result, Err(DomainError::Unavailable { .. })));

            assert!(repo.find_by_id(key.id()).await.unwrap().is_some());
        }

        #[tokio::test]
        async fn test_update_last_used_increments_count() {
            let repo = MockApiKeyRepository::new();
            let key = create_test_key("test-1", "hash-1");
            repo.insert(key.clone()).await.unwrap();

            repo.update_last_used(key.id(), Utc::now()).await.unwrap();
            repo.update_last_used(key.id(), Utc::now()).await.unwrap();

            let retrieved = repo.find_by_id(key.id()).await.unwrap().unwrap();
            assert_eq!(retrieved.usage_count(), 2);
            assert!(retrieved.last_used_at().is_some());
        }
    }
}
