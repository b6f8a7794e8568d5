//! API Key service
//!
//! High-level operations for issuing, validating and managing API keys.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ApiKeySettings;
use crate::domain::api_key::{ApiKey, ApiKeyId, ApiKeyRepository, ApiKeyStatus};
use crate::domain::usage::{UsageLogEntry, UsageLogRepository};
use crate::domain::{DomainError, ValidationError};

use super::rate_limiter::HourlyRateLimiter;
use super::secret::SecretCodec;

/// Parameters for issuing a new API key
#[derive(Debug, Clone)]
pub struct GenerateKeyParams {
    /// Display name for the key
    pub display_name: String,
    /// Owner of the key
    pub owner_id: String,
    /// Requests per hour; defaults from settings when absent
    pub rate_limit: Option<u32>,
    /// Days until expiry; defaults from settings when absent. Zero produces
    /// a key that is already expired.
    pub expires_in_days: Option<u32>,
    /// Permission labels; defaults from settings when absent
    pub permissions: Option<HashSet<String>>,
}

impl GenerateKeyParams {
    pub fn new(display_name: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            owner_id: owner_id.into(),
            rate_limit: None,
            expires_in_days: None,
            permissions: None,
        }
    }

    pub fn with_rate_limit(mut self, rate_limit: u32) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn with_expires_in_days(mut self, days: u32) -> Self {
        self.expires_in_days = Some(days);
        self
    }

    pub fn with_permissions(mut self, permissions: HashSet<String>) -> Self {
        self.permissions = Some(permissions);
        self
    }
}

/// Result of issuing a new API key
#[derive(Debug)]
pub struct GeneratedKey {
    /// The stored entity (no plaintext anywhere in it)
    pub api_key: ApiKey,
    /// The full credential; shown to the caller once and never again
    pub plaintext: String,
}

/// Caller-supplied request details threaded into the usage log
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub endpoint: String,
    pub method: String,
    pub caller_ip: Option<String>,
    pub caller_agent: Option<String>,
}

impl RequestContext {
    pub fn new(endpoint: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            caller_ip: None,
            caller_agent: None,
        }
    }

    pub fn with_caller_ip(mut self, ip: impl Into<String>) -> Self {
        self.caller_ip = Some(ip.into());
        self
    }

    pub fn with_caller_agent(mut self, agent: impl Into<String>) -> Self {
        self.caller_agent = Some(agent.into());
        self
    }
}

/// Result of a successful validation
#[derive(Debug)]
pub struct ValidatedKey {
    /// The key as stored after the usage stamp
    pub api_key: ApiKey,
    /// Requests left in the current hourly window
    pub rate_limit_remaining: u32,
    /// When the current window rolls over
    pub rate_limit_resets_at: chrono::DateTime<chrono::Utc>,
}

/// API Key service: issuance, validation, lifecycle and usage recording
#[derive(Debug)]
pub struct ApiKeyService<R, U>
where
    R: ApiKeyRepository,
    U: UsageLogRepository,
{
    repository: Arc<R>,
    usage_log: Arc<U>,
    codec: SecretCodec,
    rate_limiter: Arc<HourlyRateLimiter>,
    settings: ApiKeySettings,
}

impl<R: ApiKeyRepository, U: UsageLogRepository> ApiKeyService<R, U> {
    /// Create a new API key service
    pub fn new(repository: Arc<R>, usage_log: Arc<U>, settings: ApiKeySettings) -> Self {
        Self {
            repository,
            usage_log,
            codec: SecretCodec::from_settings(&settings),
            rate_limiter: Arc::new(HourlyRateLimiter::new()),
            settings,
        }
    }

    /// Create with a custom rate limiter
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<HourlyRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Issue a new API key
    ///
    /// The plaintext credential exists only in the returned value.
    pub async fn generate(&self, params: GenerateKeyParams) -> Result<GeneratedKey, DomainError> {
        info!(
            "Generating API key: name={}, owner={}",
            params.display_name, params.owner_id
        );

        let codec = self.codec.clone();
        let generated = tokio::task::spawn_blocking(move || codec.generate())
            .await
            .map_err(|e| DomainError::internal(format!("Hashing task failed: {}", e)))??;

        let rate_limit = params.rate_limit.unwrap_or(self.settings.default_rate_limit);
        if rate_limit == 0 {
            return Err(DomainError::validation("Rate limit must be positive"));
        }

        let expires_in_days = params
            .expires_in_days
            .unwrap_or(self.settings.default_expiry_days);
        let expires_at = Utc::now() + chrono::Duration::days(i64::from(expires_in_days));

        let permissions = params
            .permissions
            .unwrap_or_else(|| self.settings.default_permissions.clone());

        let api_key = ApiKey::new(
            ApiKeyId::generate(),
            params.display_name,
            generated.hash,
            params.owner_id,
            rate_limit,
        )
        .with_permissions(permissions)
        .with_expiration(expires_at);

        let created = self.repository.insert(api_key).await?;

        info!("API key created: id={}", created.id());

        Ok(GeneratedKey {
            api_key: created,
            plaintext: generated.plaintext,
        })
    }

    /// Validate a presented credential and admit it against its rate limit
    ///
    /// On success the key's usage is stamped and a usage log entry is
    /// appended; rejected attempts are logged too when the key is known.
    /// Any store failure rejects the credential.
    pub async fn validate(
        &self,
        plaintext: &str,
        ctx: &RequestContext,
    ) -> Result<ValidatedKey, ValidationError> {
        if !self.codec.has_prefix(plaintext) {
            debug!("Credential rejected before lookup: wrong shape");
            return Err(ValidationError::MalformedCredential);
        }

        // No expiry pre-filter: an expired key that matches must report as
        // expired, not as an unknown credential.
        let candidates = self
            .repository
            .find_by_status(ApiKeyStatus::Active, None)
            .await
            .map_err(ValidationError::from)?;

        debug!("Scanning {} candidate keys", candidates.len());

        let matched_id = self.scan_candidates(plaintext, candidates).await?;

        let Some(matched_id) = matched_id else {
            debug!("Credential matched no key");
            return Err(ValidationError::InvalidCredential);
        };

        // Re-fetch: the record may have changed while we were hashing
        let key = self
            .repository
            .find_by_id(&matched_id)
            .await
            .map_err(ValidationError::from)?
            .ok_or(ValidationError::InvalidCredential)?;

        let now = Utc::now();

        match key.status() {
            ApiKeyStatus::Active => {}
            ApiKeyStatus::Revoked => {
                self.log_usage(&matched_id, ctx, 401).await;
                return Err(ValidationError::Revoked);
            }
            ApiKeyStatus::Expired => {
                self.log_usage(&matched_id, ctx, 401).await;
                return Err(ValidationError::Expired);
            }
            ApiKeyStatus::Inactive => {
                self.log_usage(&matched_id, ctx, 401).await;
                return Err(ValidationError::InvalidCredential);
            }
        }

        if key.is_expired_at(now) {
            info!("API key expired, transitioning: id={}", matched_id);
            if let Err(e) = self
                .repository
                .update_status(&matched_id, ApiKeyStatus::Expired)
                .await
            {
                warn!("Failed to mark API key expired: {}", e);
            }
            self.log_usage(&matched_id, ctx, 401).await;
            return Err(ValidationError::Expired);
        }

        let decision = self
            .rate_limiter
            .admit_at(&matched_id, key.rate_limit(), now)
            .await;

        if !decision.admitted {
            debug!("API key over rate limit: id={}", matched_id);
            self.log_usage(&matched_id, ctx, 429).await;
            return Err(ValidationError::RateLimitExceeded {
                retry_after_secs: decision.retry_after_secs(now),
            });
        }

        // A validation succeeds only once the usage stamp has landed, so a
        // returned key always reflects the incremented count
        self.repository
            .update_last_used(&matched_id, now)
            .await
            .map_err(ValidationError::from)?;

        self.log_usage(&matched_id, ctx, 200).await;

        let api_key = self
            .repository
            .find_by_id(&matched_id)
            .await
            .map_err(ValidationError::from)?
            .ok_or(ValidationError::InvalidCredential)?;

        Ok(ValidatedKey {
            api_key,
            rate_limit_remaining: decision.remaining,
            rate_limit_resets_at: decision.resets_at,
        })
    }

    /// Revoke an API key
    ///
    /// Unconditional and idempotent: revoking an already revoked key
    /// succeeds. Returns false only when the id is unknown.
    pub async fn revoke(&self, id: &ApiKeyId) -> Result<bool, DomainError> {
        info!("Revoking API key: id={}", id);

        if !self.repository.exists(id).await? {
            return Ok(false);
        }

        self.repository
            .update_status(id, ApiKeyStatus::Revoked)
            .await?;
        self.rate_limiter.reset(id).await;

        Ok(true)
    }

    /// Administratively disable an active key
    pub async fn suspend(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!("Suspending API key: id={}", id);

        let key = self.require_key(id).await?;

        if key.status() != ApiKeyStatus::Active {
            return Err(DomainError::validation(
                "Only active keys can be suspended",
            ));
        }

        self.repository
            .update_status(id, ApiKeyStatus::Inactive)
            .await?;
        self.require_key(id).await
    }

    /// Resume a suspended key
    pub async fn resume(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        info!("Resuming API key: id={}", id);

        let key = self.require_key(id).await?;

        if key.status() != ApiKeyStatus::Inactive {
            return Err(DomainError::validation(
                "Only inactive keys can be resumed",
            ));
        }

        self.repository
            .update_status(id, ApiKeyStatus::Active)
            .await?;
        self.require_key(id).await
    }

    /// Update the hourly rate limit of a key
    ///
    /// Drops the key's current window so the new limit applies cleanly.
    pub async fn update_rate_limit(&self, id: &ApiKeyId, limit: u32) -> Result<(), DomainError> {
        if limit == 0 {
            return Err(DomainError::validation("Rate limit must be positive"));
        }

        info!("Updating rate limit for API key: id={}, limit={}", id, limit);

        self.repository.update_limits(id, Some(limit), None).await?;
        self.rate_limiter.reset(id).await;

        Ok(())
    }

    /// Replace the permission set of a key
    pub async fn update_permissions(
        &self,
        id: &ApiKeyId,
        permissions: HashSet<String>,
    ) -> Result<(), DomainError> {
        info!("Updating permissions for API key: id={}", id);
        self.repository.update_limits(id, None, Some(permissions)).await
    }

    /// Append a usage log entry for a key
    pub async fn record_usage(
        &self,
        id: &ApiKeyId,
        ctx: &RequestContext,
        response_code: u16,
    ) -> Result<(), DomainError> {
        self.usage_log.append(build_entry(id, ctx, response_code)).await
    }

    /// Get an API key by ID
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>, DomainError> {
        self.repository.find_by_id(id).await
    }

    /// List all keys belonging to an owner
    pub async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<ApiKey>, DomainError> {
        self.repository.find_by_owner(owner_id).await
    }

    /// Count API keys
    pub async fn count(&self, status: Option<ApiKeyStatus>) -> Result<usize, DomainError> {
        self.repository.count(status).await
    }

    /// List usage log entries for a key, newest first
    pub async fn usage_for_key(
        &self,
        id: &ApiKeyId,
    ) -> Result<Vec<UsageLogEntry>, DomainError> {
        self.usage_log.find_by_key(id).await
    }

    /// Verify candidate hashes off the async workers, bounded by the
    /// configured validation timeout
    async fn scan_candidates(
        &self,
        plaintext: &str,
        candidates: Vec<ApiKey>,
    ) -> Result<Option<ApiKeyId>, ValidationError> {
        let codec = self.codec.clone();
        let plaintext = plaintext.to_string();
        let budget = Duration::from_millis(self.settings.validation_timeout_ms);

        let scan = tokio::task::spawn_blocking(move || {
            for candidate in &candidates {
                // An active key with no stored hash is a broken record, not
                // a match candidate
                debug_assert!(!candidate.secret_hash().is_empty());
                if candidate.secret_hash().is_empty() {
                    continue;
                }

                if codec.verify(&plaintext, candidate.secret_hash()) {
                    return Some(candidate.id().clone());
                }
            }
            None
        });

        match tokio::time::timeout(budget, scan).await {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(e)) => Err(ValidationError::Store(DomainError::internal(format!(
                "Verification task failed: {}",
                e
            )))),
            Err(_) => {
                warn!("Credential verification exceeded {:?}", budget);
                Err(ValidationError::Timeout)
            }
        }
    }

    async fn require_key(&self, id: &ApiKeyId) -> Result<ApiKey, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("API key '{}' not found", id)))
    }

    /// Append a usage entry, tolerating log failures
    async fn log_usage(&self, id: &ApiKeyId, ctx: &RequestContext, response_code: u16) {
        if let Err(e) = self.usage_log.append(build_entry(id, ctx, response_code)).await {
            warn!("Failed to append usage log entry: {}", e);
        }
    }
}

fn build_entry(id: &ApiKeyId, ctx: &RequestContext, response_code: u16) -> UsageLogEntry {
    let mut entry = UsageLogEntry::new(id.clone(), &ctx.endpoint, &ctx.method, response_code);

    if let Some(ip) = &ctx.caller_ip {
        entry = entry.with_caller_ip(ip);
    }
    if let Some(agent) = &ctx.caller_agent {
        entry = entry.with_caller_agent(agent);
    }

    entry
}
