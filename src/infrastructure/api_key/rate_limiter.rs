//! Hourly rate limiter
//!
//! Fixed windows aligned to the top of the hour, UTC. Each key gets its own
//! counter cell so admission for one key never blocks another; the outer map
//! lock is held only long enough to fetch or insert the cell.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::domain::api_key::ApiKeyId;

/// Result of an admission check
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    /// Whether the request is admitted
    pub admitted: bool,
    /// Remaining requests in the current window after this decision
    pub remaining: u32,
    /// Total limit for the window
    pub limit: u32,
    /// When the current window rolls over
    pub resets_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Seconds until the window rolls over, as seen from `now`
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        (self.resets_at - now).num_seconds().max(0) as u64
    }
}

/// Counter state for one key's current window
#[derive(Debug)]
struct RateWindow {
    window_start: DateTime<Utc>,
    requests_made: u32,
}

/// Per-key fixed-window rate limiter
///
/// The check-and-increment is a single atomic unit under the key's own
/// mutex; a rejected request never consumes quota. The limit is supplied by
/// the caller on every call so administrative changes apply mid-window.
#[derive(Debug, Default)]
pub struct HourlyRateLimiter {
    windows: Arc<RwLock<HashMap<ApiKeyId, Arc<Mutex<RateWindow>>>>>,
}

impl HourlyRateLimiter {
    /// Create a new rate limiter
    pub fn new() -> Self {
        Self::default()
    }

    /// Check and consume one request against the current hourly window
    pub async fn admit(&self, key_id: &ApiKeyId, limit: u32) -> RateLimitDecision {
        self.admit_at(key_id, limit, Utc::now()).await
    }

    /// Check and consume one request using an explicit clock reading
    pub async fn admit_at(
        &self,
        key_id: &ApiKeyId,
        limit: u32,
        now: DateTime<Utc>,
    ) -> RateLimitDecision {
        let window_start = truncate_to_hour(now);
        let cell = self.cell_for(key_id, window_start).await;
        let mut window = cell.lock().await;

        // New hour: the old counter is irrelevant
        if window.window_start < window_start {
            window.window_start = window_start;
            window.requests_made = 0;
        }

        let resets_at = window.window_start + Duration::hours(1);

        if window.requests_made >= limit {
            return RateLimitDecision {
                admitted: false,
                remaining: 0,
                limit,
                resets_at,
            };
        }

        window.requests_made += 1;

        RateLimitDecision {
            admitted: true,
            remaining: limit - window.requests_made,
            limit,
            resets_at,
        }
    }

    /// Drop a key's window, forgetting any consumed quota
    pub async fn reset(&self, key_id: &ApiKeyId) {
        let mut windows = self.windows.write().await;
        windows.remove(key_id);
    }

    /// Number of keys with a live window
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }

    async fn cell_for(
        &self,
        key_id: &ApiKeyId,
        window_start: DateTime<Utc>,
    ) -> Arc<Mutex<RateWindow>> {
        {
            let windows = self.windows.read().await;
            if let Some(cell) = windows.get(key_id) {
                return Arc::clone(cell);
            }
        }

        let mut windows = self.windows.write().await;
        let cell = windows.entry(key_id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(RateWindow {
                window_start,
                requests_made: 0,
            }))
        });

        Arc::clone(cell)
    }
}

fn truncate_to_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    #[tokio::test]
    async fn test_admits_up_to_limit() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();

        for i in 0..5 {
            let decision = limiter.admit(&key, 5).await;
            assert!(decision.admitted);
            assert_eq!(decision.remaining, 4 - i);
        }

        let decision = limiter.admit(&key, 5).await;
        assert!(!decision.admitted);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_rejection_does_not_consume_quota() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();

        limiter.admit_at(&key, 1, now).await;

        // Repeated rejections leave the counter untouched
        for _ in 0..3 {
            let decision = limiter.admit_at(&key, 1, now).await;
            assert!(!decision.admitted);
        }

        // Raising the limit shows only one request was ever consumed
        let decision = limiter.admit_at(&key, 2, now).await;
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_window_rollover_resets_counter() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();

        limiter.admit_at(&key, 1, now).await;
        let decision = limiter.admit_at(&key, 1, now).await;
        assert!(!decision.admitted);

        let next_hour = now + Duration::hours(1);
        let decision = limiter.admit_at(&key, 1, next_hour).await;
        assert!(decision.admitted);
        assert_eq!(decision.remaining, 0);
    }

    #[tokio::test]
    async fn test_resets_at_is_top_of_next_hour() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();

        let decision = limiter.admit_at(&key, 10, now).await;

        let expected = truncate_to_hour(now) + Duration::hours(1);
        assert_eq!(decision.resets_at, expected);
        assert!(decision.retry_after_secs(now) <= 3600);
    }

    #[tokio::test]
    async fn test_keys_do_not_share_windows() {
        let limiter = HourlyRateLimiter::new();
        let a = ApiKeyId::generate();
        let b = ApiKeyId::generate();

        limiter.admit(&a, 1).await;

        let decision = limiter.admit(&b, 1).await;
        assert!(decision.admitted);

        let decision = limiter.admit(&a, 1).await;
        assert!(!decision.admitted);
    }

    #[tokio::test]
    async fn test_reset_drops_window() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();

        limiter.admit(&key, 1).await;
        assert!(!limiter.admit(&key, 1).await.admitted);

        limiter.reset(&key).await;
        assert_eq!(limiter.tracked_keys().await, 0);

        assert!(limiter.admit(&key, 1).await.admitted);
    }

    #[tokio::test]
    async fn test_limit_change_applies_mid_window() {
        let limiter = HourlyRateLimiter::new();
        let key = ApiKeyId::generate();
        let now = Utc::now();

        for _ in 0..3 {
            assert!(limiter.admit_at(&key, 3, now).await.admitted);
        }
        assert!(!limiter.admit_at(&key, 3, now).await.admitted);

        // A raised limit admits immediately within the same window
        assert!(limiter.admit_at(&key, 5, now).await.admitted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_admissions_exactly_limit() {
        let limiter = Arc::new(HourlyRateLimiter::new());
        let key = ApiKeyId::generate();
        let limit = 50u32;
        let now = Utc::now();

        let tasks = (0..limit * 2).map(|_| {
            let limiter = Arc::clone(&limiter);
            let key = key.clone();
            tokio::spawn(async move { limiter.admit_at(&key, limit, now).await.admitted })
        });

        let admitted = join_all(tasks)
            .await
            .into_iter()
            .filter(|r| *r.as_ref().unwrap())
            .count();

        assert_eq!(admitted as u32, limit);
    }
}
