//! Per-owner redemption pacing.

use crate::config::GuardFailurePolicy;
use crate::error::{RedeemError, Result};
use crate::providers::RateStore;
use crate::state::{OwnerId, RateLimitRecord};
use chrono::{Duration, Utc};

/// Enforces a minimum interval between redemptions by the same owner.
///
/// Runs before any lease is taken: rejecting here is cheap and holds
/// nothing. The read-then-write on the pacing record is not atomic; the
/// leases downstream close that race. On a store failure the configured
/// [`GuardFailurePolicy`] decides between allowing the attempt (the source
/// system's behavior) and surfacing the error.
#[derive(Debug, Clone)]
pub struct RateLimiter<S> {
    store: S,
    min_interval: Duration,
    policy: GuardFailurePolicy,
}

impl<S: RateStore> RateLimiter<S> {
    /// Create a rate limiter over `store`.
    #[must_use]
    pub const fn new(store: S, min_interval: Duration, policy: GuardFailurePolicy) -> Self {
        Self {
            store,
            min_interval,
            policy,
        }
    }

    /// Check the owner's pacing and record this attempt.
    ///
    /// On success the owner's record is updated (`last_redemption_at = now`,
    /// `count + 1`) before the flow continues.
    ///
    /// # Errors
    ///
    /// - [`RedeemError::RateLimited`] - the minimum interval has not
    ///   elapsed; carries the remaining wait.
    /// - [`RedeemError::Store`] - backend failure, only under
    ///   [`GuardFailurePolicy::FailClosed`].
    pub async fn check(&self, owner_id: &OwnerId) -> Result<()> {
        let now = Utc::now();

        let previous = match self.store.get(owner_id).await {
            Ok(previous) => previous,
            Err(err) => return self.on_store_failure(owner_id, &err),
        };

        if let Some(record) = &previous {
            let elapsed = now - record.last_redemption_at;
            if elapsed < self.min_interval {
                let retry_after = (self.min_interval - elapsed).to_std().unwrap_or_default();
                tracing::debug!(
                    owner = %owner_id,
                    retry_after_secs = retry_after.as_secs(),
                    "Redemption paced"
                );
                return Err(RedeemError::RateLimited { retry_after });
            }
        }

        let record = RateLimitRecord {
            owner_id: *owner_id,
            last_redemption_at: now,
            count: previous.map_or(1, |r| r.count + 1),
        };
        if let Err(err) = self.store.put(&record).await {
            return self.on_store_failure(owner_id, &err);
        }

        Ok(())
    }

    fn on_store_failure(&self, owner_id: &OwnerId, err: &RedeemError) -> Result<()> {
        match self.policy {
            GuardFailurePolicy::FailOpen => {
                tracing::warn!(
                    owner = %owner_id,
                    error = %err,
                    "Rate store unavailable, allowing attempt (fail-open)"
                );
                Ok(())
            }
            GuardFailurePolicy::FailClosed => Err(err.clone()),
        }
    }
}
