//! Lease-based mutual exclusion.
//!
//! Create-if-absent leases with a time-to-live give an at-most-one-holder
//! guarantee without a centralized lock service. The cost is a crash
//! window: a holder that dies between acquire and release blocks the key
//! until the TTL elapses, at which point any caller may reclaim the lease.
//! That is the intended availability/latency tradeoff.

use crate::error::{RedeemError, Result};
use crate::providers::LeaseStore;
use crate::state::{Lease, LeaseKey};
use chrono::{Duration, Utc};

/// Acquires and releases exclusive leases over a [`LeaseStore`].
///
/// Two tiers are taken per redemption, always user lease first, then
/// ticket lease, so that concurrent flows cannot deadlock on reversed
/// acquisition order.
#[derive(Debug, Clone)]
pub struct LockManager<S> {
    store: S,
}

impl<S: LeaseStore> LockManager<S> {
    /// Create a lock manager over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Acquire the lease for `key` with the given time-to-live.
    ///
    /// Attempts create-if-absent; on conflict, reads the existing lease.
    /// An expired lease is deleted and the creation retried exactly once;
    /// a live lease fails the acquisition.
    ///
    /// # Errors
    ///
    /// - [`RedeemError::LockContention`] - a non-expired holder exists, or
    ///   another caller won the reclaim race.
    /// - [`RedeemError::Store`] - backend failure.
    pub async fn acquire(&self, key: LeaseKey, holder: &str, ttl: Duration) -> Result<Lease> {
        let now = Utc::now();
        let lease = Lease::new(key.clone(), holder, now, ttl);

        if self.store.insert_if_absent(&lease).await? {
            tracing::debug!(key = %key, holder = %holder, "Acquired lease");
            return Ok(lease);
        }

        match self.store.get(&key).await? {
            Some(existing) if existing.is_expired(now) => {
                tracing::warn!(
                    key = %key,
                    stale_holder = %existing.holder,
                    expired_at = %existing.expires_at,
                    "Reclaiming stale lease"
                );
                self.store.remove(&key).await?;
                // One retry: if someone else recreates the key between the
                // delete and this insert, they hold a live lease and we
                // report contention like any other loser.
                if self.store.insert_if_absent(&lease).await? {
                    tracing::debug!(key = %key, holder = %holder, "Acquired reclaimed lease");
                    Ok(lease)
                } else {
                    Err(RedeemError::LockContention {
                        key: key.storage_key(),
                    })
                }
            }
            Some(existing) => {
                tracing::debug!(
                    key = %key,
                    holder = %existing.holder,
                    expires_at = %existing.expires_at,
                    "Lease held, rejecting"
                );
                Err(RedeemError::LockContention {
                    key: key.storage_key(),
                })
            }
            // The holder released between our insert attempt and the read;
            // one more create attempt settles it.
            None => {
                if self.store.insert_if_absent(&lease).await? {
                    Ok(lease)
                } else {
                    Err(RedeemError::LockContention {
                        key: key.storage_key(),
                    })
                }
            }
        }
    }

    /// Release the lease for `key`.
    ///
    /// Idempotent and infallible by contract: releasing a missing lease is
    /// a no-op, and store failures are logged and swallowed so that a
    /// failed release can never mask the redemption's primary result. A
    /// lease that could not be deleted self-heals at its TTL.
    pub async fn release(&self, key: &LeaseKey) {
        match self.store.remove(key).await {
            Ok(()) => tracing::debug!(key = %key, "Released lease"),
            Err(err) => tracing::warn!(
                key = %key,
                error = %err,
                "Failed to release lease, TTL will reclaim it"
            ),
        }
    }
}
