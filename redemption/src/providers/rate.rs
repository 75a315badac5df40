//! Rate-limit store trait.

use crate::error::Result;
use crate::state::{OwnerId, RateLimitRecord};

/// Storage for per-owner redemption pacing records.
///
/// Read-then-write is deliberately not atomic here: two concurrent tabs
/// may both pass the pacing check, and the leases behind it catch exactly
/// that case. The rate limiter is a cheap early rejection, not the
/// correctness guard.
pub trait RateStore: Send + Sync {
    /// Read the owner's pacing record, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn get(&self, owner_id: &OwnerId) -> impl Future<Output = Result<Option<RateLimitRecord>>> + Send;

    /// Write (create or replace) the owner's pacing record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn put(&self, record: &RateLimitRecord) -> impl Future<Output = Result<()>> + Send;
}
