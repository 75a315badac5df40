//! Lease store trait.

use crate::error::Result;
use crate::state::{Lease, LeaseKey};

/// Storage for exclusive leases.
///
/// The only primitive the lock algorithm needs is create-if-absent; the
/// time-to-live logic lives in [`crate::lock::LockManager`], which also
/// reclaims expired leases. Backends that support native expiry (Redis
/// `PX`) may additionally let stale records evaporate on their own.
pub trait LeaseStore: Send + Sync {
    /// Store `lease` iff no lease exists under its key.
    ///
    /// # Returns
    ///
    /// `true` if the lease was created, `false` if the key was taken.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn insert_if_absent(&self, lease: &Lease) -> impl Future<Output = Result<bool>> + Send;

    /// Read the lease currently stored under `key`, expired or not.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn get(&self, key: &LeaseKey) -> impl Future<Output = Result<Option<Lease>>> + Send;

    /// Delete the lease under `key`. Deleting a missing key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn remove(&self, key: &LeaseKey) -> impl Future<Output = Result<()>> + Send;
}
