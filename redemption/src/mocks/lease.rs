//! Mock lease store for testing.

use crate::error::{RedeemError, Result};
use crate::providers::LeaseStore;
use crate::state::{Lease, LeaseKey};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory lease store.
///
/// Leases are not evicted at their TTL; like the Redis payload check, the
/// lock manager treats a stored-but-expired lease as reclaimable.
#[derive(Debug, Clone, Default)]
pub struct MockLeaseStore {
    leases: Arc<Mutex<HashMap<String, Lease>>>,
}

impl MockLeaseStore {
    /// Create a new mock lease store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of leases currently stored (for assertions).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn lease_count(&self) -> Result<usize> {
        Ok(self
            .leases
            .lock()
            .map_err(|_| RedeemError::Store("lease table mutex poisoned".to_string()))?
            .len())
    }
}

impl LeaseStore for MockLeaseStore {
    async fn insert_if_absent(&self, lease: &Lease) -> Result<bool> {
        let mut guard = self
            .leases
            .lock()
            .map_err(|_| RedeemError::Store("lease table mutex poisoned".to_string()))?;

        match guard.entry(lease.key.storage_key()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(lease.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, key: &LeaseKey) -> Result<Option<Lease>> {
        let guard = self
            .leases
            .lock()
            .map_err(|_| RedeemError::Store("lease table mutex poisoned".to_string()))?;

        Ok(guard.get(&key.storage_key()).cloned())
    }

    async fn remove(&self, key: &LeaseKey) -> Result<()> {
        let mut guard = self
            .leases
            .lock()
            .map_err(|_| RedeemError::Store("lease table mutex poisoned".to_string()))?;

        guard.remove(&key.storage_key());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::OwnerId;
    use chrono::{Duration, Utc};

    fn lease_for(owner: OwnerId) -> Lease {
        Lease::new(
            LeaseKey::User(owner),
            "device-abc",
            Utc::now(),
            Duration::seconds(60),
        )
    }

    #[tokio::test]
    async fn insert_is_create_if_absent() {
        let store = MockLeaseStore::new();
        let lease = lease_for(OwnerId::new());

        assert!(store.insert_if_absent(&lease).await.unwrap());
        assert!(!store.insert_if_absent(&lease).await.unwrap());
        assert_eq!(store.lease_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let store = MockLeaseStore::new();
        let lease = lease_for(OwnerId::new());

        store.insert_if_absent(&lease).await.unwrap();
        store.remove(&lease.key).await.unwrap();
        store.remove(&lease.key).await.unwrap();

        assert!(store.get(&lease.key).await.unwrap().is_none());
    }
}
