//! Mock rate-limit store for testing.

use crate::error::{RedeemError, Result};
use crate::providers::RateStore;
use crate::state::{OwnerId, RateLimitRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory rate-limit store.
#[derive(Debug, Clone, Default)]
pub struct MockRateStore {
    records: Arc<Mutex<HashMap<OwnerId, RateLimitRecord>>>,
}

impl MockRateStore {
    /// Create a new mock rate store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateStore for MockRateStore {
    async fn get(&self, owner_id: &OwnerId) -> Result<Option<RateLimitRecord>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RedeemError::Store("rate table mutex poisoned".to_string()))?;

        Ok(guard.get(owner_id).cloned())
    }

    async fn put(&self, record: &RateLimitRecord) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RedeemError::Store("rate table mutex poisoned".to_string()))?;

        guard.insert(record.owner_id, record.clone());
        Ok(())
    }
}
