//! Mock session store for testing.

use crate::error::{RedeemError, Result};
use crate::providers::SessionStore;
use crate::state::{OwnerId, SessionId, SessionRecord};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory session store.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    records: Arc<Mutex<HashMap<(OwnerId, SessionId), SessionRecord>>>,
}

impl MockSessionStore {
    /// Create a new mock session store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record directly, bypassing the guard (for staleness tests).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn seed(&self, record: SessionRecord) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RedeemError::Store("session table mutex poisoned".to_string()))?;

        guard.insert((record.owner_id, record.session_id), record);
        Ok(())
    }
}

impl SessionStore for MockSessionStore {
    async fn upsert(&self, record: &SessionRecord) -> Result<()> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RedeemError::Store("session table mutex poisoned".to_string()))?;

        guard.insert((record.owner_id, record.session_id), record.clone());
        Ok(())
    }

    async fn list_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<SessionRecord>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| RedeemError::Store("session table mutex poisoned".to_string()))?;

        Ok(guard
            .values()
            .filter(|r| r.owner_id == *owner_id)
            .cloned()
            .collect())
    }
}
