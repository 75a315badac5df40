//! Concurrent-session detection.

use crate::error::{RedeemError, Result};
use crate::providers::SessionStore;
use crate::state::{OwnerId, SessionId, SessionRecord};
use chrono::{Duration, Utc};

/// Rejects redemption when an owner has more than one fresh session.
///
/// Each call upserts the caller's `(owner, session)` activity record and
/// then scans all of the owner's records. Records idle past the timeout
/// are ignored by the scan, not purged. Callers that supply no session id
/// skip this guard entirely.
#[derive(Debug, Clone)]
pub struct SessionGuard<S> {
    store: S,
    idle_timeout: Duration,
}

impl<S: SessionStore> SessionGuard<S> {
    /// Create a session guard over `store`.
    #[must_use]
    pub const fn new(store: S, idle_timeout: Duration) -> Self {
        Self {
            store,
            idle_timeout,
        }
    }

    /// Record activity for `(owner, session)` and check for conflicts.
    ///
    /// # Errors
    ///
    /// - [`RedeemError::SessionConflict`] - more than one fresh session.
    /// - [`RedeemError::Store`] - backend failure.
    pub async fn touch(&self, owner_id: &OwnerId, session_id: SessionId) -> Result<()> {
        let now = Utc::now();

        self.store
            .upsert(&SessionRecord {
                owner_id: *owner_id,
                session_id,
                last_activity_at: now,
            })
            .await?;

        let records = self.store.list_for_owner(owner_id).await?;
        let fresh = records
            .iter()
            .filter(|r| r.is_fresh(now, self.idle_timeout))
            .count();

        if fresh > 1 {
            tracing::warn!(
                owner = %owner_id,
                session = %session_id,
                fresh_sessions = fresh,
                "Concurrent session detected"
            );
            return Err(RedeemError::SessionConflict);
        }

        Ok(())
    }
}
