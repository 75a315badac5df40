//! Session-activity store trait.

use crate::error::Result;
use crate::state::{OwnerId, SessionRecord};

/// Storage for session-activity records, keyed by `(owner, session)`.
///
/// The guard in [`crate::session_guard::SessionGuard`] upserts the
/// caller's record and then scans the owner's records for freshness.
/// Stale records are ignored by the scan rather than purged here; backends
/// with native expiry may drop them on their own.
pub trait SessionStore: Send + Sync {
    /// Create or refresh the record for `(record.owner_id, record.session_id)`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn upsert(&self, record: &SessionRecord) -> impl Future<Output = Result<()>> + Send;

    /// List every session record stored for `owner_id`, fresh or stale.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn list_for_owner(
        &self,
        owner_id: &OwnerId,
    ) -> impl Future<Output = Result<Vec<SessionRecord>>> + Send;
}
