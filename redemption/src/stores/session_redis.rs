//! Redis-based session store.
//!
//! Layout mirrors the usual per-user index pattern:
//!
//! - `spin_session:{owner}:{session}` → JSON [`SessionRecord`], with TTL
//! - `spin_sessions:{owner}` (Set) → session ids, with a buffered TTL
//!
//! Records past their TTL evaporate from Redis on their own; the listing
//! silently skips index members whose record key is already gone, which
//! is exactly the "stale records are ignored, not purged" contract.

use crate::error::{RedeemError, Result};
use crate::providers::SessionStore;
use crate::state::{OwnerId, SessionRecord};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Default record TTL: twice the 30-minute freshness window, so a record
/// always outlives the scan that would count it fresh.
const DEFAULT_RECORD_TTL_SECS: u64 = 3_600;

/// Extra lifetime of the index set beyond its records.
const INDEX_TTL_BUFFER_SECS: u64 = 86_400;

/// Redis session store with TTL-based expiration.
#[derive(Clone)]
pub struct RedisSessionStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,

    /// Time-to-live applied to each session record.
    record_ttl_secs: u64,
}

impl RedisSessionStore {
    /// Create a new Redis session store with the default record TTL.
    ///
    /// # Errors
    ///
    /// Returns error if connection to Redis fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)
            .map_err(|e| RedeemError::Store(format!("failed to create Redis client: {e}")))?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            RedeemError::Store(format!("failed to create Redis connection manager: {e}"))
        })?;

        Ok(Self {
            conn_manager,
            record_ttl_secs: DEFAULT_RECORD_TTL_SECS,
        })
    }

    /// Override the record TTL. Must exceed the configured freshness
    /// window or fresh sessions could vanish before the conflict scan.
    #[must_use]
    pub const fn with_record_ttl_secs(mut self, secs: u64) -> Self {
        self.record_ttl_secs = secs;
        self
    }

    fn record_key(record: &SessionRecord) -> String {
        format!("spin_session:{}:{}", record.owner_id, record.session_id)
    }

    fn index_key(owner_id: &OwnerId) -> String {
        format!("spin_sessions:{owner_id}")
    }
}

impl SessionStore for RedisSessionStore {
    async fn upsert(&self, record: &SessionRecord) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let record_key = Self::record_key(record);
        let index_key = Self::index_key(&record.owner_id);

        let payload = serde_json::to_string(record)
            .map_err(|e| RedeemError::Store(format!("failed to serialize session: {e}")))?;

        #[allow(clippy::cast_possible_wrap)]
        let index_ttl = (self.record_ttl_secs + INDEX_TTL_BUFFER_SECS) as i64;

        // Record write and index membership go together or not at all.
        let _: () = redis::pipe()
            .atomic()
            .set_ex(&record_key, payload, self.record_ttl_secs)
            .sadd(&index_key, record.session_id.0.to_string())
            .ignore()
            .expire(&index_key, index_ttl)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| RedeemError::Store(format!("failed to upsert session: {e}")))?;

        tracing::debug!(
            owner = %record.owner_id,
            session = %record.session_id,
            "Touched session record"
        );
        Ok(())
    }

    async fn list_for_owner(&self, owner_id: &OwnerId) -> Result<Vec<SessionRecord>> {
        let mut conn = self.conn_manager.clone();

        let session_ids: Vec<String> = conn
            .smembers(Self::index_key(owner_id))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to list sessions: {e}")))?;

        let mut records = Vec::with_capacity(session_ids.len());
        for session_id in session_ids {
            let key = format!("spin_session:{owner_id}:{session_id}");
            let payload: Option<String> = conn
                .get(&key)
                .await
                .map_err(|e| RedeemError::Store(format!("failed to read session: {e}")))?;

            // Expired records leave dangling index members; skip them.
            if let Some(raw) = payload {
                let record: SessionRecord = serde_json::from_str(&raw)
                    .map_err(|e| RedeemError::Store(format!("failed to parse session: {e}")))?;
                records.push(record);
            }
        }

        Ok(records)
    }
}
