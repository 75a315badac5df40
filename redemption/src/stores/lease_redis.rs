//! Redis-based lease store.
//!
//! Leases are `SET NX PX` keys: creation is atomic, expiry is native.
//! The lease body is stored as JSON so the lock manager can read the
//! holder and expiry of a conflicting lease; the manual expiry check in
//! the manager also covers clock skew between this process and Redis.

use crate::error::{RedeemError, Result};
use crate::providers::LeaseStore;
use crate::state::{Lease, LeaseKey};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Redis lease store using `SET NX PX`.
#[derive(Clone)]
pub struct RedisLeaseStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisLeaseStore {
    /// Create a new Redis lease store.
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

        Ok(Self { conn_manager })
    }

    fn redis_key(key: &LeaseKey) -> String {
        format!("lease:{}", key.storage_key())
    }
}

impl LeaseStore for RedisLeaseStore {
    async fn insert_if_absent(&self, lease: &Lease) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let key = Self::redis_key(&lease.key);

        let payload = serde_json::to_string(lease)
            .map_err(|e| RedeemError::Store(format!("failed to serialize lease: {e}")))?;

        #[allow(clippy::cast_sign_loss)]
        let ttl_ms = (lease.expires_at - lease.created_at)
            .num_milliseconds()
            .max(1) as u64;

        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(payload)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| RedeemError::Store(format!("failed to create lease: {e}")))?;

        let created = reply.is_some();
        tracing::debug!(
            key = %lease.key,
            holder = %lease.holder,
            created = created,
            ttl_ms = ttl_ms,
            "Lease create-if-absent"
        );
        Ok(created)
    }

    async fn get(&self, key: &LeaseKey) -> Result<Option<Lease>> {
        let mut conn = self.conn_manager.clone();

        let payload: Option<String> = conn
            .get(Self::redis_key(key))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to read lease: {e}")))?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| RedeemError::Store(format!("failed to parse lease: {e}")))
            })
            .transpose()
    }

    async fn remove(&self, key: &LeaseKey) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let _: () = conn
            .del(Self::redis_key(key))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to delete lease: {e}")))?;

        Ok(())
    }
}
