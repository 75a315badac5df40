//! Redis-based rate-limit store.

use crate::error::{RedeemError, Result};
use crate::providers::RateStore;
use crate::state::{OwnerId, RateLimitRecord};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Cleanup TTL for pacing records; well past any sane pacing interval.
const RECORD_TTL_SECS: u64 = 86_400;

/// Redis rate-limit store.
///
/// One JSON record per owner with a one-day cleanup TTL so abandoned
/// accounts do not accumulate keys.
#[derive(Clone)]
pub struct RedisRateStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisRateStore {
    /// Create a new Redis rate store.
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

    fn redis_key(owner_id: &OwnerId) -> String {
        format!("rate:{owner_id}")
    }
}

impl RateStore for RedisRateStore {
    async fn get(&self, owner_id: &OwnerId) -> Result<Option<RateLimitRecord>> {
        let mut conn = self.conn_manager.clone();

        let payload: Option<String> = conn
            .get(Self::redis_key(owner_id))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to read rate record: {e}")))?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| RedeemError::Store(format!("failed to parse rate record: {e}")))
            })
            .transpose()
    }

    async fn put(&self, record: &RateLimitRecord) -> Result<()> {
        let mut conn = self.conn_manager.clone();

        let payload = serde_json::to_string(record)
            .map_err(|e| RedeemError::Store(format!("failed to serialize rate record: {e}")))?;

        let _: () = conn
            .set_ex(Self::redis_key(&record.owner_id), payload, RECORD_TTL_SECS)
            .await
            .map_err(|e| RedeemError::Store(format!("failed to write rate record: {e}")))?;

        tracing::debug!(
            owner = %record.owner_id,
            count = record.count,
            "Wrote rate record"
        );
        Ok(())
    }
}
