//! Redis-based ledger store.
//!
//! One JSON entry per ticket under `spin_ledger:{ticket_id}` plus an
//! integer balance under `spin_balance:{owner}`. The append script makes
//! entry creation and balance credit one atomic step, keyed on the entry's
//! absence, which is what makes post-crash replay safe to run repeatedly.

use crate::error::{RedeemError, Result};
use crate::providers::LedgerStore;
use crate::state::{LedgerEntry, OwnerId, TicketId};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

/// Appends the entry and credits the balance iff the ticket is unrecorded.
const APPEND_SCRIPT: &str = r"
local created = redis.call('SETNX', KEYS[1], ARGV[1])
if created == 1 then
  redis.call('INCRBY', KEYS[2], ARGV[2])
end
return created
";

/// Redis ledger store with a Lua-scripted idempotent append.
#[derive(Clone)]
pub struct RedisLedgerStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisLedgerStore {
    /// Create a new Redis ledger store.
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

    fn entry_key(ticket_id: &TicketId) -> String {
        format!("spin_ledger:{ticket_id}")
    }

    fn balance_key(owner_id: &OwnerId) -> String {
        format!("spin_balance:{owner_id}")
    }
}

impl LedgerStore for RedisLedgerStore {
    async fn append_once(&self, entry: &LedgerEntry) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let payload = serde_json::to_string(entry)
            .map_err(|e| RedeemError::Store(format!("failed to serialize ledger entry: {e}")))?;

        let created: i64 = Script::new(APPEND_SCRIPT)
            .key(Self::entry_key(&entry.ticket_id))
            .key(Self::balance_key(&entry.owner_id))
            .arg(payload)
            .arg(entry.amount)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RedeemError::Store(format!("ledger append script failed: {e}")))?;

        Ok(created == 1)
    }

    async fn balance(&self, owner_id: &OwnerId) -> Result<i64> {
        let mut conn = self.conn_manager.clone();

        let balance: Option<i64> = conn
            .get(Self::balance_key(owner_id))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to read balance: {e}")))?;

        Ok(balance.unwrap_or(0))
    }

    async fn entry_for_ticket(&self, ticket_id: &TicketId) -> Result<Option<LedgerEntry>> {
        let mut conn = self.conn_manager.clone();

        let payload: Option<String> = conn
            .get(Self::entry_key(ticket_id))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to read ledger entry: {e}")))?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| RedeemError::Store(format!("failed to parse ledger entry: {e}")))
            })
            .transpose()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    // These tests require a running Redis instance.
    // Run with: docker run -d -p 6379:6379 redis:7-alpine

    #[tokio::test]
    #[ignore] // Requires Redis running
    async fn append_is_idempotent_per_ticket() {
        let store = RedisLedgerStore::new("redis://127.0.0.1:6379")
            .await
            .unwrap();
        let owner = OwnerId::new();
        let entry = LedgerEntry {
            ticket_id: TicketId(format!("it-{}", uuid::Uuid::new_v4())),
            owner_id: owner,
            amount: 80,
            reason: "spin_prize".to_string(),
            recorded_at: Utc::now(),
        };

        assert!(store.append_once(&entry).await.unwrap());
        assert!(!store.append_once(&entry).await.unwrap());

        assert_eq!(store.balance(&owner).await.unwrap(), 80);
        assert!(store
            .entry_for_ticket(&entry.ticket_id)
            .await
            .unwrap()
            .is_some());
    }
}
