//! Redis-based ticket store.
//!
//! Tickets are durable JSON documents under `spin_ticket:{id}`. The
//! redemption commit runs as a Lua script, Redis's native atomic
//! read-modify-write primitive: validation and the `Used` write happen in
//! one step, so no interleaving can observe a half-redeemed ticket.

use crate::error::{RedeemError, Result};
use crate::providers::TicketStore;
use crate::state::{OwnerId, Ticket, TicketId};
use chrono::{DateTime, SecondsFormat, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

/// Validates and consumes a ticket in one atomic step.
///
/// Returns the updated ticket JSON on success, or an `ERR:`-prefixed code
/// for each validation failure, checked in the same order the in-memory
/// store uses.
const REDEEM_SCRIPT: &str = r"
local raw = redis.call('GET', KEYS[1])
if not raw then
  return 'ERR:not_found'
end
local ticket = cjson.decode(raw)
if ticket.owner_id ~= ARGV[1] then
  return 'ERR:ownership'
end
if ticket.status == 'used' then
  return 'ERR:already_used'
end
if ticket.date_key ~= ARGV[2] then
  return 'ERR:expired'
end
ticket.status = 'used'
ticket.prize = tonumber(ARGV[3])
ticket.used_at = ARGV[4]
local updated = cjson.encode(ticket)
redis.call('SET', KEYS[1], updated)
return updated
";

/// Redis ticket store with a Lua-scripted commit.
#[derive(Clone)]
pub struct RedisTicketStore {
    /// Connection manager for connection pooling.
    conn_manager: ConnectionManager,
}

impl RedisTicketStore {
    /// Create a new Redis ticket store.
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

    fn redis_key(ticket_id: &TicketId) -> String {
        format!("spin_ticket:{ticket_id}")
    }
}

impl TicketStore for RedisTicketStore {
    async fn insert_if_absent(&self, ticket: &Ticket) -> Result<bool> {
        let mut conn = self.conn_manager.clone();

        let payload = serde_json::to_string(ticket)
            .map_err(|e| RedeemError::Store(format!("failed to serialize ticket: {e}")))?;

        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::redis_key(&ticket.id))
            .arg(payload)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| RedeemError::Store(format!("failed to create ticket: {e}")))?;

        Ok(reply.is_some())
    }

    async fn get(&self, ticket_id: &TicketId) -> Result<Option<Ticket>> {
        let mut conn = self.conn_manager.clone();

        let payload: Option<String> = conn
            .get(Self::redis_key(ticket_id))
            .await
            .map_err(|e| RedeemError::Store(format!("failed to read ticket: {e}")))?;

        payload
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| RedeemError::Store(format!("failed to parse ticket: {e}")))
            })
            .transpose()
    }

    async fn commit_redemption(
        &self,
        ticket_id: &TicketId,
        owner_id: &OwnerId,
        date_key: &str,
        prize: u32,
        used_at: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut conn = self.conn_manager.clone();

        let reply: String = Script::new(REDEEM_SCRIPT)
            .key(Self::redis_key(ticket_id))
            .arg(owner_id.0.to_string())
            .arg(date_key)
            .arg(prize)
            .arg(used_at.to_rfc3339_opts(SecondsFormat::Micros, true))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| RedeemError::Store(format!("redemption script failed: {e}")))?;

        match reply.strip_prefix("ERR:") {
            Some("not_found") => Err(RedeemError::TicketNotFound),
            Some("ownership") => Err(RedeemError::TicketOwnership),
            Some("already_used") => Err(RedeemError::TicketAlreadyUsed),
            Some("expired") => Err(RedeemError::TicketExpired),
            Some(other) => Err(RedeemError::Store(format!(
                "unexpected redemption script reply: {other}"
            ))),
            None => serde_json::from_str(&reply)
                .map_err(|e| RedeemError::Store(format!("failed to parse committed ticket: {e}"))),
        }
    }
}
