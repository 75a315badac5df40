//! Redis-backed store implementations.
//!
//! Production wiring for the provider traits:
//!
//! - **Lease store** - `SET NX PX` create-if-absent with a JSON payload
//!   for reclaim checks
//! - **Rate store** - pacing records with a cleanup TTL
//! - **Session store** - per-owner index set + per-record keys with TTL
//! - **Ticket store** - Lua-scripted atomic redemption commit
//! - **Ledger store** - Lua-scripted idempotent append + balance credit

pub mod lease_redis;
pub mod ledger_redis;
pub mod rate_redis;
pub mod session_redis;
pub mod ticket_redis;

pub use lease_redis::RedisLeaseStore;
pub use ledger_redis::RedisLedgerStore;
pub use rate_redis::RedisRateStore;
pub use session_redis::RedisSessionStore;
pub use ticket_redis::RedisTicketStore;
