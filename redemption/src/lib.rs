//! # Spinwheel Ticket Redemption
//!
//! Concurrency core for redeeming single-use spin tickets: one redemption
//! atomically draws a weighted-random prize, marks the ticket consumed
//! exactly once and credits the reward ledger, while tolerating attempts
//! from multiple tabs, multiple devices and crashed lock holders.
//!
//! ## Protocol
//!
//! ```text
//! caller → SessionGuard → RateLimiter → user lease → ticket lease
//!        → transactional commit (validate + draw + write Used)
//!        → release both leases (unconditional) → LedgerWriter
//! ```
//!
//! Mutual exclusion comes from create-if-absent leases with a TTL: a
//! holder that crashes mid-flow blocks its keys only until the TTL
//! elapses, after which any caller reclaims them. The leases are
//! advisory; the exactly-once guarantee additionally rests on the ticket
//! store's atomic commit, so even a protocol violator cannot double-spend
//! a ticket, only lose the pacing benefits.
//!
//! ## Wiring
//!
//! Store handles are injected explicitly through
//! [`RedemptionEnvironment`]: Redis-backed implementations live in
//! [`stores`], in-memory ones in [`mocks`].
//!
//! ## Example
//!
//! ```
//! use spinwheel_redemption::mocks::*;
//! use spinwheel_redemption::providers::TicketStore;
//! use spinwheel_redemption::{
//!     RedeemRequest, Redeemer, RedemptionConfig, RedemptionEnvironment, OwnerId, Ticket,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let env = RedemptionEnvironment::new(
//!     MockLeaseStore::new(),
//!     MockRateStore::new(),
//!     MockSessionStore::new(),
//!     MockTicketStore::new(),
//!     MockLedgerStore::new(),
//!     RedemptionConfig::default(),
//! );
//!
//! let owner = OwnerId::new();
//! let ticket = Ticket::issue(owner, "lesson-42", chrono::Utc::now(), 0);
//! env.tickets.insert_if_absent(&ticket).await?;
//!
//! let redeemer = Redeemer::new(env);
//! let outcome = redeemer
//!     .redeem(RedeemRequest::new(owner, ticket.id))
//!     .await?;
//! assert!(outcome.prize >= 10);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod config;
pub mod constants;
pub mod environment;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod mocks;
pub mod prize;
pub mod providers;
pub mod rate;
pub mod redeem;
pub mod session_guard;
pub mod state;
pub mod stores;

// Re-export main types for convenience
pub use config::{GuardFailurePolicy, RedemptionConfig};
pub use environment::RedemptionEnvironment;
pub use error::{RedeemError, Result};
pub use ledger::LedgerWriter;
pub use lock::LockManager;
pub use prize::PrizeSelector;
pub use rate::RateLimiter;
pub use redeem::{RedeemOutcome, RedeemRequest, Redeemer};
pub use session_guard::SessionGuard;
pub use state::{
    Lease, LeaseKey, LedgerEntry, OwnerId, RateLimitRecord, SessionId, SessionRecord, Ticket,
    TicketId, TicketStatus,
};
