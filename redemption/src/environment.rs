//! Redemption environment.
//!
//! Dependency-injection bundle for the redemption flow: every shared
//! store handle is passed in explicitly, so tests can wire the in-memory
//! mocks and production can wire the Redis stores without any global
//! collections.

use crate::config::RedemptionConfig;
use crate::providers::{LeaseStore, LedgerStore, RateStore, SessionStore, TicketStore};

/// External dependencies of the redemption flow.
///
/// # Type Parameters
///
/// - `L`: lease store
/// - `R`: rate-limit store
/// - `S`: session store
/// - `T`: ticket store
/// - `G`: ledger store
#[derive(Debug, Clone)]
pub struct RedemptionEnvironment<L, R, S, T, G> {
    /// Lease store (mutual exclusion).
    pub leases: L,

    /// Rate-limit store (pacing records).
    pub rates: R,

    /// Session store (activity records).
    pub sessions: S,

    /// Ticket store (durable entities + transactional commit).
    pub tickets: T,

    /// Ledger store (reward entries + balances).
    pub ledger: G,

    /// Protocol timings and policies.
    pub config: RedemptionConfig,
}

impl<L, R, S, T, G> RedemptionEnvironment<L, R, S, T, G>
where
    L: LeaseStore,
    R: RateStore,
    S: SessionStore,
    T: TicketStore,
    G: LedgerStore,
{
    /// Create a new redemption environment.
    #[must_use]
    pub const fn new(
        leases: L,
        rates: R,
        sessions: S,
        tickets: T,
        ledger: G,
        config: RedemptionConfig,
    ) -> Self {
        Self {
            leases,
            rates,
            sessions,
            tickets,
            ledger,
            config,
        }
    }
}
