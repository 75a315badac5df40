//! Redemption orchestration.
//!
//! One redemption attempt walks, in order: session guard → rate limiter →
//! user lease → ticket lease → transactional commit → lease release (both,
//! unconditionally) → ledger write. Each store call is an awaited
//! suspension point; there is no cooperative cancellation, so a worker
//! that dies mid-flow is recovered by the lease TTLs alone.

use crate::config::RedemptionConfig;
use crate::constants::SPIN_PRIZE_REASON;
use crate::environment::RedemptionEnvironment;
use crate::error::Result;
use crate::ledger::LedgerWriter;
use crate::lock::LockManager;
use crate::prize::PrizeSelector;
use crate::providers::{LeaseStore, LedgerStore, RateStore, SessionStore, TicketStore};
use crate::rate::RateLimiter;
use crate::session_guard::SessionGuard;
use crate::state::{date_key, LeaseKey, OwnerId, SessionId, Ticket, TicketId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One redemption request from a caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemRequest {
    /// Owner attempting the redemption.
    pub owner_id: OwnerId,

    /// Ticket being redeemed.
    pub ticket_id: TicketId,

    /// Opaque device fingerprint; used only as lease-holder metadata.
    pub device_fingerprint: Option<String>,

    /// Logical session id. When absent, the session guard is skipped.
    pub session_id: Option<SessionId>,
}

impl RedeemRequest {
    /// Build a request with neither fingerprint nor session id.
    #[must_use]
    pub const fn new(owner_id: OwnerId, ticket_id: TicketId) -> Self {
        Self {
            owner_id,
            ticket_id,
            device_fingerprint: None,
            session_id: None,
        }
    }

    /// Attach a device fingerprint.
    #[must_use]
    pub fn with_device_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.device_fingerprint = Some(fingerprint.into());
        self
    }

    /// Attach a session id.
    #[must_use]
    pub const fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

/// Result of a successful redemption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemOutcome {
    /// Prize drawn for this redemption.
    pub prize: u32,

    /// Post-commit ticket snapshot (`Used`, prize and `used_at` set).
    pub ticket: Ticket,
}

/// Orchestrates the full redemption protocol over injected stores.
#[derive(Debug, Clone)]
pub struct Redeemer<L, R, S, T, G> {
    locks: LockManager<L>,
    rate: RateLimiter<R>,
    sessions: SessionGuard<S>,
    tickets: T,
    ledger: LedgerWriter<G>,
    config: RedemptionConfig,
}

impl<L, R, S, T, G> Redeemer<L, R, S, T, G>
where
    L: LeaseStore,
    R: RateStore,
    S: SessionStore,
    T: TicketStore,
    G: LedgerStore,
{
    /// Build a redeemer from an environment.
    #[must_use]
    pub fn new(env: RedemptionEnvironment<L, R, S, T, G>) -> Self {
        let RedemptionEnvironment {
            leases,
            rates,
            sessions,
            tickets,
            ledger,
            config,
        } = env;
        Self {
            locks: LockManager::new(leases),
            rate: RateLimiter::new(rates, config.min_redeem_interval, config.rate_guard_policy),
            sessions: SessionGuard::new(sessions, config.session_idle_timeout),
            tickets,
            ledger: LedgerWriter::new(ledger),
            config,
        }
    }

    /// Redeem a ticket.
    ///
    /// Across concurrent attempts on the same ticket, exactly one call
    /// commits; the others observe [`crate::RedeemError::LockContention`]
    /// or [`crate::RedeemError::TicketAlreadyUsed`] depending on timing.
    /// Both leases are released on every exit path, success or failure.
    ///
    /// # Errors
    ///
    /// Any variant of [`crate::RedeemError`]; see its docs for which are
    /// terminal and which are retryable.
    pub async fn redeem(&self, request: RedeemRequest) -> Result<RedeemOutcome> {
        let RedeemRequest {
            owner_id,
            ticket_id,
            device_fingerprint,
            session_id,
        } = request;

        if let Some(session_id) = session_id {
            self.sessions.touch(&owner_id, session_id).await?;
        }

        self.rate.check(&owner_id).await?;

        let holder =
            device_fingerprint.unwrap_or_else(|| format!("redeemer-{}", uuid::Uuid::new_v4()));

        // User lease before ticket lease; reversing the order here would
        // reintroduce lock-order inversion between concurrent flows.
        let user_key = LeaseKey::User(owner_id);
        let ticket_key = LeaseKey::Ticket(ticket_id.clone());

        self.locks
            .acquire(user_key.clone(), &holder, self.config.user_lock_ttl)
            .await?;

        if let Err(contended) = self
            .locks
            .acquire(ticket_key.clone(), &holder, self.config.ticket_lock_ttl)
            .await
        {
            self.locks.release(&user_key).await;
            return Err(contended);
        }

        let committed = self.commit(&owner_id, &ticket_id).await;

        // Unconditional: both leases go before the result is inspected.
        self.locks.release(&ticket_key).await;
        self.locks.release(&user_key).await;

        let outcome = committed?;

        // Post-commit, best-effort. The ticket is final either way; a
        // failure here surfaces as Ledger and is healed by replay.
        self.ledger
            .record(
                &owner_id,
                outcome.prize,
                SPIN_PRIZE_REASON,
                &outcome.ticket.id,
            )
            .await?;

        Ok(outcome)
    }

    /// Draw a prize and run the atomic commit.
    ///
    /// The draw is pure, so performing it immediately before the commit
    /// keeps the observable semantics of drawing inside the transaction:
    /// the prize becomes visible only if every in-store validation passes.
    async fn commit(&self, owner_id: &OwnerId, ticket_id: &TicketId) -> Result<RedeemOutcome> {
        let now = Utc::now();
        let today = date_key(now, self.config.issuance_offset_seconds);
        let prize = PrizeSelector::draw();

        let ticket = self
            .tickets
            .commit_redemption(ticket_id, owner_id, &today, prize, now)
            .await?;

        tracing::info!(
            owner = %owner_id,
            ticket = %ticket_id,
            prize = prize,
            "Redemption committed"
        );

        Ok(RedeemOutcome { prize, ticket })
    }
}
