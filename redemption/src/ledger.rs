//! Post-commit reward-ledger writes.

use crate::constants::SPIN_PRIZE_REASON;
use crate::error::{RedeemError, Result};
use crate::providers::LedgerStore;
use crate::state::{LedgerEntry, OwnerId, Ticket, TicketId, TicketStatus};
use chrono::Utc;

/// Appends reward-ledger entries after a redemption commits.
///
/// This step is intentionally outside the atomic scope of the ticket
/// commit: a crash in between leaves a ticket correctly `Used` with a
/// prize and the ledger line missing. Entries are keyed by ticket id, so
/// [`LedgerWriter::replay`] over `Used` tickets heals that window; the
/// core ships the primitive but does not schedule the sweep.
#[derive(Debug, Clone)]
pub struct LedgerWriter<S> {
    store: S,
}

impl<S: LedgerStore> LedgerWriter<S> {
    /// Create a ledger writer over `store`.
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a reward for `owner_id`, idempotently keyed by `ticket_id`.
    ///
    /// # Returns
    ///
    /// `true` if the entry was appended, `false` if the ticket was already
    /// recorded (the balance is untouched in that case).
    ///
    /// # Errors
    ///
    /// Returns [`RedeemError::Ledger`]. The redemption itself is final
    /// regardless; callers retry only this step.
    pub async fn record(
        &self,
        owner_id: &OwnerId,
        amount: u32,
        reason: &str,
        ticket_id: &TicketId,
    ) -> Result<bool> {
        let entry = LedgerEntry {
            ticket_id: ticket_id.clone(),
            owner_id: *owner_id,
            amount,
            reason: reason.to_string(),
            recorded_at: Utc::now(),
        };

        let appended = self
            .store
            .append_once(&entry)
            .await
            .map_err(|err| RedeemError::Ledger(err.to_string()))?;

        if appended {
            tracing::info!(
                owner = %owner_id,
                ticket = %ticket_id,
                amount = amount,
                reason = %reason,
                "Recorded reward"
            );
        } else {
            tracing::debug!(
                owner = %owner_id,
                ticket = %ticket_id,
                "Reward already recorded, skipping"
            );
        }

        Ok(appended)
    }

    /// Re-derive and append the ledger entry for a used ticket.
    ///
    /// Reconciliation primitive: sweeping `Used` tickets through this call
    /// restores any entry lost to a crash between the ticket commit and
    /// the original ledger write. Pending tickets are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`RedeemError::Ledger`] on backend failure.
    pub async fn replay(&self, ticket: &Ticket) -> Result<bool> {
        match (ticket.status, ticket.prize) {
            (TicketStatus::Used, Some(prize)) => {
                self.record(&ticket.owner_id, prize, SPIN_PRIZE_REASON, &ticket.id)
                    .await
            }
            _ => Ok(false),
        }
    }
}
