//! Reward-ledger store trait.

use crate::error::Result;
use crate::state::{LedgerEntry, OwnerId, TicketId};

/// Storage for reward-ledger entries and owner balances.
///
/// Entries are keyed by ticket id, which makes the append idempotent and
/// therefore safe to replay after a crash between the ticket commit and
/// the ledger write.
pub trait LedgerStore: Send + Sync {
    /// Append `entry` iff no entry exists for its ticket id, crediting the
    /// owner's balance in the same atomic step when it does.
    ///
    /// # Returns
    ///
    /// `true` if the entry was appended, `false` if one already existed
    /// (in which case the balance is untouched).
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn append_once(&self, entry: &LedgerEntry) -> impl Future<Output = Result<bool>> + Send;

    /// Current balance of `owner_id`. Owners with no entries have 0.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn balance(&self, owner_id: &OwnerId) -> impl Future<Output = Result<i64>> + Send;

    /// Read the entry recorded for `ticket_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn entry_for_ticket(
        &self,
        ticket_id: &TicketId,
    ) -> impl Future<Output = Result<Option<LedgerEntry>>> + Send;
}
