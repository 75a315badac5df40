//! Ticket store trait.

use crate::error::Result;
use crate::state::{OwnerId, Ticket, TicketId};
use chrono::{DateTime, Utc};

/// Storage for tickets, including the transactional redemption commit.
///
/// Tickets are durable entities: issuance creates them, the commit below
/// is the only thing that ever mutates one. The commit must run against
/// the backend's native atomic primitive (a Lua script for Redis, one
/// mutex-guarded critical section for the in-memory store), never as a
/// best-effort sequence of separate reads and writes.
pub trait TicketStore: Send + Sync {
    /// Store `ticket` iff no ticket exists under its id.
    ///
    /// Ticket ids are derived from `(owner, context, date_key)`, so
    /// replaying an issuance is a no-op rather than a duplicate.
    ///
    /// # Returns
    ///
    /// `true` if the ticket was created, `false` if the id was taken.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn insert_if_absent(&self, ticket: &Ticket) -> impl Future<Output = Result<bool>> + Send;

    /// Read a ticket by id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::RedeemError::Store`] on backend failure.
    fn get(&self, ticket_id: &TicketId) -> impl Future<Output = Result<Option<Ticket>>> + Send;

    /// Atomically validate and consume a ticket.
    ///
    /// In one atomic step against the backend: read the ticket, check that
    /// it exists, belongs to `owner_id`, is still `Pending` and is valid on
    /// `date_key`, then write `Used` + `prize` + `used_at` and return the
    /// post-write snapshot. A validation failure aborts with zero side
    /// effects; no intermediate state ("used but no prize", "prize but
    /// still pending") is ever observable.
    ///
    /// # Errors
    ///
    /// - [`crate::RedeemError::TicketNotFound`] - no ticket under the id
    /// - [`crate::RedeemError::TicketOwnership`] - owned by someone else
    /// - [`crate::RedeemError::TicketAlreadyUsed`] - already consumed
    /// - [`crate::RedeemError::TicketExpired`] - `date_key` mismatch
    /// - [`crate::RedeemError::Store`] - backend failure (retryable; this
    ///   method never retries internally)
    fn commit_redemption(
        &self,
        ticket_id: &TicketId,
        owner_id: &OwnerId,
        date_key: &str,
        prize: u32,
        used_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<Ticket>> + Send;
}
