//! Mock ticket store for testing.

use crate::error::{RedeemError, Result};
use crate::providers::TicketStore;
use crate::state::{OwnerId, Ticket, TicketId, TicketStatus};
use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory ticket store.
///
/// `commit_redemption` runs as one mutex-guarded critical section, which
/// is this backend's native atomic primitive: concurrent commits on the
/// same ticket serialize, and exactly one of them observes `Pending`.
#[derive(Debug, Clone, Default)]
pub struct MockTicketStore {
    tickets: Arc<Mutex<HashMap<String, Ticket>>>,
}

impl MockTicketStore {
    /// Create a new mock ticket store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TicketStore for MockTicketStore {
    async fn insert_if_absent(&self, ticket: &Ticket) -> Result<bool> {
        let mut guard = self
            .tickets
            .lock()
            .map_err(|_| RedeemError::Store("ticket table mutex poisoned".to_string()))?;

        match guard.entry(ticket.id.0.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, ticket_id: &TicketId) -> Result<Option<Ticket>> {
        let guard = self
            .tickets
            .lock()
            .map_err(|_| RedeemError::Store("ticket table mutex poisoned".to_string()))?;

        Ok(guard.get(&ticket_id.0).cloned())
    }

    async fn commit_redemption(
        &self,
        ticket_id: &TicketId,
        owner_id: &OwnerId,
        date_key: &str,
        prize: u32,
        used_at: DateTime<Utc>,
    ) -> Result<Ticket> {
        let mut guard = self
            .tickets
            .lock()
            .map_err(|_| RedeemError::Store("ticket table mutex poisoned".to_string()))?;

        let ticket = guard
            .get_mut(&ticket_id.0)
            .ok_or(RedeemError::TicketNotFound)?;

        if ticket.owner_id != *owner_id {
            return Err(RedeemError::TicketOwnership);
        }
        if ticket.status == TicketStatus::Used {
            return Err(RedeemError::TicketAlreadyUsed);
        }
        if ticket.date_key != date_key {
            return Err(RedeemError::TicketExpired);
        }

        ticket.status = TicketStatus::Used;
        ticket.prize = Some(prize);
        ticket.used_at = Some(used_at);

        Ok(ticket.clone())
    }
}
