//! Mock ledger store for testing.

use crate::error::{RedeemError, Result};
use crate::providers::LedgerStore;
use crate::state::{LedgerEntry, OwnerId, TicketId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct LedgerTables {
    entries: HashMap<String, LedgerEntry>,
    balances: HashMap<OwnerId, i64>,
}

/// In-memory ledger store.
///
/// Entry append and balance credit happen under one mutex, matching the
/// single-script atomicity of the Redis implementation.
#[derive(Debug, Clone, Default)]
pub struct MockLedgerStore {
    tables: Arc<Mutex<LedgerTables>>,
}

impl MockLedgerStore {
    /// Create a new mock ledger store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MockLedgerStore {
    async fn append_once(&self, entry: &LedgerEntry) -> Result<bool> {
        let mut guard = self
            .tables
            .lock()
            .map_err(|_| RedeemError::Store("ledger table mutex poisoned".to_string()))?;

        if guard.entries.contains_key(&entry.ticket_id.0) {
            return Ok(false);
        }

        guard
            .entries
            .insert(entry.ticket_id.0.clone(), entry.clone());
        *guard.balances.entry(entry.owner_id).or_insert(0) += i64::from(entry.amount);
        Ok(true)
    }

    async fn balance(&self, owner_id: &OwnerId) -> Result<i64> {
        let guard = self
            .tables
            .lock()
            .map_err(|_| RedeemError::Store("ledger table mutex poisoned".to_string()))?;

        Ok(guard.balances.get(owner_id).copied().unwrap_or(0))
    }

    async fn entry_for_ticket(&self, ticket_id: &TicketId) -> Result<Option<LedgerEntry>> {
        let guard = self
            .tables
            .lock()
            .map_err(|_| RedeemError::Store("ledger table mutex poisoned".to_string()))?;

        Ok(guard.entries.get(&ticket_id.0).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(owner: OwnerId, ticket: &str, amount: u32) -> LedgerEntry {
        LedgerEntry {
            ticket_id: TicketId(ticket.to_string()),
            owner_id: owner,
            amount,
            reason: "spin_prize".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_append_credits_once() {
        let store = MockLedgerStore::new();
        let owner = OwnerId::new();

        assert!(store.append_once(&entry(owner, "t1", 50)).await.unwrap());
        assert!(!store.append_once(&entry(owner, "t1", 50)).await.unwrap());

        assert_eq!(store.balance(&owner).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn balance_accumulates_across_tickets() {
        let store = MockLedgerStore::new();
        let owner = OwnerId::new();

        store.append_once(&entry(owner, "t1", 50)).await.unwrap();
        store.append_once(&entry(owner, "t2", 30)).await.unwrap();

        assert_eq!(store.balance(&owner).await.unwrap(), 80);
        assert!(store
            .entry_for_ticket(&TicketId("t2".to_string()))
            .await
            .unwrap()
            .is_some());
    }
}
