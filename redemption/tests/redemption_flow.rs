//! End-to-end tests of the redemption protocol over the in-memory stores.
//!
//! These cover the concurrency properties the protocol exists for:
//! exactly-once consumption under racing attempts, lease reclaim after a
//! crashed holder, pacing, session conflicts, expiry revalidation and
//! post-commit ledger reconciliation.

#![allow(clippy::unwrap_used)]

use chrono::{Duration, Utc};
use spinwheel_redemption::mocks::{
    MockLeaseStore, MockLedgerStore, MockRateStore, MockSessionStore, MockTicketStore,
};
use spinwheel_redemption::providers::{LedgerStore, LeaseStore, RateStore, TicketStore};
use spinwheel_redemption::{
    GuardFailurePolicy, Lease, LeaseKey, LedgerWriter, LockManager, OwnerId, RateLimitRecord,
    RedeemError, RedeemRequest, Redeemer, RedemptionConfig, RedemptionEnvironment, SessionGuard,
    SessionId, SessionRecord, Ticket, TicketStatus,
};

const PRIZE_VALUES: [u32; 7] = [100, 80, 60, 50, 30, 20, 10];

type MockEnv = RedemptionEnvironment<
    MockLeaseStore,
    MockRateStore,
    MockSessionStore,
    MockTicketStore,
    MockLedgerStore,
>;

fn mock_env(config: RedemptionConfig) -> MockEnv {
    RedemptionEnvironment::new(
        MockLeaseStore::new(),
        MockRateStore::new(),
        MockSessionStore::new(),
        MockTicketStore::new(),
        MockLedgerStore::new(),
        config,
    )
}

/// Config with pacing disabled, for tests that exercise the later stages.
fn unpaced() -> RedemptionConfig {
    RedemptionConfig::new().with_min_redeem_interval(Duration::zero())
}

async fn issue_today(tickets: &MockTicketStore, owner: OwnerId, context: &str) -> Ticket {
    let ticket = Ticket::issue(owner, context, Utc::now(), 0);
    assert!(tickets.insert_if_absent(&ticket).await.unwrap());
    ticket
}

// ═══════════════════════════════════════════════════════════════════════
// Scenarios A-E
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_a_pending_ticket_redeems_with_a_prize() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let ledger = env.ledger.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    let outcome = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id.clone()))
        .await
        .unwrap();

    assert!(PRIZE_VALUES.contains(&outcome.prize));
    assert_eq!(outcome.ticket.status, TicketStatus::Used);
    assert_eq!(outcome.ticket.prize, Some(outcome.prize));
    assert!(outcome.ticket.used_at.is_some());

    // The stored ticket matches the returned snapshot.
    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored, outcome.ticket);

    // And the ledger was credited.
    assert_eq!(ledger.balance(&owner).await.unwrap(), i64::from(outcome.prize));
}

#[tokio::test]
async fn scenario_b_second_redemption_sees_already_used() {
    let env = mock_env(unpaced());
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    redeemer
        .redeem(RedeemRequest::new(owner, ticket.id.clone()))
        .await
        .unwrap();

    let err = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::TicketAlreadyUsed);
    assert!(err.is_terminal());
}

#[tokio::test]
async fn scenario_c_foreign_owner_is_rejected() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();
    let intruder = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(intruder, ticket.id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::TicketOwnership);

    // Zero side effects: the ticket is still pending for its real owner.
    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Pending);
    assert!(stored.prize.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_d_simultaneous_attempts_one_winner() {
    let env = mock_env(unpaced());
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    let a = {
        let redeemer = redeemer.clone();
        let ticket_id = ticket.id.clone();
        tokio::spawn(async move { redeemer.redeem(RedeemRequest::new(owner, ticket_id)).await })
    };
    let b = {
        let redeemer = redeemer.clone();
        let ticket_id = ticket.id.clone();
        tokio::spawn(async move { redeemer.redeem(RedeemRequest::new(owner, ticket_id)).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1, "exactly one concurrent attempt may win");

    for result in results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    RedeemError::LockContention { .. } | RedeemError::TicketAlreadyUsed
                ),
                "loser saw unexpected error: {err}"
            );
        }
    }
}

#[tokio::test]
async fn scenario_e_second_ticket_paced_with_remaining_seconds() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let rates = env.rates.clone();
    let owner = OwnerId::new();
    issue_today(&tickets, owner, "lesson-1").await;
    let second = issue_today(&tickets, owner, "lesson-2").await;

    // First redemption happened 5 seconds ago.
    rates
        .put(&RateLimitRecord {
            owner_id: owner,
            last_redemption_at: Utc::now() - Duration::seconds(5),
            count: 1,
        })
        .await
        .unwrap();

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, second.id))
        .await
        .unwrap_err();

    let RedeemError::RateLimited { retry_after } = err else {
        unreachable!("expected RateLimited, got {err}");
    };
    let secs = retry_after.as_secs();
    assert!((53..=56).contains(&secs), "remaining was {secs}s, expected ~55s");
}

// ═══════════════════════════════════════════════════════════════════════
// Exactly-once under wider contention
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn exactly_once_across_many_concurrent_attempts() {
    let env = mock_env(unpaced());
    let tickets = env.tickets.clone();
    let ledger = env.ledger.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let redeemer = redeemer.clone();
        let ticket_id = ticket.id.clone();
        handles.push(tokio::spawn(async move {
            redeemer.redeem(RedeemRequest::new(owner, ticket_id)).await
        }));
    }

    let mut wins = 0;
    let mut prize = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => {
                wins += 1;
                prize = outcome.prize;
            }
            Err(err) => assert!(
                matches!(
                    err,
                    RedeemError::LockContention { .. } | RedeemError::TicketAlreadyUsed
                ),
                "loser saw unexpected error: {err}"
            ),
        }
    }

    assert_eq!(wins, 1);
    // The single win credited the ledger exactly once.
    assert_eq!(ledger.balance(&owner).await.unwrap(), i64::from(prize));
    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Used);
    assert_eq!(stored.prize, Some(prize));
}

// ═══════════════════════════════════════════════════════════════════════
// Expiry revalidation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn yesterdays_ticket_fails_expired_even_if_never_used() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();

    // Issued yesterday, never redeemed.
    let ticket = Ticket::issue(owner, "lesson-1", Utc::now() - Duration::days(1), 0);
    tickets.insert_if_absent(&ticket).await.unwrap();

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id.clone()))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::TicketExpired);

    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Pending);
}

#[tokio::test]
async fn missing_ticket_fails_not_found() {
    let env = mock_env(RedemptionConfig::default());
    let owner = OwnerId::new();
    let phantom = Ticket::issue(owner, "never-stored", Utc::now(), 0);

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, phantom.id))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::TicketNotFound);
}

// ═══════════════════════════════════════════════════════════════════════
// Lease reclaim and release
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn live_lease_rejects_other_holders_until_expiry() {
    let leases = MockLeaseStore::new();
    let locks = LockManager::new(leases.clone());
    let key = LeaseKey::User(OwnerId::new());

    locks
        .acquire(key.clone(), "tab-one", Duration::seconds(60))
        .await
        .unwrap();

    let err = locks
        .acquire(key.clone(), "tab-two", Duration::seconds(60))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::LockContention { .. }));
}

#[tokio::test]
async fn expired_lease_is_reclaimable_by_anyone() {
    let leases = MockLeaseStore::new();
    let locks = LockManager::new(leases.clone());
    let key = LeaseKey::User(OwnerId::new());

    // A holder crashed 10 minutes ago: its lease is past expiry.
    let stale = Lease::new(
        key.clone(),
        "crashed-tab",
        Utc::now() - Duration::minutes(11),
        Duration::minutes(1),
    );
    assert!(leases.insert_if_absent(&stale).await.unwrap());

    let reclaimed = locks
        .acquire(key.clone(), "fresh-tab", Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(reclaimed.holder, "fresh-tab");
}

#[tokio::test]
async fn release_is_idempotent_and_infallible() {
    let leases = MockLeaseStore::new();
    let locks = LockManager::new(leases.clone());
    let key = LeaseKey::User(OwnerId::new());

    locks
        .acquire(key.clone(), "tab-one", Duration::seconds(60))
        .await
        .unwrap();
    locks.release(&key).await;
    // Second release of a missing lease is a quiet no-op.
    locks.release(&key).await;

    assert_eq!(leases.lease_count().unwrap(), 0);
}

#[tokio::test]
async fn leases_are_released_after_a_failed_redemption() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let leases = env.leases.clone();
    let owner = OwnerId::new();

    let expired = Ticket::issue(owner, "lesson-1", Utc::now() - Duration::days(2), 0);
    tickets.insert_if_absent(&expired).await.unwrap();

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, expired.id))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::TicketExpired);

    // Both the user and the ticket lease are gone.
    assert_eq!(leases.lease_count().unwrap(), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Rate limiting
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn pacing_rejects_within_interval_and_allows_after() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let rates = env.rates.clone();
    let owner = OwnerId::new();
    let first = issue_today(&tickets, owner, "lesson-1").await;
    let second = issue_today(&tickets, owner, "lesson-2").await;

    let redeemer = Redeemer::new(env);
    redeemer
        .redeem(RedeemRequest::new(owner, first.id))
        .await
        .unwrap();

    // Immediately after: paced.
    let err = redeemer
        .redeem(RedeemRequest::new(owner, second.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::RateLimited { .. }));

    // Pretend the interval has fully elapsed.
    rates
        .put(&RateLimitRecord {
            owner_id: owner,
            last_redemption_at: Utc::now() - Duration::seconds(61),
            count: 1,
        })
        .await
        .unwrap();

    let outcome = redeemer
        .redeem(RedeemRequest::new(owner, second.id))
        .await
        .unwrap();
    assert!(PRIZE_VALUES.contains(&outcome.prize));
}

/// Rate store that always fails, to exercise the guard policies.
#[derive(Debug, Clone, Default)]
struct BrokenRateStore;

impl RateStore for BrokenRateStore {
    async fn get(
        &self,
        _owner_id: &OwnerId,
    ) -> spinwheel_redemption::Result<Option<RateLimitRecord>> {
        Err(RedeemError::Store("rate store offline".to_string()))
    }

    async fn put(&self, _record: &RateLimitRecord) -> spinwheel_redemption::Result<()> {
        Err(RedeemError::Store("rate store offline".to_string()))
    }
}

#[tokio::test]
async fn broken_rate_store_fails_open_by_default() {
    let env = RedemptionEnvironment::new(
        MockLeaseStore::new(),
        BrokenRateStore,
        MockSessionStore::new(),
        MockTicketStore::new(),
        MockLedgerStore::new(),
        RedemptionConfig::default(),
    );
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    // Guard store down, attempt allowed through.
    let outcome = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id))
        .await
        .unwrap();
    assert!(PRIZE_VALUES.contains(&outcome.prize));
}

#[tokio::test]
async fn broken_rate_store_fails_closed_when_configured() {
    let env = RedemptionEnvironment::new(
        MockLeaseStore::new(),
        BrokenRateStore,
        MockSessionStore::new(),
        MockTicketStore::new(),
        MockLedgerStore::new(),
        RedemptionConfig::new().with_rate_guard_policy(GuardFailurePolicy::FailClosed),
    );
    let tickets = env.tickets.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, RedeemError::Store(_)));

    // Nothing was consumed.
    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Pending);
}

// ═══════════════════════════════════════════════════════════════════════
// Session guard
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn second_fresh_session_conflicts() {
    let sessions = MockSessionStore::new();
    let guard = SessionGuard::new(sessions.clone(), Duration::minutes(30));
    let owner = OwnerId::new();

    guard.touch(&owner, SessionId::new()).await.unwrap();

    let err = guard.touch(&owner, SessionId::new()).await.unwrap_err();
    assert_eq!(err, RedeemError::SessionConflict);
}

#[tokio::test]
async fn stale_sessions_are_ignored_by_the_scan() {
    let sessions = MockSessionStore::new();
    let guard = SessionGuard::new(sessions.clone(), Duration::minutes(30));
    let owner = OwnerId::new();

    // A session idle past the timeout does not count.
    sessions
        .seed(SessionRecord {
            owner_id: owner,
            session_id: SessionId::new(),
            last_activity_at: Utc::now() - Duration::minutes(45),
        })
        .unwrap();

    guard.touch(&owner, SessionId::new()).await.unwrap();
}

#[tokio::test]
async fn redemption_rejects_on_session_conflict_before_any_lock() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let sessions = env.sessions.clone();
    let leases = env.leases.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    // Another device is already active.
    sessions
        .seed(SessionRecord {
            owner_id: owner,
            session_id: SessionId::new(),
            last_activity_at: Utc::now(),
        })
        .unwrap();

    let redeemer = Redeemer::new(env);
    let err = redeemer
        .redeem(RedeemRequest::new(owner, ticket.id.clone()).with_session_id(SessionId::new()))
        .await
        .unwrap_err();
    assert_eq!(err, RedeemError::SessionConflict);

    // Rejected before any lease was taken.
    assert_eq!(leases.lease_count().unwrap(), 0);
    let stored = tickets.get(&ticket.id).await.unwrap().unwrap();
    assert_eq!(stored.status, TicketStatus::Pending);
}

#[tokio::test]
async fn missing_session_id_skips_the_guard() {
    let env = mock_env(RedemptionConfig::default());
    let tickets = env.tickets.clone();
    let sessions = env.sessions.clone();
    let owner = OwnerId::new();
    let ticket = issue_today(&tickets, owner, "lesson-1").await;

    // Two fresh sessions exist, but the caller supplies no session id.
    for _ in 0..2 {
        sessions
            .seed(SessionRecord {
                owner_id: owner,
                session_id: SessionId::new(),
                last_activity_at: Utc::now(),
            })
            .unwrap();
    }

    let redeemer = Redeemer::new(env);
    redeemer
        .redeem(RedeemRequest::new(owner, ticket.id))
        .await
        .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════
// Ledger idempotency and reconciliation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn replay_heals_a_missing_ledger_entry() {
    let tickets = MockTicketStore::new();
    let ledger_store = MockLedgerStore::new();
    let writer = LedgerWriter::new(ledger_store.clone());
    let owner = OwnerId::new();

    // Simulate a crash after the commit but before the ledger write: the
    // ticket is Used with a prize, the ledger knows nothing about it.
    let now = Utc::now();
    let ticket = Ticket::issue(owner, "lesson-1", now, 0);
    tickets.insert_if_absent(&ticket).await.unwrap();
    let committed = tickets
        .commit_redemption(&ticket.id, &owner, &ticket.date_key, 80, now)
        .await
        .unwrap();
    assert_eq!(ledger_store.balance(&owner).await.unwrap(), 0);

    // The sweep replays the used ticket.
    assert!(writer.replay(&committed).await.unwrap());
    assert_eq!(ledger_store.balance(&owner).await.unwrap(), 80);

    // Replaying again is a no-op.
    assert!(!writer.replay(&committed).await.unwrap());
    assert_eq!(ledger_store.balance(&owner).await.unwrap(), 80);
}

#[tokio::test]
async fn replay_skips_pending_tickets() {
    let ledger_store = MockLedgerStore::new();
    let writer = LedgerWriter::new(ledger_store.clone());
    let owner = OwnerId::new();
    let pending = Ticket::issue(owner, "lesson-1", Utc::now(), 0);

    assert!(!writer.replay(&pending).await.unwrap());
    assert_eq!(ledger_store.balance(&owner).await.unwrap(), 0);
}

#[tokio::test]
async fn balances_accumulate_across_days() {
    let env = mock_env(unpaced());
    let tickets = env.tickets.clone();
    let ledger = env.ledger.clone();
    let owner = OwnerId::new();
    let first = issue_today(&tickets, owner, "lesson-1").await;
    let second = issue_today(&tickets, owner, "lesson-2").await;

    let redeemer = Redeemer::new(env);
    let a = redeemer
        .redeem(RedeemRequest::new(owner, first.id.clone()))
        .await
        .unwrap();
    let b = redeemer
        .redeem(RedeemRequest::new(owner, second.id.clone()))
        .await
        .unwrap();

    assert_eq!(
        ledger.balance(&owner).await.unwrap(),
        i64::from(a.prize) + i64::from(b.prize)
    );
    assert!(ledger.entry_for_ticket(&first.id).await.unwrap().is_some());
    assert!(ledger.entry_for_ticket(&second.id).await.unwrap().is_some());
}
