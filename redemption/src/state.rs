//! Redemption state types.
//!
//! This module defines the core data model for the ticket-redemption flow.
//! All types are `Clone` and serde-serializable so they can be stored as
//! JSON documents by the backing stores.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ═══════════════════════════════════════════════════════════════════════
// ID Types
// ═══════════════════════════════════════════════════════════════════════

/// Unique identifier for a ticket owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(pub uuid::Uuid);

impl OwnerId {
    /// Generate a new random `OwnerId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a logical session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    /// Generate a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Stable identifier for a ticket.
///
/// Derived from owner, context and date key so that issuing the same
/// entitlement twice on the same day yields the same id (idempotent
/// issuance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    /// Derive the ticket id for `(owner, context, date_key)`.
    ///
    /// The id is the hex SHA-256 of the three components, which keeps it
    /// store-safe and fixed-width while preserving the idempotency of the
    /// underlying tuple.
    #[must_use]
    pub fn derive(owner_id: &OwnerId, context: &str, date_key: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(owner_id.0.as_bytes());
        hasher.update(b":");
        hasher.update(context.as_bytes());
        hasher.update(b":");
        hasher.update(date_key.as_bytes());
        let digest = hasher.finalize();
        let hex = digest.iter().fold(String::with_capacity(64), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        });
        Self(hex)
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Date Keys
// ═══════════════════════════════════════════════════════════════════════

/// Compute the calendar-day key for `now`, shifted into the issuance
/// timezone.
///
/// Tickets are valid only while this key matches their `date_key`, so the
/// offset must be the same one used at issuance time.
#[must_use]
pub fn date_key(now: DateTime<Utc>, issuance_offset_seconds: i32) -> String {
    let shifted = now + Duration::seconds(i64::from(issuance_offset_seconds));
    shifted.format("%Y-%m-%d").to_string()
}

// ═══════════════════════════════════════════════════════════════════════
// Tickets
// ═══════════════════════════════════════════════════════════════════════

/// Lifecycle state of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Issued but not yet redeemed.
    Pending,

    /// Redeemed. `prize` and `used_at` are set, never cleared.
    Used,
}

/// A single-use, day-scoped entitlement to one redemption.
///
/// Tickets are created by issuance (an external collaborator) and mutated
/// only by the transactional redemption commit. `status` transitions
/// `Pending` → `Used` exactly once and is never reversed; `prize` is set
/// iff `status` is `Used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Derived, stable ticket id.
    pub id: TicketId,

    /// Owner of the ticket. Only this user may redeem it.
    pub owner_id: OwnerId,

    /// Opaque reference to whatever earned the ticket.
    pub context: String,

    /// Calendar day (issuance timezone) on which the ticket is valid.
    pub date_key: String,

    /// Lifecycle state.
    pub status: TicketStatus,

    /// Prize value, set when the ticket is used.
    pub prize: Option<u32>,

    /// Issuance timestamp.
    pub created_at: DateTime<Utc>,

    /// Redemption timestamp, set when the ticket is used.
    pub used_at: Option<DateTime<Utc>>,
}

impl Ticket {
    /// Construct a `Pending` ticket with the derived idempotent id.
    ///
    /// This is the issuance *data* contract; issuance rules (time windows,
    /// source attribution) live with the caller.
    #[must_use]
    pub fn issue(
        owner_id: OwnerId,
        context: impl Into<String>,
        now: DateTime<Utc>,
        issuance_offset_seconds: i32,
    ) -> Self {
        let context = context.into();
        let date_key = date_key(now, issuance_offset_seconds);
        let id = TicketId::derive(&owner_id, &context, &date_key);
        Self {
            id,
            owner_id,
            context,
            date_key,
            status: TicketStatus::Pending,
            prize: None,
            created_at: now,
            used_at: None,
        }
    }

    /// Whether the ticket is still within its validity day.
    #[must_use]
    pub fn is_valid_on(&self, today: &str) -> bool {
        self.date_key == today
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Leases
// ═══════════════════════════════════════════════════════════════════════

/// Key of an exclusive lease.
///
/// Two tiers exist per redemption: the user lease serializes an owner's
/// attempts across devices, the ticket lease serializes attempts on one
/// ticket id. Acquisition order is always user before ticket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaseKey {
    /// Per-ticket lease.
    Ticket(TicketId),

    /// Per-user lease.
    User(OwnerId),
}

impl LeaseKey {
    /// Render the key in its storage form (`ticket:{id}` / `user:{id}`).
    #[must_use]
    pub fn storage_key(&self) -> String {
        match self {
            Self::Ticket(id) => format!("ticket:{id}"),
            Self::User(id) => format!("user:{id}"),
        }
    }
}

impl std::fmt::Display for LeaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// A time-bounded mutual-exclusion record.
///
/// At most one non-expired lease may exist per key. An expired lease is
/// reclaimable: any caller may delete and recreate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    /// Resource the lease covers.
    pub key: LeaseKey,

    /// Opaque holder identity (device fingerprint or generated id).
    /// Diagnostic metadata only, never compared cryptographically.
    pub holder: String,

    /// Acquisition timestamp.
    pub created_at: DateTime<Utc>,

    /// Expiry timestamp; past this point the lease is stale.
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Build a lease starting at `now` with the given time-to-live.
    #[must_use]
    pub fn new(key: LeaseKey, holder: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            key,
            holder: holder.into(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the lease is past its expiry and therefore reclaimable.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Guard Records
// ═══════════════════════════════════════════════════════════════════════

/// Per-owner redemption pacing record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    /// Owner being paced.
    pub owner_id: OwnerId,

    /// Timestamp of the most recent allowed redemption attempt.
    pub last_redemption_at: DateTime<Utc>,

    /// Running count of allowed attempts.
    pub count: u64,
}

/// Session-activity record for one `(owner, session)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Owner the session belongs to.
    pub owner_id: OwnerId,

    /// Logical session identifier supplied by the caller.
    pub session_id: SessionId,

    /// Last time this session touched the redemption flow.
    pub last_activity_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Whether the session counts as fresh for the conflict scan.
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_activity_at < idle_timeout
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Ledger
// ═══════════════════════════════════════════════════════════════════════

/// One reward-ledger line.
///
/// Keyed by ticket id so that recording the same redemption twice is a
/// no-op, which is what makes post-crash replay safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Ticket that produced the reward (idempotency key).
    pub ticket_id: TicketId,

    /// Credited owner.
    pub owner_id: OwnerId,

    /// Credited amount.
    pub amount: u32,

    /// Human-readable reason, e.g. `spin_prize`.
    pub reason: String,

    /// When the entry was written.
    pub recorded_at: DateTime<Utc>,
}
