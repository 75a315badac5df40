//! Redemption configuration.
//!
//! Timing parameters and guard policies for the redemption protocol.
//! Values should be provided by the application; the defaults mirror the
//! production settings.

use crate::constants::defaults;
use chrono::Duration;

/// Behavior when a non-critical guard's backing store fails.
///
/// The rate limiter is a pacing guard, not a correctness guard; the
/// double-spend protection comes from the leases and the transactional
/// commit. Failing open keeps redemptions available when the guard store
/// is down, failing closed prefers strict enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardFailurePolicy {
    /// Treat guard-store failures as "allow" (availability first).
    #[default]
    FailOpen,

    /// Surface guard-store failures to the caller (enforcement first).
    FailClosed,
}

/// Configuration for the redemption flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedemptionConfig {
    /// Time-to-live of the per-user lease.
    ///
    /// Default: 60 seconds.
    pub user_lock_ttl: Duration,

    /// Time-to-live of the per-ticket lease.
    ///
    /// Default: 30 seconds.
    pub ticket_lock_ttl: Duration,

    /// Minimum interval between two redemptions by the same owner.
    ///
    /// Default: 60 seconds.
    pub min_redeem_interval: Duration,

    /// Idle window after which a session stops counting as fresh.
    ///
    /// Default: 30 minutes.
    pub session_idle_timeout: Duration,

    /// What to do when the rate-limit store fails.
    ///
    /// Default: [`GuardFailurePolicy::FailOpen`], matching the source
    /// system's behavior.
    pub rate_guard_policy: GuardFailurePolicy,

    /// Offset of the issuance timezone from UTC, in seconds.
    ///
    /// Ticket date keys are computed in this timezone, both at issuance
    /// and again at redemption time. Default: 0 (UTC).
    pub issuance_offset_seconds: i32,
}

impl RedemptionConfig {
    /// Create a configuration with the default production timings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            user_lock_ttl: Duration::seconds(defaults::USER_LOCK_TTL_SECS),
            ticket_lock_ttl: Duration::seconds(defaults::TICKET_LOCK_TTL_SECS),
            min_redeem_interval: Duration::seconds(defaults::MIN_REDEEM_INTERVAL_SECS),
            session_idle_timeout: Duration::minutes(defaults::SESSION_IDLE_TIMEOUT_MINS),
            rate_guard_policy: GuardFailurePolicy::FailOpen,
            issuance_offset_seconds: 0,
        }
    }

    /// Set the user-lease time-to-live.
    #[must_use]
    pub const fn with_user_lock_ttl(mut self, ttl: Duration) -> Self {
        self.user_lock_ttl = ttl;
        self
    }

    /// Set the ticket-lease time-to-live.
    #[must_use]
    pub const fn with_ticket_lock_ttl(mut self, ttl: Duration) -> Self {
        self.ticket_lock_ttl = ttl;
        self
    }

    /// Set the minimum inter-redemption interval.
    #[must_use]
    pub const fn with_min_redeem_interval(mut self, interval: Duration) -> Self {
        self.min_redeem_interval = interval;
        self
    }

    /// Set the session idle timeout.
    #[must_use]
    pub const fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    /// Set the rate-guard failure policy.
    #[must_use]
    pub const fn with_rate_guard_policy(mut self, policy: GuardFailurePolicy) -> Self {
        self.rate_guard_policy = policy;
        self
    }

    /// Set the issuance timezone offset (seconds east of UTC).
    #[must_use]
    pub const fn with_issuance_offset_seconds(mut self, seconds: i32) -> Self {
        self.issuance_offset_seconds = seconds;
        self
    }
}

impl Default for RedemptionConfig {
    fn default() -> Self {
        Self::new()
    }
}
