//! Error types for the redemption flow.

use thiserror::Error;

/// Result type alias for redemption operations.
pub type Result<T> = std::result::Result<T, RedeemError>;

/// Error taxonomy for ticket redemption.
///
/// Every kind is surfaced distinctly to the caller; only unclassified
/// infrastructure failures collapse into [`RedeemError::Store`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedeemError {
    // ═══════════════════════════════════════════════════════════
    // Guard Rejections (transient, retryable by the caller)
    // ═══════════════════════════════════════════════════════════

    /// More than one fresh session detected for the owner.
    #[error("another session is already active for this account")]
    SessionConflict,

    /// Redemption attempted before the minimum interval elapsed.
    #[error("redeemed too recently, retry in {retry_after:?}")]
    RateLimited {
        /// Time remaining until the next redemption is allowed.
        retry_after: std::time::Duration,
    },

    /// User or ticket lease is held by a non-expired holder.
    #[error("redemption already in progress for {key}")]
    LockContention {
        /// Storage key of the contended lease.
        key: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Ticket Validation (terminal, retrying will not succeed)
    // ═══════════════════════════════════════════════════════════

    /// No ticket exists under the requested id.
    #[error("ticket not found")]
    TicketNotFound,

    /// The ticket belongs to a different owner.
    #[error("ticket belongs to a different user")]
    TicketOwnership,

    /// The ticket was already redeemed.
    #[error("ticket has already been used")]
    TicketAlreadyUsed,

    /// The ticket's validity day has passed.
    #[error("ticket expired at the end of its issuance day")]
    TicketExpired,

    // ═══════════════════════════════════════════════════════════
    // Post-Commit / Infrastructure
    // ═══════════════════════════════════════════════════════════

    /// Ledger write failed after the ticket was committed.
    ///
    /// The ticket state is final; the caller must not re-attempt the
    /// redemption, only retry the ledger reconciliation.
    #[error("reward ledger write failed: {0}")]
    Ledger(String),

    /// Backing-store failure. Retryable at the caller's discretion.
    #[error("store error: {0}")]
    Store(String),
}

impl RedeemError {
    /// Returns `true` for terminal ticket-validation failures.
    ///
    /// Retrying these cannot succeed: the ticket is missing, foreign,
    /// spent, or past its day.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spinwheel_redemption::RedeemError;
    /// assert!(RedeemError::TicketAlreadyUsed.is_terminal());
    /// assert!(!RedeemError::SessionConflict.is_terminal());
    /// ```
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::TicketNotFound
                | Self::TicketOwnership
                | Self::TicketAlreadyUsed
                | Self::TicketExpired
        )
    }

    /// Returns `true` if the caller may retry the redemption after a
    /// backoff delay.
    ///
    /// # Examples
    ///
    /// ```
    /// # use spinwheel_redemption::RedeemError;
    /// assert!(RedeemError::SessionConflict.is_retryable());
    /// assert!(!RedeemError::TicketExpired.is_retryable());
    /// ```
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SessionConflict
                | Self::RateLimited { .. }
                | Self::LockContention { .. }
                | Self::Store(_)
        )
    }
}
