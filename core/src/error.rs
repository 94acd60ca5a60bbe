//! Error taxonomy for the reconciliation protocol.

use crate::types::Category;
use thiserror::Error;

/// Result type alias for portal operations.
pub type Result<T> = std::result::Result<T, PortalError>;

/// All failure modes of the submit → await → commit pipeline.
///
/// Four families matter operationally: local precondition failures (never
/// touched the ledger), ledger rejections (terminal for that attempt),
/// commit failures (ledger confirmed, store write lost the race), and
/// timeouts (confirmation never observed within the TTL).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PortalError {
    // ═══════════════════════════════════════════════════════════
    // Precondition errors (local, before any ledger call)
    // ═══════════════════════════════════════════════════════════

    /// Participant does not exist.
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Category outside the closed set.
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Payload failed structural validation.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Wallet address is not a 20-byte hex string.
    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    /// Transaction hash is not a 32-byte hex string.
    #[error("Invalid transaction hash: {0}")]
    InvalidTxHash(String),

    /// Offered registration fee does not match the configured tier fee.
    #[error("Fee mismatch for tier {tier}: offered {offered} wei, required {required} wei")]
    FeeMismatch {
        /// Registration tier
        tier: String,
        /// Fee offered by the caller, in wei
        offered: u64,
        /// Fee configured for the tier, in wei
        required: u64,
    },

    /// Signer address does not match the participant's registered wallet.
    #[error("Address mismatch: signer {signer} is not the registered wallet {registered}")]
    AddressMismatch {
        /// Address that signed the transaction
        signer: String,
        /// Wallet bound to the participant at registration
        registered: String,
    },

    /// Same logical action already has an unresolved transaction in flight.
    #[error("An identical action is already awaiting confirmation")]
    DuplicateInFlight,

    // ═══════════════════════════════════════════════════════════
    // Invariant conflicts (store-level unique constraints)
    // ═══════════════════════════════════════════════════════════

    /// Another active submission already occupies the (table, seat) pair.
    #[error("Seat already taken: table {table}, seat {seat}")]
    SeatTaken {
        /// Table number
        table: i16,
        /// Seat number
        seat: i16,
    },

    /// Participant already has an active cake submission.
    #[error("Participant already has an active cake submission")]
    AlreadySubmitted,

    /// Wallet address is already bound to a registered participant.
    #[error("Wallet already registered: {0}")]
    AlreadyRegistered(String),

    /// A vote already exists for this (voter, category) pair.
    #[error("Already voted in category {0}")]
    AlreadyVoted(Category),

    /// This transaction hash was already applied to the store.
    #[error("Transaction hash already recorded: {0}")]
    DuplicateTxHash(String),

    // ═══════════════════════════════════════════════════════════
    // Check-in gating
    // ═══════════════════════════════════════════════════════════

    /// Participant is not checked in.
    #[error("Participant is not checked in")]
    NotCheckedIn,

    /// Participant has checked out; OUT is terminal for the event.
    #[error("Participant has already checked out")]
    AlreadyCheckedOut,

    /// Check-in requires an active cake submission owned by the participant.
    #[error("Check-in requires an active cake submission")]
    MissingCake,

    /// Checkout requires a vote in every category; names the gaps.
    #[error("Voting incomplete, missing categories: {}", format_categories(missing))]
    IncompleteVoting {
        /// Categories the participant has not yet voted in
        missing: Vec<Category>,
    },

    // ═══════════════════════════════════════════════════════════
    // Ledger outcomes
    // ═══════════════════════════════════════════════════════════

    /// The ledger (wallet or contract) rejected the transaction.
    ///
    /// Terminal for this attempt; the caller must submit a new action.
    #[error("Ledger rejected the transaction: {reason}")]
    LedgerRejected {
        /// Wallet/contract-side rejection reason
        reason: String,
    },

    /// Ledger confirmed but the off-chain invariant re-check failed.
    ///
    /// Never silently discarded; retained for operator reconciliation.
    #[error("Ledger confirmed but off-chain commit failed: {reason}")]
    CommitFailed {
        /// Human-readable re-validation failure
        reason: String,
    },

    /// Confirmation was not observed within the pending-action TTL.
    #[error("Confirmation not observed within the timeout")]
    CommitTimeout,

    // ═══════════════════════════════════════════════════════════
    // System errors
    // ═══════════════════════════════════════════════════════════

    /// Requested record does not exist.
    #[error("Resource not found")]
    NotFound,

    /// Store operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// Payload (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn format_categories(missing: &[Category]) -> String {
    missing
        .iter()
        .map(Category::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PortalError {
    /// Returns `true` for local precondition failures that never touched
    /// the ledger and are cheap to retry after correction.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::UnknownParticipant(_)
                | Self::InvalidCategory(_)
                | Self::MalformedPayload(_)
                | Self::InvalidAddress(_)
                | Self::InvalidTxHash(_)
                | Self::FeeMismatch { .. }
                | Self::AddressMismatch { .. }
                | Self::DuplicateInFlight
                | Self::MissingCake
                | Self::NotCheckedIn
                | Self::AlreadyCheckedOut
                | Self::IncompleteVoting { .. }
        )
    }

    /// Returns `true` for deterministic store-level uniqueness conflicts.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::SeatTaken { .. }
                | Self::AlreadySubmitted
                | Self::AlreadyRegistered(_)
                | Self::AlreadyVoted(_)
                | Self::DuplicateTxHash(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_voting_names_missing_categories() {
        let err = PortalError::IncompleteVoting {
            missing: vec![Category::Delicious],
        };
        assert_eq!(
            err.to_string(),
            "Voting incomplete, missing categories: delicious"
        );
    }

    #[test]
    fn classification_is_disjoint() {
        let precondition = PortalError::DuplicateInFlight;
        let conflict = PortalError::AlreadySubmitted;
        assert!(precondition.is_precondition() && !precondition.is_conflict());
        assert!(conflict.is_conflict() && !conflict.is_precondition());
        assert!(!PortalError::CommitTimeout.is_precondition());
        assert!(!PortalError::CommitTimeout.is_conflict());
    }
}
