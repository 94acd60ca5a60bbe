//! Domain entities mirrored in the relational store.

use crate::error::{PortalError, Result};
use crate::types::{CakeId, Category, ParticipantId, Seat, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A registered participant.
///
/// Created on registration confirmation. The wallet address is immutable
/// once set; the check-in state is mutated only through the check-in state
/// machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque identity
    pub id: ParticipantId,
    /// Registered wallet, lowercased 20-byte hex
    pub wallet: WalletAddress,
    /// Registration tier (drives the entrance fee)
    pub tier: String,
    /// Whether the entrance fee has been confirmed on the ledger
    pub paid: bool,
    /// Hash of the confirming registration transaction
    pub registration_tx_hash: TxHash,
    /// When the registration was committed off-chain
    pub registered_at: DateTime<Utc>,
}

/// An active cake submission.
///
/// At most one per participant; the (table, seat) pair is unique among
/// active submissions. Deleting a submission releases both constraints
/// atomically.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CakeSubmission {
    /// Submission identity
    pub id: CakeId,
    /// Owning participant
    pub owner: ParticipantId,
    /// Cake title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Reference to the stored media
    pub media_url: String,
    /// MIME-ish media kind recorded by the uploader
    pub media_type: String,
    /// Occupied spot
    pub seat: Seat,
    /// Narrative text shown in the gallery
    pub story: String,
    /// Hash of the confirming upload transaction, absent until confirmed
    pub tx_hash: Option<TxHash>,
    /// When the submission was committed off-chain
    pub created_at: DateTime<Utc>,
}

/// A confirmed vote.
///
/// Immutable once created; never updated, only deleted by explicit
/// administrative reset. The transaction hash is globally unique; the
/// replay guard for at-least-once confirmation delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    /// Voting participant
    pub voter: ParticipantId,
    /// Voted-for cake
    pub cake: CakeId,
    /// Voting category
    pub category: Category,
    /// Confirming ledger transaction, globally unique
    pub tx_hash: TxHash,
    /// Address that signed the vote, lowercased
    pub voter_address: WalletAddress,
    /// When the vote was committed off-chain
    pub cast_at: DateTime<Utc>,
}

// ============================================================================
// Check-in
// ============================================================================

/// Check-in lifecycle state.
///
/// `Out` is terminal for the event lifetime; no transition ever moves
/// backward.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckInState {
    /// Never checked in
    #[default]
    None,
    /// Physically present
    In,
    /// Left the event; terminal
    Out,
}

impl CheckInState {
    /// Convert state to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Parse state from its database string.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Database`] if the string doesn't match a
    /// known state.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(PortalError::Database(format!("Invalid check-in state: {s}"))),
        }
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    ///
    /// Only `None → In` and `In → Out` are forward moves; everything else
    /// is rejected.
    #[must_use]
    pub const fn can_advance_to(&self, to: Self) -> bool {
        matches!((self, to), (Self::None, Self::In) | (Self::In, Self::Out))
    }
}

impl fmt::Display for CheckInState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-participant check-in record with transition timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckInRecord {
    /// Participant this record belongs to
    pub participant: ParticipantId,
    /// Current lifecycle state
    pub state: CheckInState,
    /// When the participant checked in, if ever
    pub checked_in_at: Option<DateTime<Utc>>,
    /// When the participant checked out, if ever
    pub checked_out_at: Option<DateTime<Utc>>,
    /// Hash of the confirming check-in transaction
    pub check_in_tx_hash: Option<TxHash>,
    /// Hash of the confirming check-out transaction
    pub check_out_tx_hash: Option<TxHash>,
}

impl CheckInRecord {
    /// A fresh record for a participant that has never checked in.
    #[must_use]
    pub const fn initial(participant: ParticipantId) -> Self {
        Self {
            participant,
            state: CheckInState::None,
            checked_in_at: None,
            checked_out_at: None,
            check_in_tx_hash: None,
            check_out_tx_hash: None,
        }
    }
}

// ============================================================================
// Vote tally (read-side projection)
// ============================================================================

/// Per-category slice of a cake's tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTally {
    /// Category this slice counts
    pub category: Category,
    /// Number of confirmed votes
    pub count: u64,
    /// Addresses that cast them, for result display
    pub voters: Vec<WalletAddress>,
}

/// On-demand vote aggregate for one cake. Pure projection, no write path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Cake being tallied
    pub cake: CakeId,
    /// One slice per category in [`Category::ALL`] order
    pub categories: Vec<CategoryTally>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn check_in_state_roundtrip() {
        for state in [CheckInState::None, CheckInState::In, CheckInState::Out] {
            assert_eq!(CheckInState::parse(state.as_str()).unwrap(), state);
        }
        assert!(CheckInState::parse("gone").is_err());
    }

    #[test]
    fn only_forward_transitions_are_allowed() {
        assert!(CheckInState::None.can_advance_to(CheckInState::In));
        assert!(CheckInState::In.can_advance_to(CheckInState::Out));

        assert!(!CheckInState::None.can_advance_to(CheckInState::Out));
        assert!(!CheckInState::In.can_advance_to(CheckInState::None));
        assert!(!CheckInState::Out.can_advance_to(CheckInState::In));
        assert!(!CheckInState::Out.can_advance_to(CheckInState::None));
        assert!(!CheckInState::Out.can_advance_to(CheckInState::Out));
    }
}
