//! The closed set of portal actions and their lifecycle.
//!
//! Requests arrive as arbitrary JSON at the edge, but inside the portal an
//! action is always one of these tagged variants with a strongly-typed
//! payload, validated once at the boundary.

use crate::error::{PortalError, Result};
use crate::types::{CakeId, Category, Fee, ParticipantId, Seat, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a portal action, used for dedup keys and status reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Register and pay the entrance fee
    Register,
    /// Upload a cake and reserve a seat
    UploadCake,
    /// Remove a cake and release its seat
    RemoveCake,
    /// Cast a vote in one category
    Vote,
    /// Check in at the venue
    CheckIn,
    /// Check out of the venue
    CheckOut,
}

impl ActionKind {
    /// Convert kind to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::UploadCake => "upload_cake",
            Self::RemoveCake => "remove_cake",
            Self::Vote => "vote",
            Self::CheckIn => "check_in",
            Self::CheckOut => "check_out",
        }
    }

    /// Parse kind from its database string.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Database`] for unknown kinds.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "register" => Ok(Self::Register),
            "upload_cake" => Ok(Self::UploadCake),
            "remove_cake" => Ok(Self::RemoveCake),
            "vote" => Ok(Self::Vote),
            "check_in" => Ok(Self::CheckIn),
            "check_out" => Ok(Self::CheckOut),
            _ => Err(PortalError::Database(format!("Invalid action kind: {s}"))),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A portal action with its typed payload.
///
/// Identifiers for rows created on confirmation (`participant`, `cake_id`)
/// are generated at submit time and carried in the pending payload, so the
/// reconciliation applier needs nothing beyond the stored action to complete
/// the off-chain write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PortalAction {
    /// Register a new participant, paying the tier's entrance fee.
    Register {
        /// Identity assigned to the participant on commit
        participant: ParticipantId,
        /// Wallet the registration is signed with; becomes the immutable
        /// registered address on commit
        wallet: WalletAddress,
        /// Registration tier
        tier: String,
        /// Fee offered with the payable call, in wei
        offered_fee: Fee,
    },
    /// Upload a cake, reserving a (table, seat) pair.
    UploadCake {
        /// Owning participant
        participant: ParticipantId,
        /// Identity assigned to the submission on commit
        cake_id: CakeId,
        /// Cake title
        title: String,
        /// Free-form description
        description: String,
        /// Reference to the uploaded media
        media_url: String,
        /// Media kind recorded by the uploader
        media_type: String,
        /// Requested spot
        seat: Seat,
        /// Narrative text
        story: String,
    },
    /// Remove a cake, releasing its seat and media.
    RemoveCake {
        /// Owning participant
        participant: ParticipantId,
        /// Submission to withdraw
        cake_id: CakeId,
    },
    /// Cast a vote in one category.
    Vote {
        /// Voting participant
        voter: ParticipantId,
        /// Voted-for cake
        cake_id: CakeId,
        /// Voting category
        category: Category,
    },
    /// Check in at the venue.
    CheckIn {
        /// Arriving participant
        participant: ParticipantId,
    },
    /// Check out of the venue.
    CheckOut {
        /// Departing participant
        participant: ParticipantId,
    },
}

impl PortalAction {
    /// The kind of this action.
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Register { .. } => ActionKind::Register,
            Self::UploadCake { .. } => ActionKind::UploadCake,
            Self::RemoveCake { .. } => ActionKind::RemoveCake,
            Self::Vote { .. } => ActionKind::Vote,
            Self::CheckIn { .. } => ActionKind::CheckIn,
            Self::CheckOut { .. } => ActionKind::CheckOut,
        }
    }

    /// The participant the action is performed on behalf of.
    #[must_use]
    pub const fn participant(&self) -> ParticipantId {
        match self {
            Self::Register { participant, .. }
            | Self::UploadCake { participant, .. }
            | Self::RemoveCake { participant, .. }
            | Self::CheckIn { participant }
            | Self::CheckOut { participant } => *participant,
            Self::Vote { voter, .. } => *voter,
        }
    }

    /// Structural payload validation, checked before any ledger call.
    ///
    /// Fee-schedule and store-backed checks (participant existence, seat
    /// occupancy, check-in gating) live with the orchestrator; this only
    /// rejects payloads that are incomplete on their face.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::MalformedPayload`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Register { tier, .. } => {
                if tier.trim().is_empty() {
                    return Err(PortalError::MalformedPayload(
                        "registration tier must not be empty".to_string(),
                    ));
                }
            },
            Self::UploadCake {
                title,
                media_url,
                media_type,
                seat,
                ..
            } => {
                if title.trim().is_empty() {
                    return Err(PortalError::MalformedPayload(
                        "cake title must not be empty".to_string(),
                    ));
                }
                if media_url.trim().is_empty() {
                    return Err(PortalError::MalformedPayload(
                        "media url must not be empty".to_string(),
                    ));
                }
                if media_type.trim().is_empty() {
                    return Err(PortalError::MalformedPayload(
                        "media type must not be empty".to_string(),
                    ));
                }
                // Seat::new validated at construction, but payloads may be
                // deserialized straight from the wire.
                Seat::new(seat.table, seat.seat)?;
            },
            Self::RemoveCake { .. } | Self::Vote { .. } | Self::CheckIn { .. } | Self::CheckOut { .. } => {},
        }
        Ok(())
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Per-action lifecycle: `Submitted → Confirming → {Committed | Reverted |
/// CommitFailed | TimedOut}`.
///
/// `CommitFailed` is the partial-failure state (the ledger confirmed but
/// the off-chain write failed), surfaced distinctly from `Reverted` so
/// operators reconcile instead of silently losing a paid action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Accepted and submitted to the ledger
    Submitted,
    /// Receipt observed, confirmation being processed
    Confirming,
    /// Ledger confirmed and off-chain write committed
    Committed,
    /// Ledger itself rejected the transaction
    Reverted,
    /// Ledger confirmed but the off-chain invariant re-check failed
    CommitFailed,
    /// Confirmation not observed within the TTL
    TimedOut,
}

impl ActionStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Confirming => "confirming",
            Self::Committed => "committed",
            Self::Reverted => "reverted",
            Self::CommitFailed => "commit_failed",
            Self::TimedOut => "timed_out",
        }
    }

    /// Parse status from its database string.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Database`] for unknown statuses.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "submitted" => Ok(Self::Submitted),
            "confirming" => Ok(Self::Confirming),
            "committed" => Ok(Self::Committed),
            "reverted" => Ok(Self::Reverted),
            "commit_failed" => Ok(Self::CommitFailed),
            "timed_out" => Ok(Self::TimedOut),
            _ => Err(PortalError::Database(format!("Invalid action status: {s}"))),
        }
    }

    /// Whether the action still awaits a ledger receipt.
    #[must_use]
    pub const fn is_unresolved(&self) -> bool {
        matches!(self, Self::Submitted | Self::Confirming)
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ephemeral record of an in-flight action, keyed by transaction hash.
///
/// Created when a transaction is submitted; deleted, in the same store
/// transaction as the domain write, when the confirmation is applied.
/// Deletion is the commit marker: its atomicity with the domain write is
/// what makes duplicate confirmation delivery a no-op. Failed and timed-out
/// rows are retained for operator inspection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Idempotency key
    pub tx_hash: TxHash,
    /// The action with everything needed to complete the off-chain write
    pub action: PortalAction,
    /// Current lifecycle status
    pub status: ActionStatus,
    /// Why the action reverted, failed to commit, or timed out
    pub failure_reason: Option<String>,
    /// When the transaction was submitted
    pub submitted_at: DateTime<Utc>,
    /// When the confirmation wait gives up
    pub expires_at: DateTime<Utc>,
}

impl PendingAction {
    /// Whether the TTL has elapsed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn upload(title: &str, media_url: &str) -> PortalAction {
        PortalAction::UploadCake {
            participant: ParticipantId::new(),
            cake_id: CakeId::new(),
            title: title.to_string(),
            description: String::new(),
            media_url: media_url.to_string(),
            media_type: "image/png".to_string(),
            seat: Seat { table: 3, seat: 2 },
            story: String::new(),
        }
    }

    #[test]
    fn upload_requires_title_and_media() {
        assert!(upload("Lemon Drizzle", "ipfs://cake").validate().is_ok());
        assert!(upload("  ", "ipfs://cake").validate().is_err());
        assert!(upload("Lemon Drizzle", "").validate().is_err());
    }

    #[test]
    fn register_requires_tier() {
        let action = PortalAction::Register {
            participant: ParticipantId::new(),
            wallet: WalletAddress::parse("0x00000000000000000000000000000000000000aa").unwrap(),
            tier: String::new(),
            offered_fee: Fee::from_wei(1),
        };
        assert!(action.validate().is_err());
    }

    #[test]
    fn action_kind_roundtrip() {
        for kind in [
            ActionKind::Register,
            ActionKind::UploadCake,
            ActionKind::RemoveCake,
            ActionKind::Vote,
            ActionKind::CheckIn,
            ActionKind::CheckOut,
        ] {
            assert_eq!(ActionKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ActionKind::parse("dance").is_err());
    }

    #[test]
    fn status_roundtrip_and_resolution() {
        for status in [
            ActionStatus::Submitted,
            ActionStatus::Confirming,
            ActionStatus::Committed,
            ActionStatus::Reverted,
            ActionStatus::CommitFailed,
            ActionStatus::TimedOut,
        ] {
            assert_eq!(ActionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ActionStatus::Submitted.is_unresolved());
        assert!(ActionStatus::Confirming.is_unresolved());
        assert!(!ActionStatus::CommitFailed.is_unresolved());
    }
}
