//! Store traits: the relational side of the reconciliation protocol.
//!
//! Every `commit_*` operation performs the domain write **and** deletes the
//! corresponding pending action in one store transaction; that atomicity is
//! the dedup gate for at-least-once confirmation delivery. Contention-prone
//! invariants (seat grid, vote-per-category, cake-per-participant, tx-hash
//! replay) are enforced by unique constraints, not application checks;
//! multiple process instances may race, and the loser must fail
//! deterministically.

use crate::action::{ActionKind, ActionStatus, PendingAction};
use crate::domain::{CakeSubmission, CheckInRecord, Participant, VoteRecord, VoteTally};
use crate::error::Result;
use crate::types::{CakeId, Category, ParticipantId, TxHash, WalletAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Participant persistence.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    /// Fetch a participant by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails; `Ok(None)` if unknown.
    async fn find(&self, id: ParticipantId) -> Result<Option<Participant>>;

    /// Fetch a participant by registered wallet.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Participant>>;

    /// Commit a confirmed registration: insert the participant row and
    /// delete the pending action atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the wallet is already registered or the write fails.
    async fn commit_registration(&self, tx_hash: &TxHash, participant: &Participant) -> Result<()>;
}

/// Seat allocation over active cake submissions.
///
/// Two invariants, both carried by unique constraints: a participant has at
/// most one active submission, and a (table, seat) pair hosts at most one.
/// First writer wins; the loser receives a deterministic error and picks
/// another seat.
#[async_trait]
pub trait CakeStore: Send + Sync {
    /// Fetch a submission by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find(&self, id: CakeId) -> Result<Option<CakeSubmission>>;

    /// The participant's active submission, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn active_for_owner(&self, owner: ParticipantId) -> Result<Option<CakeSubmission>>;

    /// Whether an active submission occupies the (table, seat) pair.
    ///
    /// A fail-fast courtesy for submission-time validation; the unique
    /// constraint at commit time stays authoritative.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn seat_taken(&self, seat: crate::types::Seat) -> Result<bool>;

    /// Commit a confirmed upload: insert the submission row and delete the
    /// pending action atomically.
    ///
    /// # Errors
    ///
    /// - [`crate::error::PortalError::SeatTaken`]: (table, seat) already occupied
    /// - [`crate::error::PortalError::AlreadySubmitted`]: owner already has an active cake
    async fn commit_submission(&self, tx_hash: &TxHash, submission: &CakeSubmission) -> Result<()>;

    /// Commit a confirmed removal: delete the submission row and the
    /// pending action atomically, releasing the (table, seat) pair and the
    /// owner's cake slot in the same instant.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    async fn commit_removal(&self, tx_hash: &TxHash, cake_id: CakeId) -> Result<()>;

    /// Release a submission outside the confirmation path, for compensation
    /// for a `CommitFailed` upload whose ledger-side record was
    /// force-withdrawn.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    async fn release(&self, cake_id: CakeId) -> Result<()>;
}

/// Vote persistence and the read-side tally projection.
#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Commit a confirmed vote: insert the vote row and delete the pending
    /// action atomically.
    ///
    /// # Errors
    ///
    /// - [`crate::error::PortalError::AlreadyVoted`]: (voter, category) row exists
    /// - [`crate::error::PortalError::DuplicateTxHash`]: hash already applied
    async fn commit_vote(&self, vote: &VoteRecord) -> Result<()>;

    /// Whether a (voter, category) vote exists.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn has_voted(&self, voter: ParticipantId, category: Category) -> Result<bool>;

    /// Categories the voter has confirmed votes in.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn categories_voted(&self, voter: ParticipantId) -> Result<Vec<Category>>;

    /// Per-cake vote counts and voter addresses per category.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn tally(&self, cake: CakeId) -> Result<VoteTally>;

    /// Administrative reset: delete all of a voter's votes. The only delete
    /// path; votes are otherwise immutable.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    async fn reset_votes(&self, voter: ParticipantId) -> Result<u64>;
}

/// Check-in record persistence.
///
/// Both commit operations are conditional on the current state so that a
/// racing duplicate confirmation can never move the machine backward.
#[async_trait]
pub trait CheckInStore: Send + Sync {
    /// The participant's record; a fresh `NONE` record if never seen.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn record_for(&self, participant: ParticipantId) -> Result<CheckInRecord>;

    /// Commit a confirmed check-in (`NONE → IN`) and delete the pending
    /// action atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not from `NONE` or the write fails.
    async fn commit_check_in(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()>;

    /// Commit a confirmed check-out (`IN → OUT`) and delete the pending
    /// action atomically.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not from `IN` or the write fails.
    async fn commit_check_out(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()>;
}

/// Pending-action persistence, the in-flight half of the protocol.
#[async_trait]
pub trait PendingActionStore: Send + Sync {
    /// Record a freshly submitted action.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::PortalError::DuplicateInFlight`] if the hash
    /// is already recorded.
    async fn create(&self, pending: &PendingAction) -> Result<()>;

    /// Fetch by transaction hash.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn find(&self, tx_hash: &TxHash) -> Result<Option<PendingAction>>;

    /// Unresolved actions (submitted or confirming), oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn unresolved(&self, limit: usize) -> Result<Vec<PendingAction>>;

    /// The unresolved action of a given kind for a participant, if any;
    /// the duplicate-in-flight guard.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn in_flight(
        &self,
        participant: ParticipantId,
        kind: ActionKind,
    ) -> Result<Option<PendingAction>>;

    /// The unresolved registration for a wallet, if any. Registration has
    /// no committed participant row to key on, so its in-flight guard goes
    /// by the wallet inside the pending payload.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn in_flight_register(&self, wallet: &WalletAddress) -> Result<Option<PendingAction>>;

    /// All actions recorded for a participant, newest first; the support
    /// workflow view (`CommitFailed` / `TimedOut` rows live here).
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn for_participant(&self, participant: ParticipantId) -> Result<Vec<PendingAction>>;

    /// Move an action to a new status, recording a reason. Used for
    /// `Confirming`, `Reverted`, `CommitFailed`, and `TimedOut`; the
    /// `Committed` transition happens implicitly via `commit_*` deletion.
    ///
    /// # Errors
    ///
    /// Returns error if the row does not exist or the update fails.
    async fn mark(
        &self,
        tx_hash: &TxHash,
        status: ActionStatus,
        reason: Option<&str>,
    ) -> Result<()>;
}

/// Lookup over the transaction hashes stamped onto committed domain rows.
///
/// Committed actions delete their pending row, so resolving a status query
/// for an already-applied hash means asking the domain tables instead.
#[async_trait]
pub trait CommittedTxIndex: Send + Sync {
    /// Whether any committed domain row carries this transaction hash.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    async fn is_committed(&self, tx_hash: &TxHash) -> Result<bool>;
}

/// Stored-media lifecycle.
///
/// Asset hosting itself is out of scope; the portal only needs a seam to
/// delete media when its cake is withdrawn.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Delete the media behind a reference.
    ///
    /// # Errors
    ///
    /// Returns error if deletion fails; a missing object is `Ok`.
    async fn delete(&self, media_url: &str) -> Result<()>;
}
