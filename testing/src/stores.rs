//! In-memory implementation of every store trait.
//!
//! One mutex guards the whole state, so each `commit_*` (domain write plus
//! pending-action delete) is atomic exactly like its Postgres counterpart.
//! Uniqueness invariants are enforced here with the same typed errors the
//! constraint-backed implementation returns, so orchestrator tests exercise
//! the real protocol paths.

use async_trait::async_trait;
use cakepicnic_core::action::{ActionKind, ActionStatus, PendingAction, PortalAction};
use cakepicnic_core::domain::{
    CakeSubmission, CategoryTally, CheckInRecord, CheckInState, Participant, VoteRecord, VoteTally,
};
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::store::{
    CakeStore, CheckInStore, MediaStore, ParticipantStore, PendingActionStore, VoteStore,
};
use cakepicnic_core::types::{CakeId, Category, ParticipantId, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct PortalState {
    participants: HashMap<ParticipantId, Participant>,
    cakes: HashMap<CakeId, CakeSubmission>,
    votes: Vec<VoteRecord>,
    check_ins: HashMap<ParticipantId, CheckInRecord>,
    pending: HashMap<TxHash, PendingAction>,
}

/// Shared in-memory portal store implementing all store traits.
#[derive(Clone, Default)]
pub struct InMemoryPortalStore {
    state: Arc<Mutex<PortalState>>,
}

impl InMemoryPortalStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, PortalState>> {
        self.state
            .lock()
            .map_err(|_| PortalError::Database("store mutex poisoned".to_string()))
    }

    /// Seed a participant directly, bypassing the confirmation protocol.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn seed_participant(&self, participant: Participant) {
        self.state
            .lock()
            .unwrap()
            .participants
            .insert(participant.id, participant);
    }

    /// Seed a cake submission directly.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn seed_cake(&self, cake: CakeSubmission) {
        self.state.lock().unwrap().cakes.insert(cake.id, cake);
    }

    /// Seed a check-in record directly.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn seed_check_in(&self, record: CheckInRecord) {
        self.state
            .lock()
            .unwrap()
            .check_ins
            .insert(record.participant, record);
    }

    /// Number of votes currently stored, for idempotency assertions.
    ///
    /// # Panics
    ///
    /// Panics if the store mutex is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn vote_count(&self) -> usize {
        self.state.lock().unwrap().votes.len()
    }

    fn delete_pending(state: &mut PortalState, tx_hash: &TxHash) {
        state.pending.remove(tx_hash);
    }
}

#[async_trait]
impl ParticipantStore for InMemoryPortalStore {
    async fn find(&self, id: ParticipantId) -> Result<Option<Participant>> {
        Ok(self.lock()?.participants.get(&id).cloned())
    }

    async fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Participant>> {
        Ok(self
            .lock()?
            .participants
            .values()
            .find(|p| &p.wallet == wallet)
            .cloned())
    }

    async fn commit_registration(&self, tx_hash: &TxHash, participant: &Participant) -> Result<()> {
        let mut state = self.lock()?;
        if state
            .participants
            .values()
            .any(|p| p.wallet == participant.wallet)
        {
            return Err(PortalError::AlreadyRegistered(participant.wallet.to_string()));
        }
        state.participants.insert(participant.id, participant.clone());
        Self::delete_pending(&mut state, tx_hash);
        Ok(())
    }
}

#[async_trait]
impl CakeStore for InMemoryPortalStore {
    async fn find(&self, id: CakeId) -> Result<Option<CakeSubmission>> {
        Ok(self.lock()?.cakes.get(&id).cloned())
    }

    async fn active_for_owner(&self, owner: ParticipantId) -> Result<Option<CakeSubmission>> {
        Ok(self
            .lock()?
            .cakes
            .values()
            .find(|c| c.owner == owner)
            .cloned())
    }

    async fn seat_taken(&self, seat: cakepicnic_core::types::Seat) -> Result<bool> {
        Ok(self.lock()?.cakes.values().any(|c| c.seat == seat))
    }

    async fn commit_submission(&self, tx_hash: &TxHash, submission: &CakeSubmission) -> Result<()> {
        let mut state = self.lock()?;
        if state.cakes.values().any(|c| c.seat == submission.seat) {
            return Err(PortalError::SeatTaken {
                table: submission.seat.table,
                seat: submission.seat.seat,
            });
        }
        if state.cakes.values().any(|c| c.owner == submission.owner) {
            return Err(PortalError::AlreadySubmitted);
        }
        state.cakes.insert(submission.id, submission.clone());
        Self::delete_pending(&mut state, tx_hash);
        Ok(())
    }

    async fn commit_removal(&self, tx_hash: &TxHash, cake_id: CakeId) -> Result<()> {
        let mut state = self.lock()?;
        state.cakes.remove(&cake_id);
        Self::delete_pending(&mut state, tx_hash);
        Ok(())
    }

    async fn release(&self, cake_id: CakeId) -> Result<()> {
        self.lock()?.cakes.remove(&cake_id);
        Ok(())
    }
}

#[async_trait]
impl VoteStore for InMemoryPortalStore {
    async fn commit_vote(&self, vote: &VoteRecord) -> Result<()> {
        let mut state = self.lock()?;
        if state.votes.iter().any(|v| v.tx_hash == vote.tx_hash) {
            return Err(PortalError::DuplicateTxHash(vote.tx_hash.to_string()));
        }
        if state
            .votes
            .iter()
            .any(|v| v.voter == vote.voter && v.category == vote.category)
        {
            return Err(PortalError::AlreadyVoted(vote.category));
        }
        let tx_hash = vote.tx_hash.clone();
        state.votes.push(vote.clone());
        Self::delete_pending(&mut state, &tx_hash);
        Ok(())
    }

    async fn has_voted(&self, voter: ParticipantId, category: Category) -> Result<bool> {
        Ok(self
            .lock()?
            .votes
            .iter()
            .any(|v| v.voter == voter && v.category == category))
    }

    async fn categories_voted(&self, voter: ParticipantId) -> Result<Vec<Category>> {
        let state = self.lock()?;
        Ok(Category::ALL
            .into_iter()
            .filter(|category| {
                state
                    .votes
                    .iter()
                    .any(|v| v.voter == voter && v.category == *category)
            })
            .collect())
    }

    async fn tally(&self, cake: CakeId) -> Result<VoteTally> {
        let state = self.lock()?;
        let categories = Category::ALL
            .into_iter()
            .map(|category| {
                let voters: Vec<WalletAddress> = state
                    .votes
                    .iter()
                    .filter(|v| v.cake == cake && v.category == category)
                    .map(|v| v.voter_address.clone())
                    .collect();
                CategoryTally {
                    category,
                    count: voters.len() as u64,
                    voters,
                }
            })
            .collect();
        Ok(VoteTally { cake, categories })
    }

    async fn reset_votes(&self, voter: ParticipantId) -> Result<u64> {
        let mut state = self.lock()?;
        let before = state.votes.len();
        state.votes.retain(|v| v.voter != voter);
        Ok((before - state.votes.len()) as u64)
    }
}

#[async_trait]
impl CheckInStore for InMemoryPortalStore {
    async fn record_for(&self, participant: ParticipantId) -> Result<CheckInRecord> {
        Ok(self
            .lock()?
            .check_ins
            .get(&participant)
            .cloned()
            .unwrap_or_else(|| CheckInRecord::initial(participant)))
    }

    async fn commit_check_in(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let record = state
            .check_ins
            .entry(participant)
            .or_insert_with(|| CheckInRecord::initial(participant));
        match record.state {
            CheckInState::None => {
                record.state = CheckInState::In;
                record.checked_in_at = Some(at);
                record.check_in_tx_hash = Some(tx_hash.clone());
            },
            // Already in the target state: apply nothing, consume the pending.
            CheckInState::In => {},
            CheckInState::Out => return Err(PortalError::AlreadyCheckedOut),
        }
        Self::delete_pending(&mut state, tx_hash);
        Ok(())
    }

    async fn commit_check_out(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let record = state
            .check_ins
            .entry(participant)
            .or_insert_with(|| CheckInRecord::initial(participant));
        match record.state {
            CheckInState::In => {
                record.state = CheckInState::Out;
                record.checked_out_at = Some(at);
                record.check_out_tx_hash = Some(tx_hash.clone());
            },
            CheckInState::Out => {},
            CheckInState::None => return Err(PortalError::NotCheckedIn),
        }
        Self::delete_pending(&mut state, tx_hash);
        Ok(())
    }
}

#[async_trait]
impl PendingActionStore for InMemoryPortalStore {
    async fn create(&self, pending: &PendingAction) -> Result<()> {
        let mut state = self.lock()?;
        if state.pending.contains_key(&pending.tx_hash) {
            return Err(PortalError::DuplicateInFlight);
        }
        state.pending.insert(pending.tx_hash.clone(), pending.clone());
        Ok(())
    }

    async fn find(&self, tx_hash: &TxHash) -> Result<Option<PendingAction>> {
        Ok(self.lock()?.pending.get(tx_hash).cloned())
    }

    async fn unresolved(&self, limit: usize) -> Result<Vec<PendingAction>> {
        let state = self.lock()?;
        let mut rows: Vec<PendingAction> = state
            .pending
            .values()
            .filter(|p| p.status.is_unresolved())
            .cloned()
            .collect();
        rows.sort_by_key(|p| p.submitted_at);
        rows.truncate(limit);
        Ok(rows)
    }

    async fn in_flight(
        &self,
        participant: ParticipantId,
        kind: ActionKind,
    ) -> Result<Option<PendingAction>> {
        Ok(self
            .lock()?
            .pending
            .values()
            .find(|p| {
                p.status.is_unresolved()
                    && p.action.kind() == kind
                    && p.action.participant() == participant
            })
            .cloned())
    }

    async fn in_flight_register(&self, wallet: &WalletAddress) -> Result<Option<PendingAction>> {
        Ok(self
            .lock()?
            .pending
            .values()
            .find(|p| {
                p.status.is_unresolved()
                    && matches!(&p.action, PortalAction::Register { wallet: w, .. } if w == wallet)
            })
            .cloned())
    }

    async fn for_participant(&self, participant: ParticipantId) -> Result<Vec<PendingAction>> {
        let state = self.lock()?;
        let mut rows: Vec<PendingAction> = state
            .pending
            .values()
            .filter(|p| p.action.participant() == participant)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }

    async fn mark(
        &self,
        tx_hash: &TxHash,
        status: ActionStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        let pending = state
            .pending
            .get_mut(tx_hash)
            .ok_or(PortalError::NotFound)?;
        pending.status = status;
        pending.failure_reason = reason.map(ToString::to_string);
        Ok(())
    }
}

#[async_trait]
impl cakepicnic_core::store::CommittedTxIndex for InMemoryPortalStore {
    async fn is_committed(&self, tx_hash: &TxHash) -> Result<bool> {
        let state = self.lock()?;
        let hash = Some(tx_hash.clone());
        Ok(state
            .participants
            .values()
            .any(|p| p.registration_tx_hash == *tx_hash)
            || state.cakes.values().any(|c| c.tx_hash == hash)
            || state.votes.iter().any(|v| v.tx_hash == *tx_hash)
            || state.check_ins.values().any(|r| {
                r.check_in_tx_hash == hash || r.check_out_tx_hash == hash
            }))
    }
}

/// Media store that records deletions instead of touching storage.
#[derive(Clone, Default)]
pub struct RecordingMediaStore {
    deleted: Arc<Mutex<Vec<String>>>,
    fail_next: Arc<Mutex<bool>>,
}

impl RecordingMediaStore {
    /// Create an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Media references deleted so far.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[must_use]
    #[allow(clippy::unwrap_used)]
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Script the next delete to fail, simulating an unreachable backend.
    ///
    /// # Panics
    ///
    /// Panics if the mutex is poisoned.
    #[allow(clippy::unwrap_used)]
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }
}

#[async_trait]
impl MediaStore for RecordingMediaStore {
    async fn delete(&self, media_url: &str) -> Result<()> {
        let mut fail = self
            .fail_next
            .lock()
            .map_err(|_| PortalError::Database("media mutex poisoned".to_string()))?;
        if *fail {
            *fail = false;
            return Err(PortalError::Database("media backend unreachable".to_string()));
        }
        drop(fail);
        self.deleted
            .lock()
            .map_err(|_| PortalError::Database("media mutex poisoned".to_string()))?
            .push(media_url.to_string());
        Ok(())
    }
}
