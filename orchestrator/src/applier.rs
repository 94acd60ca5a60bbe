//! Applies ledger outcomes to the relational store.
//!
//! Confirmation delivery is at-least-once, so every path here must tolerate
//! seeing the same outcome twice. The dedup is structural: each `commit_*`
//! store operation deletes the pending row in the same transaction as the
//! domain write, so a second delivery finds no row and becomes a no-op.

use crate::stores::PortalStores;
use cakepicnic_core::action::{ActionStatus, PendingAction, PortalAction};
use cakepicnic_core::checkin::{CheckInGate, CheckInStateMachine};
use cakepicnic_core::clock::Clock;
use cakepicnic_core::domain::{CakeSubmission, Participant, VoteRecord};
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::types::TxHash;
use std::sync::Arc;
use tracing::{info, warn};

/// What applying a ledger outcome did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Domain write committed and the pending row consumed
    Applied,
    /// No pending row under the hash; a duplicate delivery, ignored
    Duplicate,
    /// Re-validation or a unique constraint failed; row marked `CommitFailed`
    Failed,
}

/// Commits confirmed actions to the store and records reverts and failures.
#[derive(Clone)]
pub struct ReconciliationApplier {
    stores: PortalStores,
    gate: CheckInStateMachine,
    clock: Arc<dyn Clock>,
}

impl ReconciliationApplier {
    /// Wire the applier to its stores.
    #[must_use]
    pub fn new(stores: PortalStores, clock: Arc<dyn Clock>) -> Self {
        let gate = stores.check_in_machine();
        Self {
            stores,
            gate,
            clock,
        }
    }

    /// Apply a confirmation: re-validate, then commit the domain write and
    /// consume the pending row atomically.
    ///
    /// A conflict or failed re-validation marks the row `CommitFailed` with
    /// the reason and keeps it; a ledger-confirmed action is never silently
    /// dropped. Infrastructure errors propagate so the listener retries on
    /// its next pass.
    ///
    /// # Errors
    ///
    /// Returns error only for store infrastructure failures.
    pub async fn apply_confirmed(&self, tx_hash: &TxHash) -> Result<ApplyOutcome> {
        let Some(pending) = self.stores.pending.find(tx_hash).await? else {
            return Ok(ApplyOutcome::Duplicate);
        };

        match self.commit(&pending).await {
            Ok(()) => {
                metrics::counter!("portal.actions.committed", "kind" => pending.action.kind().as_str())
                    .increment(1);
                info!(tx_hash = %tx_hash, kind = %pending.action.kind(), "confirmation applied");
                Ok(ApplyOutcome::Applied)
            },
            Err(err) if err.is_conflict() || err.is_precondition() => {
                let reason = err.to_string();
                self.stores
                    .pending
                    .mark(tx_hash, ActionStatus::CommitFailed, Some(&reason))
                    .await?;
                metrics::counter!("portal.actions.commit_failed", "kind" => pending.action.kind().as_str())
                    .increment(1);
                warn!(
                    tx_hash = %tx_hash,
                    kind = %pending.action.kind(),
                    reason = %reason,
                    "ledger confirmed but off-chain commit failed"
                );
                Ok(ApplyOutcome::Failed)
            },
            Err(err) => Err(err),
        }
    }

    /// Record a revert: the ledger itself refused the transaction, so there
    /// is nothing to commit. The row is retained for status queries.
    ///
    /// # Errors
    ///
    /// Returns error if the status update fails.
    pub async fn apply_reverted(&self, tx_hash: &TxHash, reason: &str) -> Result<ApplyOutcome> {
        if self.stores.pending.find(tx_hash).await?.is_none() {
            return Ok(ApplyOutcome::Duplicate);
        }
        self.stores
            .pending
            .mark(tx_hash, ActionStatus::Reverted, Some(reason))
            .await?;
        metrics::counter!("portal.actions.reverted").increment(1);
        warn!(tx_hash = %tx_hash, reason = %reason, "transaction reverted on ledger");
        Ok(ApplyOutcome::Applied)
    }

    /// The per-kind domain write. Unique constraints inside `commit_*` do
    /// the authoritative invariant checking; re-validation here covers only
    /// conditions the constraints cannot see (check-in presence for votes,
    /// cake ownership for check-in, complete voting for checkout).
    async fn commit(&self, pending: &PendingAction) -> Result<()> {
        let now = self.clock.now();
        let tx_hash = &pending.tx_hash;
        match &pending.action {
            PortalAction::Register {
                participant,
                wallet,
                tier,
                ..
            } => {
                let row = Participant {
                    id: *participant,
                    wallet: wallet.clone(),
                    tier: tier.clone(),
                    paid: true,
                    registration_tx_hash: tx_hash.clone(),
                    registered_at: now,
                };
                self.stores.participants.commit_registration(tx_hash, &row).await
            },
            PortalAction::UploadCake {
                participant,
                cake_id,
                title,
                description,
                media_url,
                media_type,
                seat,
                story,
            } => {
                let row = CakeSubmission {
                    id: *cake_id,
                    owner: *participant,
                    title: title.clone(),
                    description: description.clone(),
                    media_url: media_url.clone(),
                    media_type: media_type.clone(),
                    seat: *seat,
                    story: story.clone(),
                    tx_hash: Some(tx_hash.clone()),
                    created_at: now,
                };
                self.stores.cakes.commit_submission(tx_hash, &row).await
            },
            PortalAction::RemoveCake { cake_id, .. } => {
                // Fetch first: the media reference dies with the row.
                let media_url = self
                    .stores
                    .cakes
                    .find(*cake_id)
                    .await?
                    .map(|cake| cake.media_url);
                self.stores.cakes.commit_removal(tx_hash, *cake_id).await?;
                // The pending row is gone; a redelivery cannot retry this
                // delete, so log and move on rather than fail the commit.
                if let Some(url) = media_url {
                    if let Err(err) = self.stores.media.delete(&url).await {
                        warn!(tx_hash = %tx_hash, media_url = %url, error = %err, "media delete failed");
                    }
                }
                Ok(())
            },
            PortalAction::Vote {
                voter,
                cake_id,
                category,
            } => {
                if !self.gate.is_checked_in(*voter).await? {
                    return Err(PortalError::NotCheckedIn);
                }
                let participant = self
                    .stores
                    .participants
                    .find(*voter)
                    .await?
                    .ok_or_else(|| PortalError::UnknownParticipant(voter.to_string()))?;
                let row = VoteRecord {
                    voter: *voter,
                    cake: *cake_id,
                    category: *category,
                    tx_hash: tx_hash.clone(),
                    voter_address: participant.wallet,
                    cast_at: now,
                };
                self.stores.votes.commit_vote(&row).await
            },
            PortalAction::CheckIn { participant } => {
                // The active-cake requirement can lapse between submission
                // and confirmation if a removal confirms first.
                match self.gate.gate_check_in(*participant).await? {
                    CheckInGate::Eligible | CheckInGate::AlreadyIn => {},
                }
                self.stores
                    .check_ins
                    .commit_check_in(tx_hash, *participant, now)
                    .await
            },
            PortalAction::CheckOut { participant } => {
                self.gate.gate_check_out(*participant).await?;
                self.stores
                    .check_ins
                    .commit_check_out(tx_hash, *participant, now)
                    .await
            },
        }
    }
}
