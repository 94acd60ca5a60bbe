//! Front door of the pipeline: validate, cross-check, submit, record.
//!
//! Every precondition runs before the ledger write, because a rejected
//! payload costs nothing while a submitted transaction spends gas. Once the
//! ledger accepts a write the only record of it off-chain is the
//! `PendingAction` row created here; the confirmation listener picks it up
//! from there.

use crate::config::OrchestratorConfig;
use crate::stores::PortalStores;
use cakepicnic_core::action::{ActionKind, ActionStatus, PendingAction, PortalAction};
use cakepicnic_core::checkin::{CheckInGate, CheckInStateMachine};
use cakepicnic_core::clock::Clock;
use cakepicnic_core::domain::Participant;
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::ledger::{LedgerClient, Signer};
use cakepicnic_core::types::{CakeId, Category, Fee, ParticipantId, Seat, TxHash};
use std::sync::Arc;
use tracing::{info, warn};

/// What `submit` resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Transaction accepted by the ledger; confirmation pending
    Submitted {
        /// Hash to poll status with
        tx_hash: TxHash,
    },
    /// Check-in requested while already `IN`; nothing was submitted
    AlreadyCheckedIn,
}

impl SubmitOutcome {
    /// The submitted hash, if a transaction went out.
    #[must_use]
    pub const fn tx_hash(&self) -> Option<&TxHash> {
        match self {
            Self::Submitted { tx_hash } => Some(tx_hash),
            Self::AlreadyCheckedIn => None,
        }
    }
}

/// Validates portal actions and submits them to the ledger, recording one
/// `PendingAction` per accepted transaction.
#[derive(Clone)]
pub struct TransactionOrchestrator {
    stores: PortalStores,
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn Clock>,
    gate: CheckInStateMachine,
    config: OrchestratorConfig,
}

impl TransactionOrchestrator {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub fn new(
        stores: PortalStores,
        ledger: Arc<dyn LedgerClient>,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        let gate = stores.check_in_machine();
        Self {
            stores,
            ledger,
            clock,
            gate,
            config,
        }
    }

    /// Validate an action, submit it to the ledger, and record the pending
    /// transaction. Returns as soon as the ledger hands back a hash; the
    /// off-chain commit happens later, on confirmation.
    ///
    /// # Errors
    ///
    /// Precondition failures (`UnknownParticipant`, `FeeMismatch`,
    /// `AddressMismatch`, `DuplicateInFlight`, gating errors) return before
    /// anything is submitted; `LedgerRejected` means the wallet or contract
    /// refused the write.
    pub async fn submit(&self, action: PortalAction, signer: &Signer) -> Result<SubmitOutcome> {
        action.validate()?;
        let kind = action.kind();

        let tx_hash = match &action {
            PortalAction::Register {
                wallet,
                tier,
                offered_fee,
                ..
            } => {
                if signer.address != *wallet {
                    return Err(PortalError::AddressMismatch {
                        signer: signer.address.to_string(),
                        registered: wallet.to_string(),
                    });
                }
                let required = self.config.fee_for(tier).ok_or_else(|| {
                    PortalError::MalformedPayload(format!("unknown registration tier: {tier}"))
                })?;
                if *offered_fee != required {
                    return Err(PortalError::FeeMismatch {
                        tier: tier.clone(),
                        offered: offered_fee.wei(),
                        required: required.wei(),
                    });
                }
                if let Some(existing) = self.stores.participants.find_by_wallet(wallet).await? {
                    return Err(PortalError::AlreadyRegistered(existing.wallet.to_string()));
                }
                // Registration has no participant row yet; dedup by wallet
                // so a client retry cannot pay the fee twice.
                if self.stores.pending.in_flight_register(wallet).await?.is_some() {
                    return Err(PortalError::DuplicateInFlight);
                }
                self.ledger.register(signer, tier, *offered_fee).await?
            },
            PortalAction::UploadCake {
                participant,
                title,
                description,
                media_url,
                media_type,
                seat,
                story,
                ..
            } => {
                self.require_bound(*participant, signer).await?;
                self.guard_in_flight(*participant, kind).await?;
                self.check_seat_free(*participant, *seat).await?;
                self.ledger
                    .upload_cake(signer, title, description, media_url, media_type, *seat, story)
                    .await?
            },
            PortalAction::RemoveCake {
                participant,
                cake_id,
            } => {
                self.require_bound(*participant, signer).await?;
                self.guard_in_flight(*participant, kind).await?;
                self.require_owned_cake(*participant, *cake_id).await?;
                self.ledger.remove_cake(signer, &cake_id.to_string()).await?
            },
            PortalAction::Vote {
                voter,
                cake_id,
                category,
            } => {
                self.require_bound(*voter, signer).await?;
                self.guard_in_flight(*voter, kind).await?;
                self.check_vote_allowed(*voter, *cake_id, *category, signer).await?;
                self.ledger.vote(signer, &cake_id.to_string(), *category).await?
            },
            PortalAction::CheckIn { participant } => {
                self.require_bound(*participant, signer).await?;
                self.guard_in_flight(*participant, kind).await?;
                match self.gate.gate_check_in(*participant).await? {
                    CheckInGate::AlreadyIn => {
                        info!(participant = %participant, "check-in requested while already in");
                        return Ok(SubmitOutcome::AlreadyCheckedIn);
                    },
                    CheckInGate::Eligible => {},
                }
                self.ledger.check_in(signer).await?
            },
            PortalAction::CheckOut { participant } => {
                self.require_bound(*participant, signer).await?;
                self.guard_in_flight(*participant, kind).await?;
                self.gate.gate_check_out(*participant).await?;
                self.ledger.check_out(signer).await?
            },
        };

        let now = self.clock.now();
        let pending = PendingAction {
            tx_hash: tx_hash.clone(),
            action,
            status: ActionStatus::Submitted,
            failure_reason: None,
            submitted_at: now,
            expires_at: now + self.config.pending_ttl(),
        };
        self.stores.pending.create(&pending).await?;

        metrics::counter!("portal.actions.submitted", "kind" => kind.as_str()).increment(1);
        info!(tx_hash = %tx_hash, kind = %kind, "action submitted to ledger");
        Ok(SubmitOutcome::Submitted { tx_hash })
    }

    /// Compensate a `CommitFailed` upload: withdraw the on-chain cake the
    /// off-chain store never accepted, and release its media. The failed
    /// pending row is retained for audit.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if no `CommitFailed` upload is
    /// recorded under the hash; ledger errors propagate as `LedgerRejected`.
    pub async fn compensate_failed_upload(
        &self,
        tx_hash: &TxHash,
        signer: &Signer,
    ) -> Result<TxHash> {
        let pending = self
            .stores
            .pending
            .find(tx_hash)
            .await?
            .ok_or(PortalError::NotFound)?;
        let (PortalAction::UploadCake {
            cake_id, media_url, ..
        }, ActionStatus::CommitFailed) = (&pending.action, pending.status)
        else {
            return Err(PortalError::NotFound);
        };

        let withdrawal = self.ledger.remove_cake(signer, &cake_id.to_string()).await?;
        self.stores.media.delete(media_url).await?;
        warn!(
            failed_tx = %tx_hash,
            withdrawal_tx = %withdrawal,
            cake = %cake_id,
            "compensating upload whose off-chain commit failed"
        );
        metrics::counter!("portal.actions.compensated").increment(1);
        Ok(withdrawal)
    }

    /// Administrative vote reset for one participant. Returns the number of
    /// votes deleted.
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails.
    pub async fn reset_votes(&self, participant: ParticipantId) -> Result<u64> {
        let deleted = self.stores.votes.reset_votes(participant).await?;
        warn!(participant = %participant, deleted, "administrative vote reset");
        Ok(deleted)
    }

    /// Participant must exist and the signer must be its registered wallet.
    async fn require_bound(&self, id: ParticipantId, signer: &Signer) -> Result<Participant> {
        let participant = self
            .stores
            .participants
            .find(id)
            .await?
            .ok_or_else(|| PortalError::UnknownParticipant(id.to_string()))?;
        if participant.wallet != signer.address {
            return Err(PortalError::AddressMismatch {
                signer: signer.address.to_string(),
                registered: participant.wallet.to_string(),
            });
        }
        Ok(participant)
    }

    /// One unresolved transaction per (participant, kind) at a time.
    async fn guard_in_flight(&self, id: ParticipantId, kind: ActionKind) -> Result<()> {
        if self.stores.pending.in_flight(id, kind).await?.is_some() {
            return Err(PortalError::DuplicateInFlight);
        }
        Ok(())
    }

    /// Upload preconditions: no active cake for the owner, seat free in the
    /// store, seat free in the ledger's advisory view.
    ///
    /// The ledger view is advisory only; if the read fails the store's
    /// unique constraint still decides at commit, so submission proceeds.
    async fn check_seat_free(&self, owner: ParticipantId, seat: Seat) -> Result<()> {
        if self.stores.cakes.active_for_owner(owner).await?.is_some() {
            return Err(PortalError::AlreadySubmitted);
        }
        let ledger_view = match self.ledger.is_seat_occupied(seat).await {
            Ok(occupied) => occupied,
            Err(err) => {
                warn!(seat = %seat, error = %err, "advisory seat read failed; relying on store");
                false
            },
        };
        if self.stores.cakes.seat_taken(seat).await? || ledger_view {
            return Err(PortalError::SeatTaken {
                table: seat.table,
                seat: seat.seat,
            });
        }
        Ok(())
    }

    async fn require_owned_cake(&self, owner: ParticipantId, cake_id: CakeId) -> Result<()> {
        match self.stores.cakes.find(cake_id).await? {
            Some(cake) if cake.owner == owner => Ok(()),
            _ => Err(PortalError::NotFound),
        }
    }

    /// Vote preconditions: target cake exists, voter is checked in, and no
    /// vote exists for the (voter, category) pair in either system.
    ///
    /// As with seats, a failed advisory read never blocks submission; the
    /// (voter, category) unique constraint is authoritative.
    async fn check_vote_allowed(
        &self,
        voter: ParticipantId,
        cake_id: CakeId,
        category: Category,
        signer: &Signer,
    ) -> Result<()> {
        if self.stores.cakes.find(cake_id).await?.is_none() {
            return Err(PortalError::NotFound);
        }
        if !self.gate.is_checked_in(voter).await? {
            return Err(PortalError::NotCheckedIn);
        }
        let ledger_view = match self
            .ledger
            .has_voted_in_category(&signer.address, category)
            .await
        {
            Ok(voted) => voted,
            Err(err) => {
                warn!(
                    voter = %voter,
                    category = %category,
                    error = %err,
                    "advisory vote read failed; relying on store"
                );
                false
            },
        };
        if self.stores.votes.has_voted(voter, category).await? || ledger_view {
            return Err(PortalError::AlreadyVoted(category));
        }
        Ok(())
    }

    /// Registration fees in effect, for display.
    #[must_use]
    pub fn fee_for(&self, tier: &str) -> Option<Fee> {
        self.config.fee_for(tier)
    }
}
