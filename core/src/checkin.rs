//! Check-in state machine: `NONE → IN → OUT`, forward only.
//!
//! The pure transition rules live on [`CheckInState`]; this component adds
//! the store-backed gating: check-in needs an active owned cake, checkout
//! needs a vote in every category. It is consulted twice per action: before
//! submission, and again by the reconciliation applier once the ledger has
//! confirmed (the world may have changed in between).

use crate::domain::CheckInState;
use crate::error::{PortalError, Result};
use crate::store::{CakeStore, CheckInStore, VoteStore};
use crate::types::{Category, ParticipantId};
use std::sync::Arc;

/// Outcome of a check-in eligibility probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckInGate {
    /// Transition `NONE → IN` may proceed
    Eligible,
    /// Already `IN`; the operation is idempotent and should report the
    /// current state instead of erroring
    AlreadyIn,
}

/// Store-backed gating for check-in transitions.
#[derive(Clone)]
pub struct CheckInStateMachine {
    cakes: Arc<dyn CakeStore>,
    votes: Arc<dyn VoteStore>,
    check_ins: Arc<dyn CheckInStore>,
}

impl CheckInStateMachine {
    /// Wire the machine to its stores.
    #[must_use]
    pub fn new(
        cakes: Arc<dyn CakeStore>,
        votes: Arc<dyn VoteStore>,
        check_ins: Arc<dyn CheckInStore>,
    ) -> Self {
        Self {
            cakes,
            votes,
            check_ins,
        }
    }

    /// Gate a `NONE → IN` transition.
    ///
    /// # Errors
    ///
    /// - [`PortalError::AlreadyCheckedOut`]: `OUT` is terminal
    /// - [`PortalError::MissingCake`]: no active submission owned by the
    ///   participant
    pub async fn gate_check_in(&self, participant: ParticipantId) -> Result<CheckInGate> {
        let record = self.check_ins.record_for(participant).await?;
        match record.state {
            CheckInState::In => return Ok(CheckInGate::AlreadyIn),
            CheckInState::Out => return Err(PortalError::AlreadyCheckedOut),
            CheckInState::None => {},
        }

        if self.cakes.active_for_owner(participant).await?.is_none() {
            return Err(PortalError::MissingCake);
        }

        Ok(CheckInGate::Eligible)
    }

    /// Gate an `IN → OUT` transition.
    ///
    /// # Errors
    ///
    /// - [`PortalError::NotCheckedIn`]: state is `NONE`
    /// - [`PortalError::AlreadyCheckedOut`]: state is already `OUT`
    /// - [`PortalError::IncompleteVoting`]: names every category still
    ///   missing a vote, so the caller can render a precise message
    pub async fn gate_check_out(&self, participant: ParticipantId) -> Result<()> {
        let record = self.check_ins.record_for(participant).await?;
        match record.state {
            CheckInState::None => return Err(PortalError::NotCheckedIn),
            CheckInState::Out => return Err(PortalError::AlreadyCheckedOut),
            CheckInState::In => {},
        }

        let voted = self.votes.categories_voted(participant).await?;
        let missing: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|category| !voted.contains(category))
            .collect();
        if !missing.is_empty() {
            return Err(PortalError::IncompleteVoting { missing });
        }

        Ok(())
    }

    /// Whether the participant is currently `IN`, the gate votes pass
    /// through (votes only count while physically present).
    ///
    /// # Errors
    ///
    /// Returns error if the store query fails.
    pub async fn is_checked_in(&self, participant: ParticipantId) -> Result<bool> {
        Ok(self.check_ins.record_for(participant).await?.state == CheckInState::In)
    }
}
