//! The bundle of store handles the pipeline operates over.

use cakepicnic_core::checkin::CheckInStateMachine;
use cakepicnic_core::store::{
    CakeStore, CheckInStore, CommittedTxIndex, MediaStore, ParticipantStore, PendingActionStore,
    VoteStore,
};
use std::sync::Arc;

/// Every store seam the orchestrator, applier, and listener need, bundled so
/// components take one handle instead of seven.
#[derive(Clone)]
pub struct PortalStores {
    /// Participant rows
    pub participants: Arc<dyn ParticipantStore>,
    /// Active cake submissions and the seat grid
    pub cakes: Arc<dyn CakeStore>,
    /// Confirmed votes and the tally projection
    pub votes: Arc<dyn VoteStore>,
    /// Check-in records
    pub check_ins: Arc<dyn CheckInStore>,
    /// In-flight actions
    pub pending: Arc<dyn PendingActionStore>,
    /// Hash lookup over committed domain rows
    pub committed: Arc<dyn CommittedTxIndex>,
    /// Stored-media lifecycle
    pub media: Arc<dyn MediaStore>,
}

impl PortalStores {
    /// Build the bundle from one backend implementing every store trait
    /// plus a separate media store.
    pub fn from_backend<S>(backend: Arc<S>, media: Arc<dyn MediaStore>) -> Self
    where
        S: ParticipantStore
            + CakeStore
            + VoteStore
            + CheckInStore
            + PendingActionStore
            + CommittedTxIndex
            + 'static,
    {
        Self {
            participants: backend.clone(),
            cakes: backend.clone(),
            votes: backend.clone(),
            check_ins: backend.clone(),
            pending: backend.clone(),
            committed: backend,
            media,
        }
    }

    /// A check-in state machine wired to these stores.
    #[must_use]
    pub fn check_in_machine(&self) -> CheckInStateMachine {
        CheckInStateMachine::new(self.cakes.clone(), self.votes.clone(), self.check_ins.clone())
    }
}
