//! Status queries over the pending-action table.
//!
//! Committed actions delete their pending row, so a status lookup that
//! misses the table falls back to the committed-hash index over the domain
//! tables. `CommitFailed` and `TimedOut` rows are the support surface: they
//! are retained exactly so these queries can find them.

use crate::stores::PortalStores;
use cakepicnic_core::action::{ActionKind, ActionStatus, PendingAction};
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::types::{ParticipantId, TxHash};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Resolved status of one submitted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// Transaction hash queried
    pub tx_hash: TxHash,
    /// Lifecycle status
    pub status: ActionStatus,
    /// Action kind; unknown for hashes resolved via the committed index
    pub kind: Option<ActionKind>,
    /// Revert, commit-failure, or timeout reason
    pub reason: Option<String>,
    /// When the transaction was submitted; unknown for committed hashes
    pub submitted_at: Option<DateTime<Utc>>,
}

impl StatusReport {
    fn from_pending(pending: PendingAction) -> Self {
        Self {
            tx_hash: pending.tx_hash,
            status: pending.status,
            kind: Some(pending.action.kind()),
            reason: pending.failure_reason,
            submitted_at: Some(pending.submitted_at),
        }
    }

    fn committed(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            status: ActionStatus::Committed,
            kind: None,
            reason: None,
            submitted_at: None,
        }
    }
}

/// Read-only view over action lifecycles.
#[derive(Clone)]
pub struct StatusQueries {
    stores: PortalStores,
}

impl StatusQueries {
    /// Wire the queries to the stores.
    #[must_use]
    pub const fn new(stores: PortalStores) -> Self {
        Self { stores }
    }

    /// Resolve the status of a transaction hash.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if the hash is neither pending nor
    /// stamped on any committed row.
    pub async fn status_by_hash(&self, tx_hash: &TxHash) -> Result<StatusReport> {
        if let Some(pending) = self.stores.pending.find(tx_hash).await? {
            return Ok(StatusReport::from_pending(pending));
        }
        if self.stores.committed.is_committed(tx_hash).await? {
            return Ok(StatusReport::committed(tx_hash.clone()));
        }
        Err(PortalError::NotFound)
    }

    /// Every recorded action for a participant, newest first; the support
    /// workflow view where `CommitFailed` and `TimedOut` rows surface.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    pub async fn pending_for_participant(
        &self,
        participant: ParticipantId,
    ) -> Result<Vec<StatusReport>> {
        let rows = self.stores.pending.for_participant(participant).await?;
        Ok(rows.into_iter().map(StatusReport::from_pending).collect())
    }
}
