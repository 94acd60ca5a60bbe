//! Poll loop that resolves pending actions.
//!
//! Receipts are pulled, not pushed: each pass examines unresolved actions
//! oldest first, fetches their receipts, and hands outcomes to the applier.
//! A row older than its TTL is marked `TimedOut` and never re-submitted;
//! resubmission would mint a second on-chain transaction. A late
//! confirmation for a timed-out row still applies; the money already moved,
//! so the store must catch up.

use crate::applier::{ApplyOutcome, ReconciliationApplier};
use crate::config::OrchestratorConfig;
use crate::stores::PortalStores;
use cakepicnic_core::action::{ActionStatus, PendingAction};
use cakepicnic_core::clock::Clock;
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::ledger::{LedgerClient, LedgerReceipt};
use cakepicnic_core::types::TxHash;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Drives pending actions to resolution against the ledger.
#[derive(Clone)]
pub struct ConfirmationListener {
    stores: PortalStores,
    ledger: Arc<dyn LedgerClient>,
    applier: ReconciliationApplier,
    clock: Arc<dyn Clock>,
    config: OrchestratorConfig,
}

impl ConfirmationListener {
    /// Wire the listener to its collaborators.
    #[must_use]
    pub fn new(
        stores: PortalStores,
        ledger: Arc<dyn LedgerClient>,
        applier: ReconciliationApplier,
        clock: Arc<dyn Clock>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            stores,
            ledger,
            applier,
            clock,
            config,
        }
    }

    /// One poll pass over unresolved actions. Returns how many reached a
    /// terminal status this pass.
    ///
    /// Ledger read failures skip the affected row; it stays unresolved and
    /// is retried next pass.
    ///
    /// # Errors
    ///
    /// Returns error only for store infrastructure failures.
    pub async fn tick(&self) -> Result<usize> {
        let now = self.clock.now();
        let batch = self.stores.pending.unresolved(self.config.poll_batch).await?;
        let mut resolved = 0;

        for pending in batch {
            if pending.is_expired(now) {
                self.expire(&pending).await?;
                resolved += 1;
                continue;
            }
            match self.ledger.receipt(&pending.tx_hash).await {
                Ok(None) => {},
                Ok(Some(receipt)) => {
                    if self.resolve(&pending, receipt).await? {
                        resolved += 1;
                    }
                },
                Err(err) => {
                    warn!(tx_hash = %pending.tx_hash, error = %err, "receipt fetch failed, will retry");
                },
            }
        }
        Ok(resolved)
    }

    /// Run the poll loop until shutdown is signalled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        info!(interval_ms = self.config.poll_interval_ms, "confirmation listener started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(err) = self.tick().await {
                        warn!(error = %err, "poll pass failed");
                    }
                },
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("confirmation listener stopping");
                        return;
                    }
                },
            }
        }
    }

    /// Wait until the transaction reaches a terminal status, driving poll
    /// passes itself so callers need no background listener.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::CommitTimeout`] if the wait elapses first,
    /// [`PortalError::NotFound`] if the hash was never recorded.
    pub async fn await_resolution(
        &self,
        tx_hash: &TxHash,
        timeout: StdDuration,
    ) -> Result<ActionStatus> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(pending) = self.stores.pending.find(tx_hash).await? {
                if !pending.status.is_unresolved() {
                    return Ok(pending.status);
                }
            } else if self.stores.committed.is_committed(tx_hash).await? {
                return Ok(ActionStatus::Committed);
            } else {
                return Err(PortalError::NotFound);
            }

            self.tick().await?;
            if tokio::time::Instant::now() >= deadline {
                return Err(PortalError::CommitTimeout);
            }
            tokio::time::sleep(self.config.poll_interval()).await;
        }
    }

    /// Re-check one transaction regardless of its status, the support path
    /// for a confirmation that arrived after the TTL marked the row
    /// `TimedOut`. The fee already moved on-chain, so the store catches up.
    ///
    /// Returns `None` when no receipt is available yet.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::NotFound`] if the hash was never recorded;
    /// ledger failures map to `LedgerRejected`.
    pub async fn recheck(&self, tx_hash: &TxHash) -> Result<Option<ApplyOutcome>> {
        let pending = self
            .stores
            .pending
            .find(tx_hash)
            .await?
            .ok_or(PortalError::NotFound)?;
        match self.ledger.receipt(tx_hash).await.map_err(PortalError::from)? {
            None => Ok(None),
            Some(LedgerReceipt::Confirmed) => {
                info!(tx_hash = %tx_hash, status = %pending.status, "re-checking resolved receipt");
                Ok(Some(self.applier.apply_confirmed(tx_hash).await?))
            },
            Some(LedgerReceipt::Reverted { reason }) => {
                Ok(Some(self.applier.apply_reverted(tx_hash, &reason).await?))
            },
        }
    }

    async fn expire(&self, pending: &PendingAction) -> Result<()> {
        self.stores
            .pending
            .mark(
                &pending.tx_hash,
                ActionStatus::TimedOut,
                Some("confirmation not observed within the timeout"),
            )
            .await?;
        metrics::counter!("portal.actions.timed_out", "kind" => pending.action.kind().as_str())
            .increment(1);
        warn!(
            tx_hash = %pending.tx_hash,
            kind = %pending.action.kind(),
            submitted_at = %pending.submitted_at,
            "pending action timed out"
        );
        Ok(())
    }

    /// Dispatch a receipt. Returns whether the action reached a terminal
    /// status.
    async fn resolve(&self, pending: &PendingAction, receipt: LedgerReceipt) -> Result<bool> {
        if pending.status == ActionStatus::Submitted {
            self.stores
                .pending
                .mark(&pending.tx_hash, ActionStatus::Confirming, None)
                .await?;
        }
        debug!(tx_hash = %pending.tx_hash, "receipt observed");
        match receipt {
            LedgerReceipt::Confirmed => {
                self.applier.apply_confirmed(&pending.tx_hash).await?;
            },
            LedgerReceipt::Reverted { reason } => {
                self.applier.apply_reverted(&pending.tx_hash, &reason).await?;
            },
        }
        Ok(true)
    }
}
