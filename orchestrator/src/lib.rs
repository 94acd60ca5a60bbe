//! Submit → await → commit pipeline for the cake picnic portal.
//!
//! Portal actions cross two systems that fail independently: the
//! smart-contract ledger and the relational store. This crate carries an
//! action across that gap:
//!
//! 1. [`TransactionOrchestrator`] validates and submits the signed write,
//!    recording one pending action per accepted transaction.
//! 2. [`ConfirmationListener`] polls receipts until each pending action
//!    resolves or its TTL elapses.
//! 3. [`ReconciliationApplier`] commits confirmed actions to the store;
//!    domain write and pending-row delete in one transaction, which is what
//!    makes duplicate confirmation delivery a no-op.
//! 4. [`StatusQueries`] answer "what happened to my transaction", including
//!    the `CommitFailed` and `TimedOut` rows kept for support workflows.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod applier;
pub mod config;
pub mod listener;
pub mod orchestrator;
pub mod status;
pub mod stores;

pub use applier::{ApplyOutcome, ReconciliationApplier};
pub use config::OrchestratorConfig;
pub use listener::ConfirmationListener;
pub use orchestrator::{SubmitOutcome, TransactionOrchestrator};
pub use status::{StatusQueries, StatusReport};
pub use stores::PortalStores;
