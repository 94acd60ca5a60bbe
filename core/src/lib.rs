//! Domain core of the cake picnic portal.
//!
//! Portal state is split across two independently-failing systems: the
//! smart-contract ledger (authoritative for payments, uploads, and votes
//! once mined) and the relational store (authoritative for query, display,
//! and business gating). This crate defines everything both sides agree on:
//!
//! - value objects and entities ([`types`], [`domain`])
//! - the closed action set and its lifecycle ([`action`])
//! - the error taxonomy ([`error`])
//! - the seams: ledger client and store traits ([`ledger`], [`store`])
//! - the check-in state machine ([`checkin`])
//!
//! The submit → await → commit pipeline that ties the seams together lives
//! in `cakepicnic-orchestrator`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod checkin;
pub mod clock;
pub mod domain;
pub mod error;
pub mod ledger;
pub mod store;
pub mod types;

pub use action::{ActionKind, ActionStatus, PendingAction, PortalAction};
pub use checkin::{CheckInGate, CheckInStateMachine};
pub use clock::{Clock, SystemClock};
pub use domain::{
    CakeSubmission, CategoryTally, CheckInRecord, CheckInState, Participant, VoteRecord, VoteTally,
};
pub use error::{PortalError, Result};
pub use ledger::{LedgerClient, LedgerError, LedgerReceipt, LedgerResult, Signer};
pub use types::{CakeId, Category, Fee, ParticipantId, Seat, TxHash, WalletAddress};
