//! Read-path handlers: action lifecycle queries and vote tallies.

use crate::state::AppState;
use crate::WebResult;
use axum::extract::{Path, State};
use axum::Json;
use cakepicnic_core::domain::VoteTally;
use cakepicnic_core::types::{CakeId, ParticipantId, TxHash};
use cakepicnic_orchestrator::StatusReport;
use uuid::Uuid;

/// `GET /api/transactions/{tx_hash}`: lifecycle status of one submission.
///
/// Resolves from the pending table first; a hash absent there but stamped
/// on a committed row reports `Committed`.
pub async fn transaction_status(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> WebResult<Json<StatusReport>> {
    let tx_hash = TxHash::parse(&tx_hash)?;
    let report = state.status.status_by_hash(&tx_hash).await?;
    Ok(Json(report))
}

/// `GET /api/participants/{id}/actions`: every recorded action for a
/// participant, newest first. `CommitFailed` and `TimedOut` rows surface
/// here for the support workflow.
pub async fn participant_actions(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> WebResult<Json<Vec<StatusReport>>> {
    let reports = state
        .status
        .pending_for_participant(ParticipantId::from_uuid(participant_id))
        .await?;
    Ok(Json(reports))
}

/// `GET /api/cakes/{cake_id}/tally`: confirmed vote counts per category.
///
/// Served from the relational store, never from ledger reads.
pub async fn cake_tally(
    State(state): State<AppState>,
    Path(cake_id): Path<Uuid>,
) -> WebResult<Json<VoteTally>> {
    let tally = state.stores.votes.tally(CakeId::from_uuid(cake_id)).await?;
    Ok(Json(tally))
}
