//! Write-path handlers: every endpoint that submits a ledger transaction.
//!
//! Each handler builds a [`PortalAction`] from the request body, submits it
//! through the orchestrator, and answers `202 Accepted` with the transaction
//! hash. The off-chain commit happens later, on confirmation; clients poll
//! `GET /api/transactions/{hash}` for the outcome.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cakepicnic_core::action::PortalAction;
use cakepicnic_core::ledger::Signer;
use cakepicnic_core::types::{CakeId, Category, Fee, ParticipantId, Seat, TxHash, WalletAddress};
use cakepicnic_orchestrator::{ApplyOutcome, SubmitOutcome};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Body for `POST /api/registrations`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Wallet signing the registration; becomes the bound address
    pub wallet_address: String,
    /// Registration tier
    pub tier: String,
    /// Fee sent with the payable call, in wei
    pub offered_fee_wei: u64,
}

/// Body for `POST /api/cakes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCakeRequest {
    /// Owning participant
    pub participant_id: Uuid,
    /// Wallet signing the upload
    pub wallet_address: String,
    /// Cake title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// Reference to the already-uploaded media
    pub media_url: String,
    /// Media kind recorded by the uploader
    pub media_type: String,
    /// Requested table
    pub table_number: i16,
    /// Requested seat at the table
    pub seat_number: i16,
    /// Narrative text
    pub story: String,
}

/// Body for requests identified by participant and signing wallet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRequest {
    /// Acting participant
    pub participant_id: Uuid,
    /// Wallet signing the transaction
    pub wallet_address: String,
}

/// Body for `POST /api/votes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    /// Voting participant
    pub voter_id: Uuid,
    /// Wallet signing the vote
    pub wallet_address: String,
    /// Voted-for cake
    pub cake_id: Uuid,
    /// Category name, `beautiful` or `delicious`
    pub category: String,
}

/// Body for support endpoints that only need the signing wallet.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerRequest {
    /// Wallet signing the compensating transaction
    pub wallet_address: String,
}

/// `202 Accepted` body for every submitted transaction.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    /// Hash to poll status with
    pub transaction_hash: String,
    /// Identity assigned on commit, for create-style actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<Uuid>,
    /// Submission identity assigned on commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cake_id: Option<Uuid>,
}

fn signer(wallet_address: &str) -> WebResult<Signer> {
    Ok(Signer::new(WalletAddress::parse(wallet_address)?))
}

fn accepted(tx_hash: &TxHash, participant_id: Option<Uuid>, cake_id: Option<Uuid>) -> Response {
    (
        StatusCode::ACCEPTED,
        Json(SubmittedResponse {
            transaction_hash: tx_hash.to_string(),
            participant_id,
            cake_id,
        }),
    )
        .into_response()
}

fn expect_submitted(outcome: &SubmitOutcome) -> WebResult<&TxHash> {
    outcome
        .tx_hash()
        .ok_or_else(|| AppError::internal("submission resolved without a transaction"))
}

/// `POST /api/registrations`: pay the tier fee and register.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> WebResult<Response> {
    let wallet = WalletAddress::parse(&req.wallet_address)?;
    let participant = ParticipantId::new();
    let action = PortalAction::Register {
        participant,
        wallet: wallet.clone(),
        tier: req.tier,
        offered_fee: Fee::from_wei(req.offered_fee_wei),
    };
    let outcome = state.orchestrator.submit(action, &Signer::new(wallet)).await?;
    let tx_hash = expect_submitted(&outcome)?;
    Ok(accepted(tx_hash, Some(*participant.as_uuid()), None))
}

/// `POST /api/cakes`: upload a cake and reserve its seat.
pub async fn upload_cake(
    State(state): State<AppState>,
    Json(req): Json<UploadCakeRequest>,
) -> WebResult<Response> {
    let cake_id = CakeId::new();
    let action = PortalAction::UploadCake {
        participant: ParticipantId::from_uuid(req.participant_id),
        cake_id,
        title: req.title,
        description: req.description,
        media_url: req.media_url,
        media_type: req.media_type,
        seat: Seat::new(req.table_number, req.seat_number)?,
        story: req.story,
    };
    let outcome = state
        .orchestrator
        .submit(action, &signer(&req.wallet_address)?)
        .await?;
    let tx_hash = expect_submitted(&outcome)?;
    Ok(accepted(tx_hash, None, Some(*cake_id.as_uuid())))
}

/// `POST /api/cakes/{cake_id}/withdrawal`: remove a cake, releasing its
/// seat and media once confirmed.
pub async fn remove_cake(
    State(state): State<AppState>,
    Path(cake_id): Path<Uuid>,
    Json(req): Json<ParticipantRequest>,
) -> WebResult<Response> {
    let action = PortalAction::RemoveCake {
        participant: ParticipantId::from_uuid(req.participant_id),
        cake_id: CakeId::from_uuid(cake_id),
    };
    let outcome = state
        .orchestrator
        .submit(action, &signer(&req.wallet_address)?)
        .await?;
    let tx_hash = expect_submitted(&outcome)?;
    Ok(accepted(tx_hash, None, None))
}

/// `POST /api/votes`: cast a vote in one category.
pub async fn vote(
    State(state): State<AppState>,
    Json(req): Json<VoteRequest>,
) -> WebResult<Response> {
    let action = PortalAction::Vote {
        voter: ParticipantId::from_uuid(req.voter_id),
        cake_id: CakeId::from_uuid(req.cake_id),
        category: Category::parse(&req.category)?,
    };
    let outcome = state
        .orchestrator
        .submit(action, &signer(&req.wallet_address)?)
        .await?;
    let tx_hash = expect_submitted(&outcome)?;
    Ok(accepted(tx_hash, None, None))
}

/// `POST /api/check-ins`: check in at the venue.
///
/// A repeated check-in while already `IN` is answered `200 OK` without
/// submitting anything; no fee is spent on a no-op.
pub async fn check_in(
    State(state): State<AppState>,
    Json(req): Json<ParticipantRequest>,
) -> WebResult<Response> {
    let action = PortalAction::CheckIn {
        participant: ParticipantId::from_uuid(req.participant_id),
    };
    let outcome = state
        .orchestrator
        .submit(action, &signer(&req.wallet_address)?)
        .await?;
    match outcome {
        SubmitOutcome::Submitted { tx_hash } => Ok(accepted(&tx_hash, None, None)),
        SubmitOutcome::AlreadyCheckedIn => {
            Ok((StatusCode::OK, Json(json!({ "state": "in" }))).into_response())
        },
    }
}

/// `POST /api/check-outs`: leave the venue; `OUT` is terminal.
pub async fn check_out(
    State(state): State<AppState>,
    Json(req): Json<ParticipantRequest>,
) -> WebResult<Response> {
    let action = PortalAction::CheckOut {
        participant: ParticipantId::from_uuid(req.participant_id),
    };
    let outcome = state
        .orchestrator
        .submit(action, &signer(&req.wallet_address)?)
        .await?;
    let tx_hash = expect_submitted(&outcome)?;
    Ok(accepted(tx_hash, None, None))
}

/// `POST /api/transactions/{tx_hash}/recheck`: support path for a
/// confirmation that arrived after the pending TTL expired.
pub async fn recheck_transaction(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
) -> WebResult<Response> {
    let tx_hash = TxHash::parse(&tx_hash)?;
    let outcome = state.listener.recheck(&tx_hash).await?;
    let label = match outcome {
        None => "pending",
        Some(ApplyOutcome::Applied) => "applied",
        Some(ApplyOutcome::Duplicate) => "duplicate",
        Some(ApplyOutcome::Failed) => "commitFailed",
    };
    Ok(Json(json!({ "outcome": label })).into_response())
}

/// `POST /api/transactions/{tx_hash}/compensation`: submit the on-chain
/// withdrawal for an upload whose off-chain commit failed.
pub async fn compensate_upload(
    State(state): State<AppState>,
    Path(tx_hash): Path<String>,
    Json(req): Json<SignerRequest>,
) -> WebResult<Response> {
    let tx_hash = TxHash::parse(&tx_hash)?;
    let withdrawal = state
        .orchestrator
        .compensate_failed_upload(&tx_hash, &signer(&req.wallet_address)?)
        .await?;
    Ok(accepted(&withdrawal, None, None))
}

/// `DELETE /api/admin/participants/{id}/votes`: administrative vote reset.
pub async fn reset_votes(
    State(state): State<AppState>,
    Path(participant_id): Path<Uuid>,
) -> WebResult<Response> {
    let deleted = state
        .orchestrator
        .reset_votes(ParticipantId::from_uuid(participant_id))
        .await?;
    Ok(Json(json!({ "deleted": deleted })).into_response())
}
