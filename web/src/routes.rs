//! Router assembly.

use crate::handlers::{health, portal, status};
use crate::state::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Build the full application router.
///
/// Write endpoints answer `202 Accepted` with a transaction hash; the
/// status endpoint is the poll target for eventual outcomes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/registrations", post(portal::register))
        .route("/api/cakes", post(portal::upload_cake))
        .route("/api/cakes/:cake_id/withdrawal", post(portal::remove_cake))
        .route("/api/cakes/:cake_id/tally", get(status::cake_tally))
        .route("/api/votes", post(portal::vote))
        .route("/api/check-ins", post(portal::check_in))
        .route("/api/check-outs", post(portal::check_out))
        .route(
            "/api/transactions/:tx_hash",
            get(status::transaction_status),
        )
        .route(
            "/api/transactions/:tx_hash/recheck",
            post(portal::recheck_transaction),
        )
        .route(
            "/api/transactions/:tx_hash/compensation",
            post(portal::compensate_upload),
        )
        .route(
            "/api/participants/:id/actions",
            get(status::participant_actions),
        )
        .route(
            "/api/admin/participants/:id/votes",
            delete(portal::reset_votes),
        )
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
