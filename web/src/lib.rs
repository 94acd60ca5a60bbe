//! Axum HTTP surface for the cake picnic reconciliation orchestrator.
//!
//! The web layer is a thin shell over the pipeline: handlers parse request
//! bodies into [`PortalAction`](cakepicnic_core::action::PortalAction)
//! values, submit them through the orchestrator, and answer `202 Accepted`
//! with a transaction hash. Nothing is written off-chain until the ledger
//! confirms; clients poll `GET /api/transactions/{hash}` for the outcome.
//!
//! # Request Flow
//!
//! 1. **HTTP request** arrives at an Axum handler
//! 2. **Build action** from the JSON body and path
//! 3. **Submit** through [`TransactionOrchestrator`](cakepicnic_orchestrator::TransactionOrchestrator)
//! 4. **Answer 202** with the hash; the confirmation listener commits later
//!
//! # Example
//!
//! ```ignore
//! use cakepicnic_web::{routes, AppState};
//!
//! let state = AppState::new(orchestrator, listener, stores);
//! let app = routes::router(state);
//! let addr = std::net::SocketAddr::from(([0, 0, 0, 0], 3000));
//! let tcp = tokio::net::TcpListener::bind(addr).await?;
//! axum::serve(tcp, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod handlers;
pub mod media;
pub mod routes;
pub mod state;

// Re-export key types for convenience
pub use error::AppError;
pub use media::FilesystemMediaStore;
pub use routes::router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
