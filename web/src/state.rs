//! Shared application state for handlers.

use cakepicnic_orchestrator::{
    ConfirmationListener, PortalStores, StatusQueries, TransactionOrchestrator,
};

/// Everything the HTTP surface needs, cloned into each handler via
/// `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Submit path: validate, send to ledger, record pending
    pub orchestrator: TransactionOrchestrator,
    /// Poll path: confirmations, timeouts, and the support re-check
    pub listener: ConfirmationListener,
    /// Read path over action lifecycles
    pub status: StatusQueries,
    /// Store handles for projections served directly (vote tallies)
    pub stores: PortalStores,
}

impl AppState {
    /// Bundle the pipeline components behind one handle.
    #[must_use]
    pub fn new(
        orchestrator: TransactionOrchestrator,
        listener: ConfirmationListener,
        stores: PortalStores,
    ) -> Self {
        let status = StatusQueries::new(stores.clone());
        Self {
            orchestrator,
            listener,
            status,
            stores,
        }
    }
}
