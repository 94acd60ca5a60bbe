//! `PostgreSQL` backend for the portal stores.
//!
//! One pool-backed store implements every store trait in
//! `cakepicnic-core`. The contention-prone invariants (seat grid, one cake
//! per owner, one vote per category, tx-hash replay) are carried by unique
//! constraints in the schema; this crate's job is to run the statements and
//! translate constraint violations into the portal error taxonomy.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod portal_store;

pub use portal_store::PostgresPortalStore;

use cakepicnic_core::error::{PortalError, Result};
use sqlx::PgPool;

/// Apply the portal schema. Idempotent; safe to run at every startup.
///
/// # Errors
///
/// Returns [`PortalError::Database`] if any statement fails.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(include_str!("../migrations/001_portal_schema.sql"))
        .execute(pool)
        .await
        .map_err(|e| PortalError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("portal schema migrations applied");
    Ok(())
}
