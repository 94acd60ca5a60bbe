//! The pool-backed store implementing every portal store trait.
//!
//! Commit operations run the domain write and the pending-action delete in
//! one transaction; that atomicity is what makes duplicate confirmation
//! delivery a no-op. Constraint violations map to typed errors by
//! constraint name, so callers can tell a lost seat race from a replayed
//! hash without parsing strings.

use async_trait::async_trait;
use cakepicnic_core::action::{ActionKind, ActionStatus, PendingAction, PortalAction};
use cakepicnic_core::domain::{
    CakeSubmission, CategoryTally, CheckInRecord, CheckInState, Participant, VoteRecord, VoteTally,
};
use cakepicnic_core::error::{PortalError, Result};
use cakepicnic_core::store::{
    CakeStore, CheckInStore, CommittedTxIndex, ParticipantStore, PendingActionStore, VoteStore,
};
use cakepicnic_core::types::{CakeId, Category, ParticipantId, Seat, TxHash, WalletAddress};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use uuid::Uuid;

/// `PostgreSQL`-backed implementation of the portal stores.
#[derive(Clone)]
pub struct PostgresPortalStore {
    pool: PgPool,
}

impl PostgresPortalStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to the database and build a store.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::Database`] if the connection fails.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| PortalError::Database(format!("Failed to connect: {e}")))?;
        Ok(Self::from_pool(pool))
    }

    /// The underlying pool, for migrations and health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(db_err)
    }

    async fn delete_pending(tx: &mut Transaction<'_, Postgres>, tx_hash: &TxHash) -> Result<()> {
        sqlx::query("DELETE FROM pending_actions WHERE tx_hash = $1")
            .bind(tx_hash.as_str())
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn commit(tx: Transaction<'_, Postgres>) -> Result<()> {
        tx.commit().await.map_err(db_err)
    }
}

fn db_err(e: sqlx::Error) -> PortalError {
    PortalError::Database(e.to_string())
}

/// Map a unique-constraint violation to a typed error by constraint name;
/// anything else stays a database error.
fn map_unique(
    e: sqlx::Error,
    mapper: impl Fn(&str) -> Option<PortalError>,
) -> PortalError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            if let Some(mapped) = db.constraint().and_then(mapper) {
                metrics::counter!("store.unique_conflicts").increment(1);
                return mapped;
            }
        }
    }
    db_err(e)
}

fn row_to_participant(row: &PgRow) -> Result<Participant> {
    Ok(Participant {
        id: ParticipantId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?),
        wallet: WalletAddress::parse(&row.try_get::<String, _>("wallet").map_err(db_err)?)?,
        tier: row.try_get("tier").map_err(db_err)?,
        paid: row.try_get("paid").map_err(db_err)?,
        registration_tx_hash: TxHash::parse(
            &row.try_get::<String, _>("registration_tx_hash").map_err(db_err)?,
        )?,
        registered_at: row.try_get("registered_at").map_err(db_err)?,
    })
}

fn row_to_cake(row: &PgRow) -> Result<CakeSubmission> {
    let tx_hash = row
        .try_get::<Option<String>, _>("tx_hash")
        .map_err(db_err)?
        .map(|h| TxHash::parse(&h))
        .transpose()?;
    Ok(CakeSubmission {
        id: CakeId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?),
        owner: ParticipantId::from_uuid(row.try_get::<Uuid, _>("owner_id").map_err(db_err)?),
        title: row.try_get("title").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        media_url: row.try_get("media_url").map_err(db_err)?,
        media_type: row.try_get("media_type").map_err(db_err)?,
        seat: Seat::new(
            row.try_get("table_number").map_err(db_err)?,
            row.try_get("seat_number").map_err(db_err)?,
        )?,
        story: row.try_get("story").map_err(db_err)?,
        tx_hash,
        created_at: row.try_get("created_at").map_err(db_err)?,
    })
}

fn row_to_pending(row: &PgRow) -> Result<PendingAction> {
    let action: PortalAction =
        serde_json::from_value(row.try_get::<serde_json::Value, _>("action").map_err(db_err)?)
            .map_err(|e| PortalError::Serialization(e.to_string()))?;
    Ok(PendingAction {
        tx_hash: TxHash::parse(&row.try_get::<String, _>("tx_hash").map_err(db_err)?)?,
        action,
        status: ActionStatus::parse(&row.try_get::<String, _>("status").map_err(db_err)?)?,
        failure_reason: row.try_get("failure_reason").map_err(db_err)?,
        submitted_at: row.try_get("submitted_at").map_err(db_err)?,
        expires_at: row.try_get("expires_at").map_err(db_err)?,
    })
}

fn row_to_check_in(row: &PgRow) -> Result<CheckInRecord> {
    let hash = |value: Option<String>| value.map(|h| TxHash::parse(&h)).transpose();
    Ok(CheckInRecord {
        participant: ParticipantId::from_uuid(
            row.try_get::<Uuid, _>("participant_id").map_err(db_err)?,
        ),
        state: CheckInState::parse(&row.try_get::<String, _>("state").map_err(db_err)?)?,
        checked_in_at: row.try_get("checked_in_at").map_err(db_err)?,
        checked_out_at: row.try_get("checked_out_at").map_err(db_err)?,
        check_in_tx_hash: hash(row.try_get("check_in_tx_hash").map_err(db_err)?)?,
        check_out_tx_hash: hash(row.try_get("check_out_tx_hash").map_err(db_err)?)?,
    })
}

#[async_trait]
impl ParticipantStore for PostgresPortalStore {
    async fn find(&self, id: ParticipantId) -> Result<Option<Participant>> {
        sqlx::query(
            "SELECT id, wallet, tier, paid, registration_tx_hash, registered_at \
             FROM participants WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .as_ref()
        .map(row_to_participant)
        .transpose()
    }

    async fn find_by_wallet(&self, wallet: &WalletAddress) -> Result<Option<Participant>> {
        sqlx::query(
            "SELECT id, wallet, tier, paid, registration_tx_hash, registered_at \
             FROM participants WHERE wallet = $1",
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .as_ref()
        .map(row_to_participant)
        .transpose()
    }

    async fn commit_registration(&self, tx_hash: &TxHash, participant: &Participant) -> Result<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO participants (id, wallet, tier, paid, registration_tx_hash, registered_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(participant.id.as_uuid())
        .bind(participant.wallet.as_str())
        .bind(&participant.tier)
        .bind(participant.paid)
        .bind(participant.registration_tx_hash.as_str())
        .bind(participant.registered_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique(e, |constraint| match constraint {
                "participants_wallet_key" => {
                    Some(PortalError::AlreadyRegistered(participant.wallet.to_string()))
                },
                "participants_tx_hash_key" => {
                    Some(PortalError::DuplicateTxHash(tx_hash.to_string()))
                },
                _ => None,
            })
        })?;
        Self::delete_pending(&mut tx, tx_hash).await?;
        Self::commit(tx).await
    }
}

#[async_trait]
impl CakeStore for PostgresPortalStore {
    async fn find(&self, id: CakeId) -> Result<Option<CakeSubmission>> {
        sqlx::query("SELECT * FROM cake_submissions WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_cake)
            .transpose()
    }

    async fn active_for_owner(&self, owner: ParticipantId) -> Result<Option<CakeSubmission>> {
        sqlx::query("SELECT * FROM cake_submissions WHERE owner_id = $1")
            .bind(owner.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_cake)
            .transpose()
    }

    async fn seat_taken(&self, seat: Seat) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM cake_submissions \
             WHERE table_number = $1 AND seat_number = $2)",
        )
        .bind(seat.table)
        .bind(seat.seat)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn commit_submission(&self, tx_hash: &TxHash, submission: &CakeSubmission) -> Result<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO cake_submissions \
             (id, owner_id, title, description, media_url, media_type, \
              table_number, seat_number, story, tx_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(submission.id.as_uuid())
        .bind(submission.owner.as_uuid())
        .bind(&submission.title)
        .bind(&submission.description)
        .bind(&submission.media_url)
        .bind(&submission.media_type)
        .bind(submission.seat.table)
        .bind(submission.seat.seat)
        .bind(&submission.story)
        .bind(submission.tx_hash.as_ref().map(TxHash::as_str))
        .bind(submission.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique(e, |constraint| match constraint {
                "cake_submissions_seat_key" => Some(PortalError::SeatTaken {
                    table: submission.seat.table,
                    seat: submission.seat.seat,
                }),
                "cake_submissions_owner_key" => Some(PortalError::AlreadySubmitted),
                _ => None,
            })
        })?;
        Self::delete_pending(&mut tx, tx_hash).await?;
        Self::commit(tx).await
    }

    async fn commit_removal(&self, tx_hash: &TxHash, cake_id: CakeId) -> Result<()> {
        let mut tx = self.begin().await?;
        sqlx::query("DELETE FROM cake_submissions WHERE id = $1")
            .bind(cake_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Self::delete_pending(&mut tx, tx_hash).await?;
        Self::commit(tx).await
    }

    async fn release(&self, cake_id: CakeId) -> Result<()> {
        sqlx::query("DELETE FROM cake_submissions WHERE id = $1")
            .bind(cake_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl VoteStore for PostgresPortalStore {
    async fn commit_vote(&self, vote: &VoteRecord) -> Result<()> {
        let mut tx = self.begin().await?;
        sqlx::query(
            "INSERT INTO vote_records \
             (voter_id, cake_id, category, tx_hash, voter_address, cast_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(vote.voter.as_uuid())
        .bind(vote.cake.as_uuid())
        .bind(vote.category.as_str())
        .bind(vote.tx_hash.as_str())
        .bind(vote.voter_address.as_str())
        .bind(vote.cast_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            map_unique(e, |constraint| match constraint {
                "vote_records_voter_category_key" => {
                    Some(PortalError::AlreadyVoted(vote.category))
                },
                "vote_records_tx_hash_key" => {
                    Some(PortalError::DuplicateTxHash(vote.tx_hash.to_string()))
                },
                _ => None,
            })
        })?;
        Self::delete_pending(&mut tx, &vote.tx_hash).await?;
        Self::commit(tx).await
    }

    async fn has_voted(&self, voter: ParticipantId, category: Category) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vote_records WHERE voter_id = $1 AND category = $2)",
        )
        .bind(voter.as_uuid())
        .bind(category.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn categories_voted(&self, voter: ParticipantId) -> Result<Vec<Category>> {
        let rows: Vec<String> =
            sqlx::query_scalar("SELECT category FROM vote_records WHERE voter_id = $1")
                .bind(voter.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;
        rows.iter().map(|s| Category::parse(s)).collect()
    }

    async fn tally(&self, cake: CakeId) -> Result<VoteTally> {
        let rows = sqlx::query(
            "SELECT category, voter_address FROM vote_records \
             WHERE cake_id = $1 ORDER BY cast_at ASC",
        )
        .bind(cake.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut categories: Vec<CategoryTally> = Category::ALL
            .into_iter()
            .map(|category| CategoryTally {
                category,
                count: 0,
                voters: Vec::new(),
            })
            .collect();
        for row in &rows {
            let category = Category::parse(&row.try_get::<String, _>("category").map_err(db_err)?)?;
            let voter =
                WalletAddress::parse(&row.try_get::<String, _>("voter_address").map_err(db_err)?)?;
            if let Some(slot) = categories.iter_mut().find(|t| t.category == category) {
                slot.count += 1;
                slot.voters.push(voter);
            }
        }
        Ok(VoteTally { cake, categories })
    }

    async fn reset_votes(&self, voter: ParticipantId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM vote_records WHERE voter_id = $1")
            .bind(voter.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CheckInStore for PostgresPortalStore {
    async fn record_for(&self, participant: ParticipantId) -> Result<CheckInRecord> {
        sqlx::query("SELECT * FROM check_in_records WHERE participant_id = $1")
            .bind(participant.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map_or_else(|| Ok(CheckInRecord::initial(participant)), row_to_check_in)
    }

    async fn commit_check_in(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        // Lock the row so a racing duplicate confirmation serializes here.
        let state: Option<String> = sqlx::query_scalar(
            "SELECT state FROM check_in_records WHERE participant_id = $1 FOR UPDATE",
        )
        .bind(participant.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        match state.as_deref().map(CheckInState::parse).transpose()? {
            None | Some(CheckInState::None) => {
                sqlx::query(
                    "INSERT INTO check_in_records \
                     (participant_id, state, checked_in_at, check_in_tx_hash) \
                     VALUES ($1, 'in', $2, $3) \
                     ON CONFLICT (participant_id) DO UPDATE \
                     SET state = 'in', checked_in_at = $2, check_in_tx_hash = $3",
                )
                .bind(participant.as_uuid())
                .bind(at)
                .bind(tx_hash.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            },
            // Already in: consume the pending row without touching the record.
            Some(CheckInState::In) => {},
            Some(CheckInState::Out) => return Err(PortalError::AlreadyCheckedOut),
        }
        Self::delete_pending(&mut tx, tx_hash).await?;
        Self::commit(tx).await
    }

    async fn commit_check_out(
        &self,
        tx_hash: &TxHash,
        participant: ParticipantId,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.begin().await?;
        let state: Option<String> = sqlx::query_scalar(
            "SELECT state FROM check_in_records WHERE participant_id = $1 FOR UPDATE",
        )
        .bind(participant.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        match state.as_deref().map(CheckInState::parse).transpose()? {
            None | Some(CheckInState::None) => return Err(PortalError::NotCheckedIn),
            Some(CheckInState::In) => {
                sqlx::query(
                    "UPDATE check_in_records \
                     SET state = 'out', checked_out_at = $2, check_out_tx_hash = $3 \
                     WHERE participant_id = $1",
                )
                .bind(participant.as_uuid())
                .bind(at)
                .bind(tx_hash.as_str())
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
            },
            Some(CheckInState::Out) => {},
        }
        Self::delete_pending(&mut tx, tx_hash).await?;
        Self::commit(tx).await
    }
}

#[async_trait]
impl PendingActionStore for PostgresPortalStore {
    async fn create(&self, pending: &PendingAction) -> Result<()> {
        let payload = serde_json::to_value(&pending.action)
            .map_err(|e| PortalError::Serialization(e.to_string()))?;
        sqlx::query(
            "INSERT INTO pending_actions \
             (tx_hash, kind, participant_id, action, status, failure_reason, \
              submitted_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(pending.tx_hash.as_str())
        .bind(pending.action.kind().as_str())
        .bind(pending.action.participant().as_uuid())
        .bind(payload)
        .bind(pending.status.as_str())
        .bind(pending.failure_reason.as_deref())
        .bind(pending.submitted_at)
        .bind(pending.expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique(e, |constraint| match constraint {
                "pending_actions_pkey" => Some(PortalError::DuplicateInFlight),
                _ => None,
            })
        })?;
        Ok(())
    }

    async fn find(&self, tx_hash: &TxHash) -> Result<Option<PendingAction>> {
        sqlx::query("SELECT * FROM pending_actions WHERE tx_hash = $1")
            .bind(tx_hash.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .as_ref()
            .map(row_to_pending)
            .transpose()
    }

    async fn unresolved(&self, limit: usize) -> Result<Vec<PendingAction>> {
        #[allow(clippy::cast_possible_wrap)] // Poll batch sizes are small
        let rows = sqlx::query(
            "SELECT * FROM pending_actions \
             WHERE status IN ('submitted', 'confirming') \
             ORDER BY submitted_at ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_pending).collect()
    }

    async fn in_flight(
        &self,
        participant: ParticipantId,
        kind: ActionKind,
    ) -> Result<Option<PendingAction>> {
        sqlx::query(
            "SELECT * FROM pending_actions \
             WHERE participant_id = $1 AND kind = $2 \
             AND status IN ('submitted', 'confirming') \
             LIMIT 1",
        )
        .bind(participant.as_uuid())
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .as_ref()
        .map(row_to_pending)
        .transpose()
    }

    async fn in_flight_register(&self, wallet: &WalletAddress) -> Result<Option<PendingAction>> {
        sqlx::query(
            "SELECT * FROM pending_actions \
             WHERE kind = 'register' AND action->>'wallet' = $1 \
             AND status IN ('submitted', 'confirming') \
             LIMIT 1",
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .as_ref()
        .map(row_to_pending)
        .transpose()
    }

    async fn for_participant(&self, participant: ParticipantId) -> Result<Vec<PendingAction>> {
        let rows = sqlx::query(
            "SELECT * FROM pending_actions \
             WHERE participant_id = $1 ORDER BY submitted_at DESC",
        )
        .bind(participant.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(row_to_pending).collect()
    }

    async fn mark(
        &self,
        tx_hash: &TxHash,
        status: ActionStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pending_actions SET status = $2, failure_reason = $3 WHERE tx_hash = $1",
        )
        .bind(tx_hash.as_str())
        .bind(status.as_str())
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(PortalError::NotFound);
        }
        tracing::debug!(tx_hash = %tx_hash, status = %status, "pending action marked");
        Ok(())
    }
}

#[async_trait]
impl CommittedTxIndex for PostgresPortalStore {
    async fn is_committed(&self, tx_hash: &TxHash) -> Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM participants WHERE registration_tx_hash = $1) \
             OR EXISTS(SELECT 1 FROM cake_submissions WHERE tx_hash = $1) \
             OR EXISTS(SELECT 1 FROM vote_records WHERE tx_hash = $1) \
             OR EXISTS(SELECT 1 FROM check_in_records \
                       WHERE check_in_tx_hash = $1 OR check_out_tx_hash = $1)",
        )
        .bind(tx_hash.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}
