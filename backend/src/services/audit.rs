//! Audit/reconciliation sessions: physical counts against computed stock
//!
//! A session snapshots the available lots of its scope (one warehouse or
//! all), collects counted quantities while in progress, and on finalize
//! converts every count difference into an audit adjustment. Finalized
//! sessions can be reverted as a unit, which undoes those adjustments and
//! reopens the count.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::audit::{audit_transition_allowed, AuditStatus};
use shared::models::stock::AdjustmentKind;

use crate::error::{AppError, AppResult};
use crate::services::adjustment::{apply_adjustment, revert_adjustment_in_tx};

/// Audit session service
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// One audit session scoped to a warehouse, or to all warehouses when
/// `warehouse_id` is absent
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditSession {
    pub id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub status: String,
    pub audit_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AuditSession {
    fn status_enum(&self) -> AppResult<AuditStatus> {
        AuditStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown audit status {}", self.status)))
    }
}

/// One counted lot within a session
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditItem {
    pub id: Uuid,
    pub session_id: Uuid,
    pub lot_id: Uuid,
    pub system_quantity: Decimal,
    pub actual_quantity: Decimal,
    pub diff_notes: Option<String>,
    pub is_checked: bool,
    pub adjustment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for starting a session
#[derive(Debug, Deserialize)]
pub struct StartAuditInput {
    /// Omitted for an all-warehouse count
    pub warehouse_id: Option<Uuid>,
    pub audit_date: Option<NaiveDate>,
}

/// Incremental update of one item while counting
#[derive(Debug, Deserialize)]
pub struct AuditItemUpdate {
    pub item_id: Uuid,
    pub actual_quantity: Option<Decimal>,
    pub diff_notes: Option<String>,
    pub is_checked: Option<bool>,
}

/// A session with its items
#[derive(Debug, Serialize)]
pub struct AuditSessionView {
    pub session: AuditSession,
    pub items: Vec<AuditItem>,
}

const SESSION_COLUMNS: &str =
    "id, warehouse_id, status, audit_date, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, session_id, lot_id, system_quantity, actual_quantity, \
     diff_notes, is_checked, adjustment_id, created_at, updated_at";

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Start a session: snapshot every available lot in scope with the
    /// current remaining quantity as both system and counted value
    pub async fn start(&self, input: StartAuditInput) -> AppResult<AuditSessionView> {
        if let Some(warehouse_id) = input.warehouse_id {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
            )
            .bind(warehouse_id)
            .fetch_one(&self.db)
            .await?;
            if !exists {
                return Err(AppError::NotFound("Warehouse".to_string()));
            }
        }

        let mut tx = self.db.begin().await?;

        // An all-warehouse session excludes every other session; a
        // warehouse session excludes its own warehouse and any all-warehouse
        // session. The partial unique index closes the remaining race.
        let conflicting = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM audit_sessions
                WHERE status IN ('pending', 'in_progress')
                  AND ($1::uuid IS NULL OR warehouse_id IS NULL OR warehouse_id = $1)
            )
            "#,
        )
        .bind(input.warehouse_id)
        .fetch_one(&mut *tx)
        .await?;
        if conflicting {
            return Err(AppError::Conflict {
                resource: "audit_session".to_string(),
                message: "An audit session is already in progress for this scope".to_string(),
            });
        }

        let audit_date = input.audit_date.unwrap_or_else(|| Utc::now().date_naive());
        let sql = format!(
            "INSERT INTO audit_sessions (warehouse_id, status, audit_date)
             VALUES ($1, 'pending', $2) RETURNING {}",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AuditSession>(&sql)
            .bind(input.warehouse_id)
            .bind(audit_date)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO audit_items (session_id, lot_id, system_quantity, actual_quantity)
            SELECT $1, id, remaining_quantity, remaining_quantity
            FROM lots
            WHERE status = 'available' AND remaining_quantity > 0
              AND ($2::uuid IS NULL OR warehouse_id = $2)
            "#,
        )
        .bind(session.id)
        .bind(input.warehouse_id)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "UPDATE audit_sessions SET status = 'in_progress', updated_at = NOW()
             WHERE id = $1 RETURNING {}",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AuditSession>(&sql)
            .bind(session.id)
            .fetch_one(&mut *tx)
            .await?;

        let items = fetch_items(&mut tx, session.id).await?;
        tx.commit().await?;

        Ok(AuditSessionView { session, items })
    }

    /// Update counted quantities, notes and check flags while the session is
    /// in progress
    pub async fn update_items(
        &self,
        session_id: Uuid,
        updates: Vec<AuditItemUpdate>,
    ) -> AppResult<Vec<AuditItem>> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        if session.status_enum()? != AuditStatus::InProgress {
            return Err(AppError::InvalidStateTransition(
                "Items can only be updated while the session is in progress".to_string(),
            ));
        }

        let sql = format!(
            r#"
            UPDATE audit_items
            SET actual_quantity = COALESCE($3, actual_quantity),
                diff_notes = COALESCE($4, diff_notes),
                is_checked = COALESCE($5, is_checked),
                updated_at = NOW()
            WHERE id = $1 AND session_id = $2
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        for update in &updates {
            let updated = sqlx::query_as::<_, AuditItem>(&sql)
                .bind(update.item_id)
                .bind(session_id)
                .bind(update.actual_quantity)
                .bind(&update.diff_notes)
                .bind(update.is_checked)
                .fetch_optional(&mut *tx)
                .await?;
            if updated.is_none() {
                return Err(AppError::NotFound("Audit item".to_string()));
            }
        }

        let items = fetch_items(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(items)
    }

    /// Re-snapshot one item's system quantity from the live lot, for stock
    /// that moved while a long count was underway
    pub async fn sync_item(&self, session_id: Uuid, item_id: Uuid) -> AppResult<AuditItem> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        if session.status_enum()? != AuditStatus::InProgress {
            return Err(AppError::InvalidStateTransition(
                "Items can only be synced while the session is in progress".to_string(),
            ));
        }

        let sql = format!(
            r#"
            UPDATE audit_items
            SET system_quantity = (SELECT remaining_quantity FROM lots WHERE id = audit_items.lot_id),
                updated_at = NOW()
            WHERE id = $1 AND session_id = $2
            RETURNING {}
            "#,
            ITEM_COLUMNS
        );
        let item = sqlx::query_as::<_, AuditItem>(&sql)
            .bind(item_id)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Audit item".to_string()))?;

        tx.commit().await?;

        Ok(item)
    }

    /// Apply every count difference as an audit adjustment and complete the
    /// session
    pub async fn finalize(&self, session_id: Uuid) -> AppResult<AuditSessionView> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        let current = session.status_enum()?;
        if !audit_transition_allowed(current, AuditStatus::Completed) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot finalize a session in status {}",
                session.status
            )));
        }

        let mut items = fetch_items(&mut tx, session_id).await?;
        // Ascending lot-id order keeps concurrent multi-lot transactions
        // from deadlocking.
        items.sort_by_key(|item| item.lot_id);

        let reason = format!("Stock audit {}", session.audit_date);
        for item in &items {
            let diff = item.actual_quantity - item.system_quantity;
            if diff.is_zero() {
                continue;
            }
            let adjustment =
                apply_adjustment(&mut tx, item.lot_id, AdjustmentKind::Audit, diff, &reason)
                    .await?;
            sqlx::query(
                "UPDATE audit_items SET adjustment_id = $2, updated_at = NOW() WHERE id = $1",
            )
            .bind(item.id)
            .bind(adjustment.id)
            .execute(&mut *tx)
            .await?;
        }

        let session = set_status(&mut tx, session_id, AuditStatus::Completed).await?;
        let items = fetch_items(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(AuditSessionView { session, items })
    }

    /// Undo a finalized session: revert every adjustment it wrote and return
    /// the session to in-progress
    pub async fn revert(&self, session_id: Uuid) -> AppResult<AuditSessionView> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        let current = session.status_enum()?;
        if !audit_transition_allowed(current, AuditStatus::InProgress) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot revert a session in status {}",
                session.status
            )));
        }

        // The scope may have gained a new active session since completion.
        let conflicting = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM audit_sessions
                WHERE status IN ('pending', 'in_progress')
                  AND id <> $2
                  AND ($1::uuid IS NULL OR warehouse_id IS NULL OR warehouse_id = $1)
            )
            "#,
        )
        .bind(session.warehouse_id)
        .bind(session.id)
        .fetch_one(&mut *tx)
        .await?;
        if conflicting {
            return Err(AppError::Conflict {
                resource: "audit_session".to_string(),
                message: "Another audit session is already in progress for this scope".to_string(),
            });
        }

        let mut items = fetch_items(&mut tx, session_id).await?;
        items.sort_by_key(|item| item.lot_id);

        for item in &items {
            let Some(adjustment_id) = item.adjustment_id else {
                continue;
            };
            revert_adjustment_in_tx(&mut tx, adjustment_id).await?;
            sqlx::query(
                "UPDATE audit_items SET adjustment_id = NULL, updated_at = NOW() WHERE id = $1",
            )
            .bind(item.id)
            .execute(&mut *tx)
            .await?;
        }

        let session = set_status(&mut tx, session_id, AuditStatus::InProgress).await?;
        let items = fetch_items(&mut tx, session_id).await?;
        tx.commit().await?;

        Ok(AuditSessionView { session, items })
    }

    /// Cancel a session that has not been finalized
    pub async fn cancel(&self, session_id: Uuid) -> AppResult<AuditSession> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        let current = session.status_enum()?;
        if !audit_transition_allowed(current, AuditStatus::Cancelled) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot cancel a session in status {}",
                session.status
            )));
        }

        let session = set_status(&mut tx, session_id, AuditStatus::Cancelled).await?;
        tx.commit().await?;

        Ok(session)
    }

    /// Delete a cancelled session and its items
    pub async fn delete(&self, session_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let session = lock_session(&mut tx, session_id).await?;
        if session.status_enum()? != AuditStatus::Cancelled {
            return Err(AppError::InvalidStateTransition(
                "Only cancelled sessions can be deleted".to_string(),
            ));
        }

        // items cascade with the session
        sqlx::query("DELETE FROM audit_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get a session with its items
    pub async fn get_session(&self, session_id: Uuid) -> AppResult<AuditSessionView> {
        let sql = format!(
            "SELECT {} FROM audit_sessions WHERE id = $1",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AuditSession>(&sql)
            .bind(session_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Audit session".to_string()))?;

        let sql = format!(
            "SELECT {} FROM audit_items WHERE session_id = $1 ORDER BY created_at, id",
            ITEM_COLUMNS
        );
        let items = sqlx::query_as::<_, AuditItem>(&sql)
            .bind(session_id)
            .fetch_all(&self.db)
            .await?;

        Ok(AuditSessionView { session, items })
    }

    /// List sessions, newest first
    pub async fn list_sessions(&self) -> AppResult<Vec<AuditSession>> {
        let sql = format!(
            "SELECT {} FROM audit_sessions ORDER BY created_at DESC, id DESC",
            SESSION_COLUMNS
        );
        let sessions = sqlx::query_as::<_, AuditSession>(&sql)
            .fetch_all(&self.db)
            .await?;

        Ok(sessions)
    }
}

/// Read a session under a row lock so concurrent lifecycle calls serialize
async fn lock_session(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
) -> AppResult<AuditSession> {
    let sql = format!(
        "SELECT {} FROM audit_sessions WHERE id = $1 FOR UPDATE",
        SESSION_COLUMNS
    );
    sqlx::query_as::<_, AuditSession>(&sql)
        .bind(session_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Audit session".to_string()))
}

async fn set_status(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
    status: AuditStatus,
) -> AppResult<AuditSession> {
    let sql = format!(
        "UPDATE audit_sessions SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        SESSION_COLUMNS
    );
    let session = sqlx::query_as::<_, AuditSession>(&sql)
        .bind(session_id)
        .bind(status.as_str())
        .fetch_one(&mut **tx)
        .await?;

    Ok(session)
}

async fn fetch_items(
    tx: &mut Transaction<'_, Postgres>,
    session_id: Uuid,
) -> AppResult<Vec<AuditItem>> {
    let sql = format!(
        "SELECT {} FROM audit_items WHERE session_id = $1 ORDER BY created_at, id",
        ITEM_COLUMNS
    );
    let items = sqlx::query_as::<_, AuditItem>(&sql)
        .bind(session_id)
        .fetch_all(&mut **tx)
        .await?;

    Ok(items)
}
