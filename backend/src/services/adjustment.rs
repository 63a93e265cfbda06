//! Adjustment service: ad-hoc signed quantity corrections against a lot
//!
//! The transaction-scoped helpers are shared with the audit session, which
//! writes its count discrepancies through the same path.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::lot::prorated_weight;
use shared::models::stock::AdjustmentKind;
use shared::validation::{validate_nonzero_delta, validate_reason};

use crate::error::{AppError, AppResult};
use crate::services::lot::{apply_lot_delta, lock_lot};

/// Adjustment service for manual quantity corrections
#[derive(Clone)]
pub struct AdjustmentService {
    db: PgPool,
}

/// One recorded adjustment
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Adjustment {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub kind: String,
    pub delta: Decimal,
    pub weight_delta: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Input for an adjustment
#[derive(Debug, Deserialize)]
pub struct AdjustInput {
    pub lot_id: Uuid,
    pub kind: AdjustmentKind,
    pub delta: Decimal,
    pub reason: String,
}

impl AdjustmentService {
    /// Create a new AdjustmentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply a signed quantity delta to a lot with a reason
    pub async fn adjust(&self, input: AdjustInput) -> AppResult<Adjustment> {
        validate_nonzero_delta(input.delta).map_err(|msg| AppError::Validation {
            field: "delta".to_string(),
            message: msg.to_string(),
        })?;
        validate_reason(&input.reason).map_err(|msg| AppError::Validation {
            field: "reason".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;
        let adjustment =
            apply_adjustment(&mut tx, input.lot_id, input.kind, input.delta, &input.reason)
                .await?;
        tx.commit().await?;

        Ok(adjustment)
    }

    /// Undo an adjustment by applying the negated delta and deleting the
    /// record
    pub async fn revert_adjustment(&self, adjustment_id: Uuid) -> AppResult<Adjustment> {
        let mut tx = self.db.begin().await?;
        let adjustment = revert_adjustment_in_tx(&mut tx, adjustment_id).await?;
        tx.commit().await?;

        Ok(adjustment)
    }

    /// Adjustments against a lot, newest first
    pub async fn adjustments_for_lot(&self, lot_id: Uuid) -> AppResult<Vec<Adjustment>> {
        let adjustments = sqlx::query_as::<_, Adjustment>(
            "SELECT id, lot_id, kind, delta, weight_delta, reason, created_at
             FROM adjustments WHERE lot_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(adjustments)
    }
}

/// Lock the lot, validate the delta and record the adjustment. The weight
/// moves proportionally to the lot's per-unit weight; a lot with no
/// remaining stock falls back to the product registry's unit weight.
pub(crate) async fn apply_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    kind: AdjustmentKind,
    delta: Decimal,
    reason: &str,
) -> AppResult<Adjustment> {
    let lot = lock_lot(tx, lot_id).await?;

    if lot.status == "cancelled" {
        return Err(AppError::Validation {
            field: "lot_id".to_string(),
            message: "Cannot adjust a cancelled lot".to_string(),
        });
    }

    if lot.remaining_quantity + delta < Decimal::ZERO {
        return Err(AppError::InsufficientQuantity {
            resource: format!("lot {}", lot.id),
            requested: -delta,
            available: lot.remaining_quantity,
        });
    }

    let weight_delta = if lot.remaining_quantity > Decimal::ZERO {
        prorated_weight(lot.total_weight, lot.remaining_quantity, delta)
    } else {
        delta * product_unit_weight(tx, lot.product_id).await?
    };

    apply_lot_delta(tx, lot.id, delta, weight_delta).await?;

    let adjustment = sqlx::query_as::<_, Adjustment>(
        r#"
        INSERT INTO adjustments (lot_id, kind, delta, weight_delta, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, lot_id, kind, delta, weight_delta, reason, created_at
        "#,
    )
    .bind(lot.id)
    .bind(kind.as_str())
    .bind(delta)
    .bind(weight_delta)
    .bind(reason)
    .fetch_one(&mut **tx)
    .await?;

    Ok(adjustment)
}

/// Apply the negated delta of an adjustment and delete its record
pub(crate) async fn revert_adjustment_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    adjustment_id: Uuid,
) -> AppResult<Adjustment> {
    let adjustment = sqlx::query_as::<_, Adjustment>(
        "SELECT id, lot_id, kind, delta, weight_delta, reason, created_at
         FROM adjustments WHERE id = $1",
    )
    .bind(adjustment_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Adjustment".to_string()))?;

    let lot = lock_lot(tx, adjustment.lot_id).await?;

    if lot.remaining_quantity - adjustment.delta < Decimal::ZERO {
        return Err(AppError::InsufficientQuantity {
            resource: format!("lot {}", lot.id),
            requested: adjustment.delta,
            available: lot.remaining_quantity,
        });
    }

    apply_lot_delta(tx, lot.id, -adjustment.delta, -adjustment.weight_delta).await?;

    sqlx::query("DELETE FROM adjustments WHERE id = $1")
        .bind(adjustment.id)
        .execute(&mut **tx)
        .await?;

    Ok(adjustment)
}

/// Unit weight of a product, zero when the registry has none recorded
async fn product_unit_weight(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
) -> AppResult<Decimal> {
    let unit_weight = sqlx::query_scalar::<_, Option<Decimal>>(
        "SELECT unit_weight FROM products WHERE id = $1",
    )
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?
    .flatten()
    .unwrap_or(Decimal::ZERO);

    Ok(unit_weight)
}
