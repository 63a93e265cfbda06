//! Vendor return service: sending lot quantity back to the supplier

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::lot::prorated_weight;
use shared::validation::{validate_positive_quantity, validate_reason};

use crate::error::{AppError, AppResult};
use crate::services::lot::{apply_lot_delta, lock_lot};

/// Vendor return service
#[derive(Clone)]
pub struct ReturnService {
    db: PgPool,
}

/// One recorded vendor return
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VendorReturn {
    pub id: Uuid,
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub weight: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Input for a vendor return
#[derive(Debug, Deserialize)]
pub struct ReturnInput {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub reason: String,
}

impl ReturnService {
    /// Create a new ReturnService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Return quantity from a lot to its supplier
    pub async fn return_to_vendor(&self, input: ReturnInput) -> AppResult<VendorReturn> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;
        validate_reason(&input.reason).map_err(|msg| AppError::Validation {
            field: "reason".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let lot = lock_lot(&mut tx, input.lot_id).await?;
        if lot.status == "cancelled" {
            return Err(AppError::Validation {
                field: "lot_id".to_string(),
                message: "Cannot return from a cancelled lot".to_string(),
            });
        }
        if input.quantity > lot.remaining_quantity {
            return Err(AppError::InsufficientQuantity {
                resource: format!("lot {}", lot.id),
                requested: input.quantity,
                available: lot.remaining_quantity,
            });
        }

        let weight = prorated_weight(lot.total_weight, lot.remaining_quantity, input.quantity);
        apply_lot_delta(&mut tx, lot.id, -input.quantity, -weight).await?;

        let vendor_return = sqlx::query_as::<_, VendorReturn>(
            r#"
            INSERT INTO vendor_returns (lot_id, quantity, weight, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING id, lot_id, quantity, weight, reason, created_at
            "#,
        )
        .bind(lot.id)
        .bind(input.quantity)
        .bind(weight)
        .bind(&input.reason)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(vendor_return)
    }

    /// Undo a vendor return, restoring the quantity to the lot
    pub async fn revert_return(&self, return_id: Uuid) -> AppResult<VendorReturn> {
        let mut tx = self.db.begin().await?;

        let vendor_return = sqlx::query_as::<_, VendorReturn>(
            "SELECT id, lot_id, quantity, weight, reason, created_at
             FROM vendor_returns WHERE id = $1",
        )
        .bind(return_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor return".to_string()))?;

        lock_lot(&mut tx, vendor_return.lot_id).await?;
        apply_lot_delta(
            &mut tx,
            vendor_return.lot_id,
            vendor_return.quantity,
            vendor_return.weight,
        )
        .await?;

        sqlx::query("DELETE FROM vendor_returns WHERE id = $1")
            .bind(vendor_return.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(vendor_return)
    }

    /// Vendor returns for a lot, newest first
    pub async fn returns_for_lot(&self, lot_id: Uuid) -> AppResult<Vec<VendorReturn>> {
        let returns = sqlx::query_as::<_, VendorReturn>(
            "SELECT id, lot_id, quantity, weight, reason, created_at
             FROM vendor_returns WHERE lot_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(returns)
    }
}
