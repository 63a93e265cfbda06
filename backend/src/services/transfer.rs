//! Warehouse transfer service: moving lot quantity between warehouses
//!
//! A transfer decrements the source lot and either merges into an identical
//! destination lot (same warehouse, source document line, unit price,
//! company and product) or creates a new one. Reversal restores both sides
//! and removes a destination lot this service created once it drains again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::lot::prorated_weight;
use shared::validation::{validate_distinct_warehouses, validate_positive_quantity};

use crate::error::{AppError, AppResult};
use crate::services::lot::{
    apply_lot_delta, insert_lot, lock_lot, lock_lots, next_display_order, shift_display_orders,
    Lot, NewLot,
};

/// Transfer service for cross-warehouse lot movement
#[derive(Clone)]
pub struct TransferService {
    db: PgPool,
}

/// One recorded transfer between two lots
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Transfer {
    pub id: Uuid,
    pub source_lot_id: Uuid,
    pub dest_lot_id: Uuid,
    pub quantity: Decimal,
    pub weight: Decimal,
    pub dest_created: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for a transfer
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub lot_id: Uuid,
    pub destination_warehouse_id: Uuid,
    pub quantity: Decimal,
    /// Explicit display position in the destination warehouse; lots at or
    /// after it shift down by one. Appended at the end when omitted.
    pub target_position: Option<i32>,
}

/// Result of a transfer
#[derive(Debug, Serialize)]
pub struct TransferOutcome {
    pub transfer: Transfer,
    pub source: Lot,
    pub destination: Lot,
}

/// Result of reverting a transfer
#[derive(Debug, Serialize)]
pub struct RevertTransferOutcome {
    pub source: Lot,
    pub destination_deleted: bool,
    pub destination: Option<Lot>,
}

impl TransferService {
    /// Create a new TransferService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Move quantity from a lot into a destination warehouse
    pub async fn transfer(&self, input: TransferInput) -> AppResult<TransferOutcome> {
        validate_positive_quantity(input.quantity).map_err(|msg| AppError::Validation {
            field: "quantity".to_string(),
            message: msg.to_string(),
        })?;

        let mut tx = self.db.begin().await?;

        let source = lock_lot(&mut tx, input.lot_id).await?;

        validate_distinct_warehouses(source.warehouse_id, input.destination_warehouse_id)
            .map_err(|msg| AppError::Validation {
                field: "destination_warehouse_id".to_string(),
                message: msg.to_string(),
            })?;

        let warehouse_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM warehouses WHERE id = $1)",
        )
        .bind(input.destination_warehouse_id)
        .fetch_one(&mut *tx)
        .await?;
        if !warehouse_exists {
            return Err(AppError::NotFound("Warehouse".to_string()));
        }

        if input.quantity > source.remaining_quantity {
            return Err(AppError::InsufficientQuantity {
                resource: format!("lot {}", source.id),
                requested: input.quantity,
                available: source.remaining_quantity,
            });
        }

        let weight = prorated_weight(
            source.total_weight,
            source.remaining_quantity,
            input.quantity,
        );

        // Merge candidate: identical origin and price in the destination
        // warehouse. Its id cannot be known before the source row is read,
        // so this second lock sits outside the sorted-id discipline.
        let candidate = sqlx::query_as::<_, Lot>(
            r#"
            SELECT id, product_id, company_id, warehouse_id, document_line_id,
                   purchase_date, original_quantity, remaining_quantity, unit_price, total_weight,
                   shipper, sender, status, display_order, created_at, updated_at
            FROM lots
            WHERE warehouse_id = $1
              AND product_id = $2
              AND company_id = $3
              AND unit_price = $4
              AND document_line_id IS NOT DISTINCT FROM $5
              AND status <> 'cancelled'
            ORDER BY id
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(input.destination_warehouse_id)
        .bind(source.product_id)
        .bind(source.company_id)
        .bind(source.unit_price)
        .bind(source.document_line_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (destination, dest_created) = match candidate {
            Some(existing) => {
                let merged = apply_lot_delta(&mut tx, existing.id, input.quantity, weight).await?;
                (merged, false)
            }
            None => {
                let display_order = match input.target_position {
                    Some(position) => {
                        shift_display_orders(&mut tx, input.destination_warehouse_id, position)
                            .await?;
                        position
                    }
                    None => next_display_order(&mut tx, input.destination_warehouse_id).await?,
                };
                let created = insert_lot(
                    &mut tx,
                    &NewLot {
                        product_id: source.product_id,
                        company_id: source.company_id,
                        warehouse_id: input.destination_warehouse_id,
                        document_line_id: source.document_line_id,
                        purchase_date: source.purchase_date,
                        quantity: input.quantity,
                        unit_price: source.unit_price,
                        total_weight: weight,
                        shipper: source.shipper.clone(),
                        sender: source.sender.clone(),
                        display_order,
                    },
                )
                .await?;
                (created, true)
            }
        };

        let source = apply_lot_delta(&mut tx, source.id, -input.quantity, -weight).await?;

        let transfer = sqlx::query_as::<_, Transfer>(
            r#"
            INSERT INTO transfers (source_lot_id, dest_lot_id, quantity, weight, dest_created)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, source_lot_id, dest_lot_id, quantity, weight, dest_created, created_at
            "#,
        )
        .bind(source.id)
        .bind(destination.id)
        .bind(input.quantity)
        .bind(weight)
        .bind(dest_created)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(TransferOutcome {
            transfer,
            source,
            destination,
        })
    }

    /// Reverse a transfer. Requires the destination lot to still hold the
    /// moved quantity; a destination whose balance has since been consumed
    /// cannot give the stock back.
    ///
    /// Sufficiency of the balance is all that is checked: once other stock
    /// has been merged into the destination, the quantities given back are
    /// drawn from the commingled pool.
    pub async fn revert_transfer(&self, transfer_id: Uuid) -> AppResult<RevertTransferOutcome> {
        let mut tx = self.db.begin().await?;

        let transfer = sqlx::query_as::<_, Transfer>(
            "SELECT id, source_lot_id, dest_lot_id, quantity, weight, dest_created, created_at
             FROM transfers WHERE id = $1",
        )
        .bind(transfer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))?;

        let locked = lock_lots(&mut tx, &[transfer.source_lot_id, transfer.dest_lot_id]).await?;
        let destination = locked
            .iter()
            .find(|l| l.id == transfer.dest_lot_id)
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        if destination.remaining_quantity < transfer.quantity {
            return Err(AppError::InsufficientQuantity {
                resource: format!("destination lot {}", destination.id),
                requested: transfer.quantity,
                available: destination.remaining_quantity,
            });
        }

        let destination =
            apply_lot_delta(&mut tx, transfer.dest_lot_id, -transfer.quantity, -transfer.weight)
                .await?;
        let source =
            apply_lot_delta(&mut tx, transfer.source_lot_id, transfer.quantity, transfer.weight)
                .await?;

        sqlx::query("DELETE FROM transfers WHERE id = $1")
            .bind(transfer.id)
            .execute(&mut *tx)
            .await?;

        // A destination this transfer created is removed once it is drained
        // and nothing else references it; otherwise the status projection
        // has already marked it depleted.
        let mut destination_deleted = false;
        if transfer.dest_created
            && destination.remaining_quantity.is_zero()
            && !dest_has_other_references(&mut tx, destination.id).await?
        {
            sqlx::query("DELETE FROM lots WHERE id = $1")
                .bind(destination.id)
                .execute(&mut *tx)
                .await?;
            destination_deleted = true;
        }

        tx.commit().await?;

        Ok(RevertTransferOutcome {
            source,
            destination_deleted,
            destination: if destination_deleted {
                None
            } else {
                Some(destination)
            },
        })
    }

    /// Get a transfer by ID
    pub async fn get_transfer(&self, transfer_id: Uuid) -> AppResult<Transfer> {
        sqlx::query_as::<_, Transfer>(
            "SELECT id, source_lot_id, dest_lot_id, quantity, weight, dest_created, created_at
             FROM transfers WHERE id = $1",
        )
        .bind(transfer_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Transfer".to_string()))
    }

    /// Transfers touching a lot (as source or destination), newest first
    pub async fn transfers_for_lot(&self, lot_id: Uuid) -> AppResult<Vec<Transfer>> {
        let transfers = sqlx::query_as::<_, Transfer>(
            "SELECT id, source_lot_id, dest_lot_id, quantity, weight, dest_created, created_at
             FROM transfers WHERE source_lot_id = $1 OR dest_lot_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(transfers)
    }
}

/// Whether any stock event still references a drained destination lot after
/// the transfer row itself was deleted
async fn dest_has_other_references(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> AppResult<bool> {
    let referenced = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM matchings WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM transfers WHERE source_lot_id = $1 OR dest_lot_id = $1)
            OR EXISTS(SELECT 1 FROM production_ingredients WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM adjustments WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM vendor_returns WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM audit_items WHERE lot_id = $1)
        "#,
    )
    .bind(lot_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(referenced)
}
