//! Lot store: purchase lots, row locking and the quantity/status projection
//!
//! The lot row is the single source of truth for `remaining_quantity`. Every
//! component that intends to mutate a lot must read it through
//! [`lock_lot`]/[`lock_lots`] inside a transaction, and apply quantity changes
//! through [`apply_lot_delta`] so the cached status never drifts from the
//! quantity within a committed transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::lot::LotStatus;
use shared::types::DateRange;

use crate::error::{AppError, AppResult};

/// Lot service exposing the query surface of the lot store
#[derive(Clone)]
pub struct LotService {
    db: PgPool,
}

/// A discrete purchase of one product, one price, one origin, at one
/// warehouse
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Lot {
    pub id: Uuid,
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub document_line_id: Option<Uuid>,
    pub purchase_date: NaiveDate,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub unit_price: Decimal,
    pub total_weight: Decimal,
    pub shipper: Option<String>,
    pub sender: Option<String>,
    pub status: String,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filter for lot listing
#[derive(Debug, Default, Deserialize)]
pub struct LotFilter {
    pub product_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<LotStatus>,
    pub purchased: Option<DateRange>,
}

/// Remaining stock aggregated per product
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductStockSummary {
    pub product_id: Uuid,
    pub product_name: String,
    pub lot_count: i64,
    pub total_remaining: Decimal,
    pub total_weight: Decimal,
}

/// Fields for inserting a lot (purchase line, transfer split or production
/// output)
#[derive(Debug, Clone)]
pub(crate) struct NewLot {
    pub product_id: Uuid,
    pub company_id: Uuid,
    pub warehouse_id: Uuid,
    pub document_line_id: Option<Uuid>,
    pub purchase_date: NaiveDate,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total_weight: Decimal,
    pub shipper: Option<String>,
    pub sender: Option<String>,
    pub display_order: i32,
}

const LOT_COLUMNS: &str = "id, product_id, company_id, warehouse_id, document_line_id, \
     purchase_date, original_quantity, remaining_quantity, unit_price, total_weight, \
     shipper, sender, status, display_order, created_at, updated_at";

impl LotService {
    /// Create a new LotService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a lot by ID
    pub async fn get_lot(&self, lot_id: Uuid) -> AppResult<Lot> {
        let sql = format!("SELECT {} FROM lots WHERE id = $1", LOT_COLUMNS);
        sqlx::query_as::<_, Lot>(&sql)
            .bind(lot_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))
    }

    /// List lots by product/company/warehouse/status/purchase-date range
    pub async fn list_lots(&self, filter: &LotFilter) -> AppResult<Vec<Lot>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM lots
            WHERE ($1::uuid IS NULL OR product_id = $1)
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::uuid IS NULL OR warehouse_id = $3)
              AND ($4::text IS NULL OR status = $4)
              AND ($5::date IS NULL OR purchase_date >= $5)
              AND ($6::date IS NULL OR purchase_date <= $6)
            ORDER BY warehouse_id, display_order, purchase_date, id
            "#,
            LOT_COLUMNS
        );
        let lots = sqlx::query_as::<_, Lot>(&sql)
            .bind(filter.product_id)
            .bind(filter.company_id)
            .bind(filter.warehouse_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.purchased.map(|r| r.start))
            .bind(filter.purchased.map(|r| r.end))
            .fetch_all(&self.db)
            .await?;

        Ok(lots)
    }

    /// Available lots for a product in FIFO order (purchase date, then id),
    /// for external matching UIs
    pub async fn available_lots(&self, product_id: Uuid) -> AppResult<Vec<Lot>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM lots
            WHERE product_id = $1 AND status = 'available' AND remaining_quantity > 0
            ORDER BY purchase_date ASC, id ASC
            "#,
            LOT_COLUMNS
        );
        let lots = sqlx::query_as::<_, Lot>(&sql)
            .bind(product_id)
            .fetch_all(&self.db)
            .await?;

        Ok(lots)
    }

    /// Remaining quantity and weight aggregated per product, optionally
    /// restricted to one warehouse
    pub async fn summary_by_product(
        &self,
        warehouse_id: Option<Uuid>,
    ) -> AppResult<Vec<ProductStockSummary>> {
        let summaries = sqlx::query_as::<_, ProductStockSummary>(
            r#"
            SELECT l.product_id, p.name AS product_name,
                   COUNT(*) AS lot_count,
                   COALESCE(SUM(l.remaining_quantity), 0) AS total_remaining,
                   COALESCE(SUM(l.total_weight), 0) AS total_weight
            FROM lots l
            JOIN products p ON p.id = l.product_id
            WHERE l.status = 'available'
              AND ($1::uuid IS NULL OR l.warehouse_id = $1)
            GROUP BY l.product_id, p.name
            ORDER BY p.name
            "#,
        )
        .bind(warehouse_id)
        .fetch_all(&self.db)
        .await?;

        Ok(summaries)
    }
}

// ============================================================================
// Transaction-scoped helpers shared by the mutating services
// ============================================================================

/// Read a lot under an exclusive row lock. The lock is held until the
/// enclosing transaction commits or rolls back.
pub(crate) async fn lock_lot(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> AppResult<Lot> {
    let sql = format!("SELECT {} FROM lots WHERE id = $1 FOR UPDATE", LOT_COLUMNS);
    sqlx::query_as::<_, Lot>(&sql)
        .bind(lot_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
}

/// Lock a set of lots in ascending-id order so concurrent multi-lot
/// operations cannot deadlock against each other.
pub(crate) async fn lock_lots(
    tx: &mut Transaction<'_, Postgres>,
    lot_ids: &[Uuid],
) -> AppResult<Vec<Lot>> {
    let mut ids = lot_ids.to_vec();
    ids.sort();
    ids.dedup();

    let mut lots = Vec::with_capacity(ids.len());
    for id in ids {
        lots.push(lock_lot(tx, id).await?);
    }
    Ok(lots)
}

/// Apply a quantity/weight delta to a locked lot and recompute the status
/// projection in the same statement (positive remaining stock is available,
/// zero or negative is depleted; cancelled is terminal and kept).
pub(crate) async fn apply_lot_delta(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    quantity_delta: Decimal,
    weight_delta: Decimal,
) -> AppResult<Lot> {
    let sql = format!(
        r#"
        UPDATE lots
        SET remaining_quantity = remaining_quantity + $2,
            total_weight = total_weight + $3,
            status = CASE
                WHEN status = 'cancelled' THEN status
                WHEN remaining_quantity + $2 > 0 THEN 'available'
                ELSE 'depleted'
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        LOT_COLUMNS
    );
    sqlx::query_as::<_, Lot>(&sql)
        .bind(lot_id)
        .bind(quantity_delta)
        .bind(weight_delta)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))
}

/// Insert a new lot with `remaining = original = quantity`
pub(crate) async fn insert_lot(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewLot,
) -> AppResult<Lot> {
    let sql = format!(
        r#"
        INSERT INTO lots (
            product_id, company_id, warehouse_id, document_line_id, purchase_date,
            original_quantity, remaining_quantity, unit_price, total_weight,
            shipper, sender, status, display_order
        )
        VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, $10, 'available', $11)
        RETURNING {}
        "#,
        LOT_COLUMNS
    );
    let lot = sqlx::query_as::<_, Lot>(&sql)
        .bind(new.product_id)
        .bind(new.company_id)
        .bind(new.warehouse_id)
        .bind(new.document_line_id)
        .bind(new.purchase_date)
        .bind(new.quantity)
        .bind(new.unit_price)
        .bind(new.total_weight)
        .bind(&new.shipper)
        .bind(&new.sender)
        .bind(new.display_order)
        .fetch_one(&mut **tx)
        .await?;

    Ok(lot)
}

/// Next free display position at the end of a warehouse
pub(crate) async fn next_display_order(
    tx: &mut Transaction<'_, Postgres>,
    warehouse_id: Uuid,
) -> AppResult<i32> {
    let next = sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(display_order) + 1, 0) FROM lots WHERE warehouse_id = $1",
    )
    .bind(warehouse_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(next)
}

/// Stable insertion at an explicit position: every lot in the warehouse at
/// or after the position moves down by one.
pub(crate) async fn shift_display_orders(
    tx: &mut Transaction<'_, Postgres>,
    warehouse_id: Uuid,
    from_position: i32,
) -> AppResult<()> {
    sqlx::query(
        "UPDATE lots SET display_order = display_order + 1, updated_at = NOW()
         WHERE warehouse_id = $1 AND display_order >= $2",
    )
    .bind(warehouse_id)
    .bind(from_position)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Whether any stock event references the lot. A lot with history can no
/// longer be cancelled or physically removed.
pub(crate) async fn lot_has_history(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> AppResult<bool> {
    let has_history = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM matchings WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM transfers WHERE source_lot_id = $1 OR dest_lot_id = $1)
            OR EXISTS(SELECT 1 FROM production_ingredients WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM productions WHERE output_lot_id = $1)
            OR EXISTS(SELECT 1 FROM adjustments WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM vendor_returns WHERE lot_id = $1)
        "#,
    )
    .bind(lot_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(has_history)
}
