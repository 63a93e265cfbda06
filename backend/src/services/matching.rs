//! Matching engine: allocating purchase lots against sale-document lines
//!
//! Manual matching takes caller-chosen allocations; automatic matching plans
//! against available lots in FIFO order (purchase date, then id). Both paths
//! decrement the lots and append matching rows inside one transaction, then
//! recompute the sale line's matching status and weighted-average cost.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::matching::{
    match_status_for, plan_fifo, weighted_average_cost, Allocation, FifoCandidate, MatchStatus,
};
use shared::models::lot::prorated_weight;
use shared::validation::validate_allocations;

use crate::error::{AppError, AppResult};
use crate::services::lot::{apply_lot_delta, lock_lot, lock_lots, Lot};

/// Matching service for allocating lots against sale lines
#[derive(Clone)]
pub struct MatchingService {
    db: PgPool,
}

/// One allocation linking a sale line to a lot
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Matching {
    pub id: Uuid,
    pub sale_line_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub weight: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for manual matching
#[derive(Debug, Deserialize)]
pub struct ManualMatchInput {
    pub allocations: Vec<Allocation>,
}

/// Result of a match call
#[derive(Debug, Serialize)]
pub struct MatchOutcome {
    pub sale_line_id: Uuid,
    pub matched: Decimal,
    /// Quantity the sale line still needs after this call. Auto matching
    /// returns a nonzero remainder when available lots ran out; that is an
    /// outcome, not an error.
    pub unmatched_remainder: Decimal,
    pub matching_status: MatchStatus,
    pub purchase_price: Option<Decimal>,
    pub matchings: Vec<Matching>,
}

/// Result of removing one matching
#[derive(Debug, Serialize)]
pub struct UnmatchOutcome {
    pub sale_line_id: Uuid,
    pub restored_quantity: Decimal,
    pub matching_status: MatchStatus,
    pub purchase_price: Option<Decimal>,
}

/// Sale line fields the engine needs
#[derive(Debug, sqlx::FromRow)]
struct SaleLineRow {
    id: Uuid,
    kind: String,
    product_id: Uuid,
    quantity: Decimal,
}

impl MatchingService {
    /// Create a new MatchingService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Manually allocate lot quantities against a sale line
    pub async fn match_manual(
        &self,
        sale_line_id: Uuid,
        input: ManualMatchInput,
    ) -> AppResult<MatchOutcome> {
        validate_allocations(&input.allocations).map_err(|msg| AppError::Validation {
            field: "allocations".to_string(),
            message: msg.to_string(),
        })?;

        let line = self.fetch_sale_line(sale_line_id).await?;

        let mut tx = self.db.begin().await?;

        let already_matched = matched_total(&mut tx, sale_line_id).await?;
        let remaining_to_match = line.quantity - already_matched;
        let requested: Decimal = input.allocations.iter().map(|a| a.quantity).sum();

        if requested > remaining_to_match {
            return Err(AppError::InsufficientQuantity {
                resource: "sale line".to_string(),
                requested,
                available: remaining_to_match,
            });
        }

        let lot_ids: Vec<Uuid> = input.allocations.iter().map(|a| a.lot_id).collect();
        let locked = lock_lots(&mut tx, &lot_ids).await?;

        let mut matchings = Vec::with_capacity(input.allocations.len());
        for allocation in &input.allocations {
            // validate_allocations guarantees each lot appears once
            let lot = locked
                .iter()
                .find(|l| l.id == allocation.lot_id)
                .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

            if lot.product_id != line.product_id {
                return Err(AppError::Validation {
                    field: "allocations".to_string(),
                    message: format!(
                        "Lot {} holds a different product than the sale line",
                        lot.id
                    ),
                });
            }
            if allocation.quantity > lot.remaining_quantity {
                return Err(AppError::InsufficientQuantity {
                    resource: format!("lot {}", lot.id),
                    requested: allocation.quantity,
                    available: lot.remaining_quantity,
                });
            }

            let matching =
                consume_lot(&mut tx, sale_line_id, lot.id, allocation.quantity, lot).await?;
            matchings.push(matching);
        }

        let (status, cost) = write_back_sale_line(&mut tx, &line).await?;
        tx.commit().await?;

        let matched: Decimal = matchings.iter().map(|m| m.quantity).sum();
        Ok(MatchOutcome {
            sale_line_id,
            matched,
            unmatched_remainder: remaining_to_match - matched,
            matching_status: status,
            purchase_price: cost,
            matchings,
        })
    }

    /// Automatically allocate available lots against a sale line in FIFO
    /// order until the line is satisfied or lots run out
    pub async fn match_auto(&self, sale_line_id: Uuid) -> AppResult<MatchOutcome> {
        let line = self.fetch_sale_line(sale_line_id).await?;

        let mut tx = self.db.begin().await?;

        let already_matched = matched_total(&mut tx, sale_line_id).await?;
        let remaining_to_match = line.quantity - already_matched;
        if remaining_to_match <= Decimal::ZERO {
            let (status, cost) = write_back_sale_line(&mut tx, &line).await?;
            tx.commit().await?;
            return Ok(MatchOutcome {
                sale_line_id,
                matched: Decimal::ZERO,
                unmatched_remainder: Decimal::ZERO,
                matching_status: status,
                purchase_price: cost,
                matchings: Vec::new(),
            });
        }

        // Unlocked FIFO snapshot; the plan is re-validated under the locks.
        let candidates = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, remaining_quantity
            FROM lots
            WHERE product_id = $1 AND status = 'available' AND remaining_quantity > 0
            ORDER BY purchase_date ASC, id ASC
            "#,
        )
        .bind(line.product_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(lot_id, remaining_quantity)| FifoCandidate {
            lot_id,
            remaining_quantity,
        })
        .collect::<Vec<_>>();

        let plan = plan_fifo(&candidates, remaining_to_match);

        let lot_ids: Vec<Uuid> = plan.iter().map(|a| a.lot_id).collect();
        let locked = lock_lots(&mut tx, &lot_ids).await?;

        // A concurrent transaction may have shrunk a planned lot between the
        // snapshot and the lock; greedily re-fit against the locked state.
        let mut matchings = Vec::new();
        let mut needed = remaining_to_match;
        for allocation in &plan {
            if needed <= Decimal::ZERO {
                break;
            }
            let lot = locked
                .iter()
                .find(|l| l.id == allocation.lot_id)
                .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
            let take = lot.remaining_quantity.min(needed);
            if take <= Decimal::ZERO {
                continue;
            }

            let matching = consume_lot(&mut tx, sale_line_id, lot.id, take, lot).await?;
            needed -= take;
            matchings.push(matching);
        }

        let (status, cost) = write_back_sale_line(&mut tx, &line).await?;
        tx.commit().await?;

        let matched: Decimal = matchings.iter().map(|m| m.quantity).sum();
        Ok(MatchOutcome {
            sale_line_id,
            matched,
            unmatched_remainder: remaining_to_match - matched,
            matching_status: status,
            purchase_price: cost,
            matchings,
        })
    }

    /// Remove one matching, restoring the lot's quantity and recomputing the
    /// sale line's status and weighted-average cost from the matches that
    /// remain
    pub async fn unmatch(&self, matching_id: Uuid) -> AppResult<UnmatchOutcome> {
        let mut tx = self.db.begin().await?;

        let matching = sqlx::query_as::<_, Matching>(
            "SELECT id, sale_line_id, lot_id, quantity, weight, created_at
             FROM matchings WHERE id = $1",
        )
        .bind(matching_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Matching".to_string()))?;

        lock_lot(&mut tx, matching.lot_id).await?;
        apply_lot_delta(&mut tx, matching.lot_id, matching.quantity, matching.weight).await?;

        sqlx::query("DELETE FROM matchings WHERE id = $1")
            .bind(matching.id)
            .execute(&mut *tx)
            .await?;

        let line = self.fetch_sale_line(matching.sale_line_id).await?;
        let (status, cost) = write_back_sale_line(&mut tx, &line).await?;
        tx.commit().await?;

        Ok(UnmatchOutcome {
            sale_line_id: matching.sale_line_id,
            restored_quantity: matching.quantity,
            matching_status: status,
            purchase_price: cost,
        })
    }

    /// Matchings for one sale line
    pub async fn matchings_for_sale_line(&self, sale_line_id: Uuid) -> AppResult<Vec<Matching>> {
        let matchings = sqlx::query_as::<_, Matching>(
            "SELECT id, sale_line_id, lot_id, quantity, weight, created_at
             FROM matchings WHERE sale_line_id = $1 ORDER BY created_at, id",
        )
        .bind(sale_line_id)
        .fetch_all(&self.db)
        .await?;

        Ok(matchings)
    }

    /// Matchings drawn from one lot
    pub async fn matchings_for_lot(&self, lot_id: Uuid) -> AppResult<Vec<Matching>> {
        let matchings = sqlx::query_as::<_, Matching>(
            "SELECT id, sale_line_id, lot_id, quantity, weight, created_at
             FROM matchings WHERE lot_id = $1 ORDER BY created_at, id",
        )
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        Ok(matchings)
    }

    /// Fetch a trade-document line and validate it belongs to a sale
    /// document
    async fn fetch_sale_line(&self, sale_line_id: Uuid) -> AppResult<SaleLineRow> {
        let line = sqlx::query_as::<_, SaleLineRow>(
            r#"
            SELECT l.id, d.kind, l.product_id, l.quantity
            FROM trade_document_lines l
            JOIN trade_documents d ON d.id = l.document_id
            WHERE l.id = $1
            "#,
        )
        .bind(sale_line_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sale line".to_string()))?;

        if line.kind != "sale" {
            return Err(AppError::Validation {
                field: "sale_line_id".to_string(),
                message: "Line does not belong to a sale document".to_string(),
            });
        }

        Ok(line)
    }
}

/// Total quantity already matched against a sale line
async fn matched_total(
    tx: &mut Transaction<'_, Postgres>,
    sale_line_id: Uuid,
) -> AppResult<Decimal> {
    let total = sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(quantity), 0) FROM matchings WHERE sale_line_id = $1",
    )
    .bind(sale_line_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(total)
}

/// Decrement a locked lot and insert the matching row
async fn consume_lot(
    tx: &mut Transaction<'_, Postgres>,
    sale_line_id: Uuid,
    lot_id: Uuid,
    quantity: Decimal,
    lot: &Lot,
) -> AppResult<Matching> {
    let weight = prorated_weight(lot.total_weight, lot.remaining_quantity, quantity);
    apply_lot_delta(tx, lot_id, -quantity, -weight).await?;

    let matching = sqlx::query_as::<_, Matching>(
        r#"
        INSERT INTO matchings (sale_line_id, lot_id, quantity, weight)
        VALUES ($1, $2, $3, $4)
        RETURNING id, sale_line_id, lot_id, quantity, weight, created_at
        "#,
    )
    .bind(sale_line_id)
    .bind(lot_id)
    .bind(quantity)
    .bind(weight)
    .fetch_one(&mut **tx)
    .await?;

    Ok(matching)
}

/// Recompute the sale line's matching status and weighted-average cost from
/// its current matchings and store both on the line
async fn write_back_sale_line(
    tx: &mut Transaction<'_, Postgres>,
    line: &SaleLineRow,
) -> AppResult<(MatchStatus, Option<Decimal>)> {
    let parts = sqlx::query_as::<_, (Decimal, Decimal)>(
        r#"
        SELECT m.quantity, l.unit_price
        FROM matchings m
        JOIN lots l ON l.id = m.lot_id
        WHERE m.sale_line_id = $1
        "#,
    )
    .bind(line.id)
    .fetch_all(&mut **tx)
    .await?;

    let matched: Decimal = parts.iter().map(|(q, _)| *q).sum();
    let status = match_status_for(matched, line.quantity);
    let cost = weighted_average_cost(&parts);

    sqlx::query(
        "UPDATE trade_document_lines SET matching_status = $2, purchase_price = $3 WHERE id = $1",
    )
    .bind(line.id)
    .bind(status.as_str())
    .bind(cost)
    .execute(&mut **tx)
    .await?;

    Ok((status, cost))
}
