//! Integrity checker: recomputing lot balances from the full event history
//!
//! For every non-cancelled lot the checker derives the expected remaining
//! quantity from matchings, transfers, production consumption, adjustments
//! and vendor returns, and reports lots whose stored balance diverged, went
//! negative, or whose cached status disagrees with the quantity. Divergence
//! is reported as data; `heal` is the only path allowed to force-correct it.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::lot::status_for_quantity;
use shared::models::stock::{expected_remaining, quantity_epsilon};

use crate::error::{AppError, AppResult};
use crate::services::lot::lock_lot;

/// Integrity checker service
#[derive(Clone)]
pub struct IntegrityService {
    db: PgPool,
    report_cap: usize,
}

/// Per-lot event totals as aggregated from the event tables
#[derive(Debug, sqlx::FromRow)]
struct LedgerRow {
    lot_id: Uuid,
    status: String,
    original_quantity: Decimal,
    remaining_quantity: Decimal,
    matched: Decimal,
    transferred_in: Decimal,
    transferred_out: Decimal,
    production_consumed: Decimal,
    adjusted: Decimal,
    vendor_returned: Decimal,
}

/// A lot whose stored balance diverged from the event-derived one
#[derive(Debug, Clone, Serialize)]
pub struct Discrepancy {
    pub lot_id: Uuid,
    pub stored_remaining: Decimal,
    pub expected_remaining: Decimal,
    pub divergence: Decimal,
}

/// A lot holding negative stock
#[derive(Debug, Clone, Serialize)]
pub struct NegativeQuantity {
    pub lot_id: Uuid,
    pub remaining_quantity: Decimal,
}

/// A lot whose cached status disagrees with its quantity
#[derive(Debug, Clone, Serialize)]
pub struct StatusMismatch {
    pub lot_id: Uuid,
    pub remaining_quantity: Decimal,
    pub status: String,
}

/// Integrity report: each list is capped for operational review; the counts
/// reflect everything found
#[derive(Debug, Serialize)]
pub struct IntegrityReport {
    pub checked_lots: usize,
    pub discrepancy_count: usize,
    pub negative_count: usize,
    pub status_mismatch_count: usize,
    pub discrepancies: Vec<Discrepancy>,
    pub negative_quantities: Vec<NegativeQuantity>,
    pub status_mismatches: Vec<StatusMismatch>,
}

/// One repaired lot
#[derive(Debug, Clone, Serialize)]
pub struct HealedLot {
    pub lot_id: Uuid,
    pub previous_remaining: Decimal,
    pub new_remaining: Decimal,
    pub previous_status: String,
    pub new_status: String,
}

/// Result of a heal pass
#[derive(Debug, Serialize)]
pub struct HealOutcome {
    pub healed: Vec<HealedLot>,
}

const LEDGER_SQL: &str = r#"
    SELECT l.id AS lot_id, l.status, l.original_quantity, l.remaining_quantity,
           COALESCE(m.total, 0) AS matched,
           COALESCE(ti.total, 0) AS transferred_in,
           COALESCE(to_.total, 0) AS transferred_out,
           COALESCE(pc.total, 0) AS production_consumed,
           COALESCE(adj.total, 0) AS adjusted,
           COALESCE(vr.total, 0) AS vendor_returned
    FROM lots l
    LEFT JOIN (SELECT lot_id, SUM(quantity) AS total FROM matchings GROUP BY lot_id) m
        ON m.lot_id = l.id
    -- a transfer that created its destination is already embodied in that
    -- lot's original quantity, so only merge transfers count as inflow
    LEFT JOIN (SELECT dest_lot_id AS lot_id, SUM(quantity) AS total FROM transfers
               WHERE dest_created = FALSE GROUP BY dest_lot_id) ti
        ON ti.lot_id = l.id
    LEFT JOIN (SELECT source_lot_id AS lot_id, SUM(quantity) AS total FROM transfers
               GROUP BY source_lot_id) to_
        ON to_.lot_id = l.id
    LEFT JOIN (SELECT lot_id, SUM(quantity) AS total FROM production_ingredients
               GROUP BY lot_id) pc
        ON pc.lot_id = l.id
    LEFT JOIN (SELECT lot_id, SUM(delta) AS total FROM adjustments GROUP BY lot_id) adj
        ON adj.lot_id = l.id
    LEFT JOIN (SELECT lot_id, SUM(quantity) AS total FROM vendor_returns GROUP BY lot_id) vr
        ON vr.lot_id = l.id
    WHERE l.status <> 'cancelled'
      AND ($1::uuid[] IS NULL OR l.id = ANY($1))
"#;

impl IntegrityService {
    /// Create a new IntegrityService instance
    pub fn new(db: PgPool, report_cap: usize) -> Self {
        Self { db, report_cap }
    }

    /// Recompute every lot's expected remaining quantity and report
    /// divergence, negative stock and status mismatches
    pub async fn check(&self) -> AppResult<IntegrityReport> {
        let rows = sqlx::query_as::<_, LedgerRow>(LEDGER_SQL)
            .bind(Option::<Vec<Uuid>>::None)
            .fetch_all(&self.db)
            .await?;

        let epsilon = quantity_epsilon();
        let mut discrepancies = Vec::new();
        let mut negative_quantities = Vec::new();
        let mut status_mismatches = Vec::new();

        for row in &rows {
            let expected = row_expected(row);
            let divergence = row.remaining_quantity - expected;
            if divergence.abs() > epsilon {
                discrepancies.push(Discrepancy {
                    lot_id: row.lot_id,
                    stored_remaining: row.remaining_quantity,
                    expected_remaining: expected,
                    divergence,
                });
            }
            if row.remaining_quantity < Decimal::ZERO {
                negative_quantities.push(NegativeQuantity {
                    lot_id: row.lot_id,
                    remaining_quantity: row.remaining_quantity,
                });
            }
            let projected = status_for_quantity(row.remaining_quantity);
            if row.status != projected.as_str() {
                status_mismatches.push(StatusMismatch {
                    lot_id: row.lot_id,
                    remaining_quantity: row.remaining_quantity,
                    status: row.status.clone(),
                });
            }
        }

        let discrepancy_count = discrepancies.len();
        let negative_count = negative_quantities.len();
        let status_mismatch_count = status_mismatches.len();

        discrepancies.sort_by(|a, b| b.divergence.abs().cmp(&a.divergence.abs()));
        discrepancies.truncate(self.report_cap);
        negative_quantities.sort_by(|a, b| a.remaining_quantity.cmp(&b.remaining_quantity));
        negative_quantities.truncate(self.report_cap);
        status_mismatches.truncate(self.report_cap);

        Ok(IntegrityReport {
            checked_lots: rows.len(),
            discrepancy_count,
            negative_count,
            status_mismatch_count,
            discrepancies,
            negative_quantities,
            status_mismatches,
        })
    }

    /// Overwrite stored balances with the event-derived ones and fix cached
    /// statuses, for the given lots or for every flagged lot. Destructive
    /// and irreversible; every repair is logged.
    pub async fn heal(&self, lot_ids: Option<Vec<Uuid>>) -> AppResult<HealOutcome> {
        let target_ids = match lot_ids {
            Some(ids) => ids,
            None => {
                let report = self.check().await?;
                let mut ids: Vec<Uuid> = report
                    .discrepancies
                    .iter()
                    .map(|d| d.lot_id)
                    .chain(report.negative_quantities.iter().map(|n| n.lot_id))
                    .chain(report.status_mismatches.iter().map(|s| s.lot_id))
                    .collect();
                ids.sort();
                ids.dedup();
                ids
            }
        };

        if target_ids.is_empty() {
            return Ok(HealOutcome { healed: Vec::new() });
        }

        let mut tx = self.db.begin().await?;
        let mut healed = Vec::new();

        let mut sorted_ids = target_ids;
        sorted_ids.sort();
        sorted_ids.dedup();
        for lot_id in sorted_ids {
            let lot = lock_lot(&mut tx, lot_id).await?;
            if lot.status == "cancelled" {
                continue;
            }

            // Recompute under the lock so a concurrent mutation between the
            // report and the repair cannot be overwritten with stale totals.
            let expected = expected_for_lot(&mut tx, lot_id).await?;
            let new_status = status_for_quantity(expected);

            if lot.remaining_quantity == expected && lot.status == new_status.as_str() {
                continue;
            }

            sqlx::query(
                "UPDATE lots SET remaining_quantity = $2, status = $3, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(lot_id)
            .bind(expected)
            .bind(new_status.as_str())
            .execute(&mut *tx)
            .await?;

            tracing::warn!(
                lot_id = %lot_id,
                stored = %lot.remaining_quantity,
                expected = %expected,
                "healed lot ledger divergence"
            );

            healed.push(HealedLot {
                lot_id,
                previous_remaining: lot.remaining_quantity,
                new_remaining: expected,
                previous_status: lot.status,
                new_status: new_status.as_str().to_string(),
            });
        }

        tx.commit().await?;

        Ok(HealOutcome { healed })
    }
}

fn row_expected(row: &LedgerRow) -> Decimal {
    expected_remaining(
        row.original_quantity,
        row.matched,
        row.transferred_in,
        row.transferred_out,
        row.production_consumed,
        row.adjusted,
        row.vendor_returned,
    )
}

/// Event-derived remaining quantity for one lot, read inside the healing
/// transaction
async fn expected_for_lot(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
) -> AppResult<Decimal> {
    let row = sqlx::query_as::<_, LedgerRow>(LEDGER_SQL)
        .bind(Some(vec![lot_id]))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

    Ok(row_expected(&row))
}
