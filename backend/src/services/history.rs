//! Unified stock-event history: one chronological feed per product or
//! warehouse
//!
//! Merges purchase-in, sale-out, transfer-in/out, production-in/out,
//! adjustment and vendor-return events, ordered by business date, event
//! timestamp, genesis-first type priority and reference id (the comparator
//! lives in the shared crate).

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::stock::{StockEventKind, StockEventOrder};
use shared::types::DateRange;

use crate::error::AppResult;

/// Stock history service
#[derive(Clone)]
pub struct HistoryService {
    db: PgPool,
    page_size: usize,
}

/// One entry of the feed. Quantity is signed: positive for stock arriving
/// at the lot, negative for stock leaving it.
#[derive(Debug, Clone, Serialize)]
pub struct StockEvent {
    pub kind: StockEventKind,
    pub transaction_date: NaiveDate,
    pub occurred_at: DateTime<Utc>,
    pub lot_id: Uuid,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub reference_id: Uuid,
}

/// Filter for the feed
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub range: Option<DateRange>,
    pub limit: Option<usize>,
}

/// Raw row shared by every event query
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    transaction_date: NaiveDate,
    occurred_at: DateTime<Utc>,
    lot_id: Uuid,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: Decimal,
    reference_id: Uuid,
}

impl EventRow {
    fn into_event(self, kind: StockEventKind) -> StockEvent {
        StockEvent {
            kind,
            transaction_date: self.transaction_date,
            occurred_at: self.occurred_at,
            lot_id: self.lot_id,
            product_id: self.product_id,
            warehouse_id: self.warehouse_id,
            quantity: self.quantity,
            reference_id: self.reference_id,
        }
    }
}

impl HistoryService {
    /// Create a new HistoryService instance
    pub fn new(db: PgPool, page_size: usize) -> Self {
        Self { db, page_size }
    }

    /// The merged chronological feed for a product/warehouse scope
    pub async fn list_events(&self, query: &HistoryQuery) -> AppResult<Vec<StockEvent>> {
        let mut events = Vec::new();

        for (kind, sql) in EVENT_QUERIES {
            let rows = sqlx::query_as::<_, EventRow>(sql)
                .bind(query.product_id)
                .bind(query.warehouse_id)
                .bind(query.range.map(|r| r.start))
                .bind(query.range.map(|r| r.end))
                .fetch_all(&self.db)
                .await?;
            events.extend(rows.into_iter().map(|row| row.into_event(*kind)));
        }

        events.sort_by_key(|e| StockEventOrder {
            transaction_date: e.transaction_date,
            occurred_at: e.occurred_at,
            kind: e.kind,
            reference_id: e.reference_id,
        });
        events.truncate(query.limit.unwrap_or(self.page_size));

        Ok(events)
    }
}

/// One query per event kind; all take (product, warehouse, date-from,
/// date-to) filters in the same bind positions.
const EVENT_QUERIES: &[(StockEventKind, &str)] = &[
    (
        StockEventKind::PurchaseIn,
        r#"
        SELECT l.purchase_date AS transaction_date, l.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               l.original_quantity AS quantity, l.id AS reference_id
        FROM lots l
        WHERE l.document_line_id IS NOT NULL
          AND ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR l.purchase_date >= $3)
          AND ($4::date IS NULL OR l.purchase_date <= $4)
        "#,
    ),
    (
        StockEventKind::ProductionIn,
        r#"
        SELECT l.purchase_date AS transaction_date, p.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               l.original_quantity AS quantity, p.id AS reference_id
        FROM productions p
        JOIN lots l ON l.id = p.output_lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR l.purchase_date >= $3)
          AND ($4::date IS NULL OR l.purchase_date <= $4)
        "#,
    ),
    (
        StockEventKind::TransferIn,
        r#"
        SELECT t.created_at::date AS transaction_date, t.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               t.quantity AS quantity, t.id AS reference_id
        FROM transfers t
        JOIN lots l ON l.id = t.dest_lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR t.created_at::date >= $3)
          AND ($4::date IS NULL OR t.created_at::date <= $4)
        "#,
    ),
    (
        StockEventKind::SaleOut,
        r#"
        SELECT d.document_date AS transaction_date, m.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               -m.quantity AS quantity, m.id AS reference_id
        FROM matchings m
        JOIN lots l ON l.id = m.lot_id
        JOIN trade_document_lines sl ON sl.id = m.sale_line_id
        JOIN trade_documents d ON d.id = sl.document_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR d.document_date >= $3)
          AND ($4::date IS NULL OR d.document_date <= $4)
        "#,
    ),
    (
        StockEventKind::TransferOut,
        r#"
        SELECT t.created_at::date AS transaction_date, t.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               -t.quantity AS quantity, t.id AS reference_id
        FROM transfers t
        JOIN lots l ON l.id = t.source_lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR t.created_at::date >= $3)
          AND ($4::date IS NULL OR t.created_at::date <= $4)
        "#,
    ),
    (
        StockEventKind::ProductionOut,
        r#"
        SELECT pi.created_at::date AS transaction_date, pi.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               -pi.quantity AS quantity, pi.id AS reference_id
        FROM production_ingredients pi
        JOIN lots l ON l.id = pi.lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR pi.created_at::date >= $3)
          AND ($4::date IS NULL OR pi.created_at::date <= $4)
        "#,
    ),
    (
        StockEventKind::Adjustment,
        r#"
        SELECT a.created_at::date AS transaction_date, a.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               a.delta AS quantity, a.id AS reference_id
        FROM adjustments a
        JOIN lots l ON l.id = a.lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR a.created_at::date >= $3)
          AND ($4::date IS NULL OR a.created_at::date <= $4)
        "#,
    ),
    (
        StockEventKind::VendorReturn,
        r#"
        SELECT vr.created_at::date AS transaction_date, vr.created_at AS occurred_at,
               l.id AS lot_id, l.product_id, l.warehouse_id,
               -vr.quantity AS quantity, vr.id AS reference_id
        FROM vendor_returns vr
        JOIN lots l ON l.id = vr.lot_id
        WHERE ($1::uuid IS NULL OR l.product_id = $1)
          AND ($2::uuid IS NULL OR l.warehouse_id = $2)
          AND ($3::date IS NULL OR vr.created_at::date >= $3)
          AND ($4::date IS NULL OR vr.created_at::date <= $4)
        "#,
    ),
];
