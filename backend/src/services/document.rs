//! Trade documents: purchase documents mint lots, sale documents own the
//! lines the matching engine allocates against
//!
//! Line deletion is guarded by ledger state: a purchase line's lot must be
//! provably untouched (it is cancelled, not physically removed), and a sale
//! line must hold no matchings.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use shared::models::document::DocumentKind;
use shared::validation::validate_positive_quantity;

use crate::error::{AppError, AppResult};
use crate::services::lot::{insert_lot, lot_has_history, next_display_order, Lot, NewLot};

/// Trade document service
#[derive(Clone)]
pub struct DocumentService {
    db: PgPool,
}

/// One trade document
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TradeDocument {
    pub id: Uuid,
    pub kind: String,
    pub company_id: Uuid,
    pub document_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One document line
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TradeDocumentLine {
    pub id: Uuid,
    pub document_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub matching_status: String,
    pub purchase_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// One line of a purchase document; each mints a lot in its warehouse
#[derive(Debug, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub shipper: Option<String>,
    pub sender: Option<String>,
}

/// Input for creating a purchase document
#[derive(Debug, Deserialize)]
pub struct CreatePurchaseInput {
    pub company_id: Uuid,
    pub document_date: NaiveDate,
    pub lines: Vec<PurchaseLineInput>,
}

/// One line of a sale document
#[derive(Debug, Deserialize)]
pub struct SaleLineInput {
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Input for creating a sale document
#[derive(Debug, Deserialize)]
pub struct CreateSaleInput {
    pub company_id: Uuid,
    pub document_date: NaiveDate,
    pub lines: Vec<SaleLineInput>,
}

/// A document with its lines and, for purchases, the lots it minted
#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub document: TradeDocument,
    pub lines: Vec<TradeDocumentLine>,
    pub lots: Vec<Lot>,
}

const DOCUMENT_COLUMNS: &str = "id, kind, company_id, document_date, created_at, updated_at";
const LINE_COLUMNS: &str = "id, document_id, product_id, quantity, unit_price, \
     matching_status, purchase_price, created_at";

impl DocumentService {
    /// Create a new DocumentService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a purchase document; every line mints one lot in its warehouse
    pub async fn create_purchase(&self, input: CreatePurchaseInput) -> AppResult<DocumentView> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "At least one line is required".to_string(),
            });
        }
        for line in &input.lines {
            validate_positive_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "lines".to_string(),
                message: msg.to_string(),
            })?;
        }
        self.ensure_company(input.company_id).await?;

        let mut tx = self.db.begin().await?;

        let sql = format!(
            "INSERT INTO trade_documents (kind, company_id, document_date)
             VALUES ('purchase', $1, $2) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        let document = sqlx::query_as::<_, TradeDocument>(&sql)
            .bind(input.company_id)
            .bind(input.document_date)
            .fetch_one(&mut *tx)
            .await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        let mut lots = Vec::with_capacity(input.lines.len());
        for line_input in &input.lines {
            let unit_weight = sqlx::query_scalar::<_, Option<Decimal>>(
                "SELECT unit_weight FROM products WHERE id = $1",
            )
            .bind(line_input.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))?
            .unwrap_or(Decimal::ZERO);

            let sql = format!(
                "INSERT INTO trade_document_lines (document_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                LINE_COLUMNS
            );
            let line = sqlx::query_as::<_, TradeDocumentLine>(&sql)
                .bind(document.id)
                .bind(line_input.product_id)
                .bind(line_input.quantity)
                .bind(line_input.unit_price)
                .fetch_one(&mut *tx)
                .await?;

            let display_order = next_display_order(&mut tx, line_input.warehouse_id).await?;
            let lot = insert_lot(
                &mut tx,
                &NewLot {
                    product_id: line_input.product_id,
                    company_id: input.company_id,
                    warehouse_id: line_input.warehouse_id,
                    document_line_id: Some(line.id),
                    purchase_date: input.document_date,
                    quantity: line_input.quantity,
                    unit_price: line_input.unit_price,
                    total_weight: line_input.quantity * unit_weight,
                    shipper: line_input.shipper.clone(),
                    sender: line_input.sender.clone(),
                    display_order,
                },
            )
            .await?;

            lines.push(line);
            lots.push(lot);
        }

        tx.commit().await?;

        Ok(DocumentView {
            document,
            lines,
            lots,
        })
    }

    /// Create a sale document with pending lines
    pub async fn create_sale(&self, input: CreateSaleInput) -> AppResult<DocumentView> {
        if input.lines.is_empty() {
            return Err(AppError::Validation {
                field: "lines".to_string(),
                message: "At least one line is required".to_string(),
            });
        }
        for line in &input.lines {
            validate_positive_quantity(line.quantity).map_err(|msg| AppError::Validation {
                field: "lines".to_string(),
                message: msg.to_string(),
            })?;
        }
        self.ensure_company(input.company_id).await?;

        let mut tx = self.db.begin().await?;

        let sql = format!(
            "INSERT INTO trade_documents (kind, company_id, document_date)
             VALUES ('sale', $1, $2) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        let document = sqlx::query_as::<_, TradeDocument>(&sql)
            .bind(input.company_id)
            .bind(input.document_date)
            .fetch_one(&mut *tx)
            .await?;

        let mut lines = Vec::with_capacity(input.lines.len());
        for line_input in &input.lines {
            let product_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)",
            )
            .bind(line_input.product_id)
            .fetch_one(&mut *tx)
            .await?;
            if !product_exists {
                return Err(AppError::NotFound("Product".to_string()));
            }

            let sql = format!(
                "INSERT INTO trade_document_lines (document_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4) RETURNING {}",
                LINE_COLUMNS
            );
            let line = sqlx::query_as::<_, TradeDocumentLine>(&sql)
                .bind(document.id)
                .bind(line_input.product_id)
                .bind(line_input.quantity)
                .bind(line_input.unit_price)
                .fetch_one(&mut *tx)
                .await?;
            lines.push(line);
        }

        tx.commit().await?;

        Ok(DocumentView {
            document,
            lines,
            lots: Vec::new(),
        })
    }

    /// Get a document with its lines and minted lots
    pub async fn get_document(&self, document_id: Uuid) -> AppResult<DocumentView> {
        let sql = format!(
            "SELECT {} FROM trade_documents WHERE id = $1",
            DOCUMENT_COLUMNS
        );
        let document = sqlx::query_as::<_, TradeDocument>(&sql)
            .bind(document_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Trade document".to_string()))?;

        let sql = format!(
            "SELECT {} FROM trade_document_lines WHERE document_id = $1 ORDER BY created_at, id",
            LINE_COLUMNS
        );
        let lines = sqlx::query_as::<_, TradeDocumentLine>(&sql)
            .bind(document_id)
            .fetch_all(&self.db)
            .await?;

        let lots = sqlx::query_as::<_, Lot>(
            r#"
            SELECT l.id, l.product_id, l.company_id, l.warehouse_id, l.document_line_id,
                   l.purchase_date, l.original_quantity, l.remaining_quantity, l.unit_price,
                   l.total_weight, l.shipper, l.sender, l.status, l.display_order,
                   l.created_at, l.updated_at
            FROM lots l
            JOIN trade_document_lines dl ON dl.id = l.document_line_id
            WHERE dl.document_id = $1
            ORDER BY l.created_at, l.id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.db)
        .await?;

        Ok(DocumentView {
            document,
            lines,
            lots,
        })
    }

    /// List documents, optionally by kind, newest first
    pub async fn list_documents(&self, kind: Option<DocumentKind>) -> AppResult<Vec<TradeDocument>> {
        let sql = format!(
            "SELECT {} FROM trade_documents
             WHERE ($1::text IS NULL OR kind = $1)
             ORDER BY document_date DESC, created_at DESC",
            DOCUMENT_COLUMNS
        );
        let documents = sqlx::query_as::<_, TradeDocument>(&sql)
            .bind(kind.map(|k| k.as_str()))
            .fetch_all(&self.db)
            .await?;

        Ok(documents)
    }

    /// Delete one document line.
    ///
    /// A purchase line requires its lot to be fully untouched; the lot is
    /// cancelled rather than removed. A sale line requires that no matchings
    /// remain against it.
    pub async fn delete_line(&self, line_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let line = sqlx::query_as::<_, (Uuid, String)>(
            r#"
            SELECT l.id, d.kind
            FROM trade_document_lines l
            JOIN trade_documents d ON d.id = l.document_id
            WHERE l.id = $1
            "#,
        )
        .bind(line_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Document line".to_string()))?;

        match line.1.as_str() {
            "purchase" => {
                let lot = sqlx::query_as::<_, (Uuid, Decimal, Decimal)>(
                    "SELECT id, original_quantity, remaining_quantity FROM lots
                     WHERE document_line_id = $1 FOR UPDATE",
                )
                .bind(line_id)
                .fetch_optional(&mut *tx)
                .await?;

                if let Some((lot_id, original, remaining)) = lot {
                    if original != remaining || lot_has_history(&mut tx, lot_id).await? {
                        return Err(AppError::Conflict {
                            resource: "document line".to_string(),
                            message: "The purchase lot has already been touched".to_string(),
                        });
                    }
                    sqlx::query(
                        "UPDATE lots SET status = 'cancelled', remaining_quantity = 0,
                                total_weight = 0, updated_at = NOW()
                         WHERE id = $1",
                    )
                    .bind(lot_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }
            _ => {
                let has_matchings = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM matchings WHERE sale_line_id = $1)",
                )
                .bind(line_id)
                .fetch_one(&mut *tx)
                .await?;
                if has_matchings {
                    return Err(AppError::Conflict {
                        resource: "document line".to_string(),
                        message: "The sale line still has matchings; unmatch them first"
                            .to_string(),
                    });
                }
            }
        }

        sqlx::query("DELETE FROM trade_document_lines WHERE id = $1")
            .bind(line_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn ensure_company(&self, company_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM companies WHERE id = $1)",
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Company".to_string()));
        }
        Ok(())
    }
}
