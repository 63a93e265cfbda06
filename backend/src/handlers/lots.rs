//! HTTP handlers for the lot store query surface

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::models::lot::LotStatus;
use shared::types::DateRange;

use crate::error::{AppError, AppResult};
use crate::services::lot::{Lot, LotFilter, LotService, ProductStockSummary};
use crate::AppState;

/// Query parameters for lot listing
#[derive(Debug, Deserialize)]
pub struct LotListQuery {
    pub product_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub status: Option<LotStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Query parameters for the per-product summary
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub warehouse_id: Option<Uuid>,
}

/// List lots by product/company/warehouse/status/date range
pub async fn list_lots(
    State(state): State<AppState>,
    Query(query): Query<LotListQuery>,
) -> AppResult<Json<Vec<Lot>>> {
    let purchased = match (query.date_from, query.date_to) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation {
                field: "date_from/date_to".to_string(),
                message: "Provide both ends of the date range or neither".to_string(),
            })
        }
    };

    let service = LotService::new(state.db);
    let lots = service
        .list_lots(&LotFilter {
            product_id: query.product_id,
            company_id: query.company_id,
            warehouse_id: query.warehouse_id,
            status: query.status,
            purchased,
        })
        .await?;
    Ok(Json(lots))
}

/// Get a lot by ID
pub async fn get_lot(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Lot>> {
    let service = LotService::new(state.db);
    let lot = service.get_lot(lot_id).await?;
    Ok(Json(lot))
}

/// Available lots for a product in FIFO order
pub async fn get_available_lots(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<Lot>>> {
    let service = LotService::new(state.db);
    let lots = service.available_lots(product_id).await?;
    Ok(Json(lots))
}

/// Remaining stock aggregated per product
pub async fn get_stock_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<Vec<ProductStockSummary>>> {
    let service = LotService::new(state.db);
    let summary = service.summary_by_product(query.warehouse_id).await?;
    Ok(Json(summary))
}
