//! HTTP handlers for the stock-event history feed

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use shared::types::DateRange;

use crate::error::{AppError, AppResult};
use crate::services::history::{HistoryQuery, HistoryService, StockEvent};
use crate::AppState;

/// Query parameters for the feed
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub product_id: Option<Uuid>,
    pub warehouse_id: Option<Uuid>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// The merged chronological stock-event feed
pub async fn list_stock_events(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> AppResult<Json<Vec<StockEvent>>> {
    let range = match (params.date_from, params.date_to) {
        (Some(start), Some(end)) => Some(DateRange { start, end }),
        (None, None) => None,
        _ => {
            return Err(AppError::Validation {
                field: "date_from/date_to".to_string(),
                message: "Provide both ends of the date range or neither".to_string(),
            })
        }
    };

    let service = HistoryService::new(state.db, state.config.inventory.history_page_size);
    let events = service
        .list_events(&HistoryQuery {
            product_id: params.product_id,
            warehouse_id: params.warehouse_id,
            range,
            limit: params.limit,
        })
        .await?;
    Ok(Json(events))
}
