//! HTTP handlers for quantity adjustments

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::adjustment::{AdjustInput, Adjustment, AdjustmentService};
use crate::AppState;

/// Apply a signed quantity delta to a lot
pub async fn create_adjustment(
    State(state): State<AppState>,
    Json(input): Json<AdjustInput>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db);
    let adjustment = service.adjust(input).await?;
    Ok(Json(adjustment))
}

/// Undo an adjustment
pub async fn revert_adjustment(
    State(state): State<AppState>,
    Path(adjustment_id): Path<Uuid>,
) -> AppResult<Json<Adjustment>> {
    let service = AdjustmentService::new(state.db);
    let adjustment = service.revert_adjustment(adjustment_id).await?;
    Ok(Json(adjustment))
}

/// Adjustments against a lot
pub async fn get_lot_adjustments(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<Adjustment>>> {
    let service = AdjustmentService::new(state.db);
    let adjustments = service.adjustments_for_lot(lot_id).await?;
    Ok(Json(adjustments))
}
