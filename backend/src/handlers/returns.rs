//! HTTP handlers for vendor returns

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::returns::{ReturnInput, ReturnService, VendorReturn};
use crate::AppState;

/// Return quantity from a lot to its supplier
pub async fn create_return(
    State(state): State<AppState>,
    Json(input): Json<ReturnInput>,
) -> AppResult<Json<VendorReturn>> {
    let service = ReturnService::new(state.db);
    let vendor_return = service.return_to_vendor(input).await?;
    Ok(Json(vendor_return))
}

/// Undo a vendor return
pub async fn revert_return(
    State(state): State<AppState>,
    Path(return_id): Path<Uuid>,
) -> AppResult<Json<VendorReturn>> {
    let service = ReturnService::new(state.db);
    let vendor_return = service.revert_return(return_id).await?;
    Ok(Json(vendor_return))
}

/// Vendor returns for a lot
pub async fn get_lot_returns(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<VendorReturn>>> {
    let service = ReturnService::new(state.db);
    let returns = service.returns_for_lot(lot_id).await?;
    Ok(Json(returns))
}
