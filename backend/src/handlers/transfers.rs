//! HTTP handlers for warehouse transfers

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::transfer::{
    RevertTransferOutcome, Transfer, TransferInput, TransferOutcome, TransferService,
};
use crate::AppState;

/// Move quantity from a lot into another warehouse
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<TransferOutcome>> {
    let service = TransferService::new(state.db);
    let outcome = service.transfer(input).await?;
    Ok(Json(outcome))
}

/// Reverse a transfer
pub async fn revert_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<RevertTransferOutcome>> {
    let service = TransferService::new(state.db);
    let outcome = service.revert_transfer(transfer_id).await?;
    Ok(Json(outcome))
}

/// Get a transfer by ID
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> AppResult<Json<Transfer>> {
    let service = TransferService::new(state.db);
    let transfer = service.get_transfer(transfer_id).await?;
    Ok(Json(transfer))
}

/// Transfers touching a lot
pub async fn get_lot_transfers(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<Transfer>>> {
    let service = TransferService::new(state.db);
    let transfers = service.transfers_for_lot(lot_id).await?;
    Ok(Json(transfers))
}
