//! HTTP handlers for the matching engine

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::matching::{
    ManualMatchInput, MatchOutcome, Matching, MatchingService, UnmatchOutcome,
};
use crate::AppState;

/// Manually allocate lots against a sale line
pub async fn match_manual(
    State(state): State<AppState>,
    Path(sale_line_id): Path<Uuid>,
    Json(input): Json<ManualMatchInput>,
) -> AppResult<Json<MatchOutcome>> {
    let service = MatchingService::new(state.db);
    let outcome = service.match_manual(sale_line_id, input).await?;
    Ok(Json(outcome))
}

/// FIFO-match a sale line against available lots
pub async fn match_auto(
    State(state): State<AppState>,
    Path(sale_line_id): Path<Uuid>,
) -> AppResult<Json<MatchOutcome>> {
    let service = MatchingService::new(state.db);
    let outcome = service.match_auto(sale_line_id).await?;
    Ok(Json(outcome))
}

/// Remove one matching and restore the lot
pub async fn unmatch(
    State(state): State<AppState>,
    Path(matching_id): Path<Uuid>,
) -> AppResult<Json<UnmatchOutcome>> {
    let service = MatchingService::new(state.db);
    let outcome = service.unmatch(matching_id).await?;
    Ok(Json(outcome))
}

/// Matchings for a sale line
pub async fn get_sale_line_matchings(
    State(state): State<AppState>,
    Path(sale_line_id): Path<Uuid>,
) -> AppResult<Json<Vec<Matching>>> {
    let service = MatchingService::new(state.db);
    let matchings = service.matchings_for_sale_line(sale_line_id).await?;
    Ok(Json(matchings))
}

/// Matchings drawn from a lot
pub async fn get_lot_matchings(
    State(state): State<AppState>,
    Path(lot_id): Path<Uuid>,
) -> AppResult<Json<Vec<Matching>>> {
    let service = MatchingService::new(state.db);
    let matchings = service.matchings_for_lot(lot_id).await?;
    Ok(Json(matchings))
}
