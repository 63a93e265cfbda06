//! HTTP handlers for production/repack jobs

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::production::{
    ProduceInput, Production, ProductionService, ProductionView,
};
use crate::AppState;

/// Consume ingredient lots into one output lot
pub async fn create_production(
    State(state): State<AppState>,
    Json(input): Json<ProduceInput>,
) -> AppResult<Json<ProductionView>> {
    let service = ProductionService::new(state.db);
    let view = service.produce(input).await?;
    Ok(Json(view))
}

/// Cancel a production whose output is untouched
pub async fn cancel_production(
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = ProductionService::new(state.db);
    service.cancel_production(production_id).await?;
    Ok(Json(()))
}

/// Get a production with its output lot and ingredients
pub async fn get_production(
    State(state): State<AppState>,
    Path(production_id): Path<Uuid>,
) -> AppResult<Json<ProductionView>> {
    let service = ProductionService::new(state.db);
    let view = service.get_production(production_id).await?;
    Ok(Json(view))
}

/// List productions
pub async fn list_productions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Production>>> {
    let service = ProductionService::new(state.db);
    let productions = service.list_productions().await?;
    Ok(Json(productions))
}
