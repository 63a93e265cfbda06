//! HTTP handlers for the integrity checker

use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::integrity::{HealOutcome, IntegrityReport, IntegrityService};
use crate::AppState;

/// Input for a heal pass
#[derive(Debug, Deserialize)]
pub struct HealInput {
    /// Specific lots to repair; every flagged lot when omitted
    pub lot_ids: Option<Vec<Uuid>>,
}

/// Recompute every lot and report divergence
pub async fn check_integrity(State(state): State<AppState>) -> AppResult<Json<IntegrityReport>> {
    let service = IntegrityService::new(state.db, state.config.inventory.integrity_report_cap);
    let report = service.check().await?;
    Ok(Json(report))
}

/// Overwrite diverged balances with the event-derived ones
pub async fn heal_integrity(
    State(state): State<AppState>,
    Json(input): Json<HealInput>,
) -> AppResult<Json<HealOutcome>> {
    let service = IntegrityService::new(state.db, state.config.inventory.integrity_report_cap);
    let outcome = service.heal(input.lot_ids).await?;
    Ok(Json(outcome))
}
