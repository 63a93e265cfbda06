//! HTTP handlers for audit/reconciliation sessions

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::audit::{
    AuditItem, AuditItemUpdate, AuditService, AuditSession, AuditSessionView, StartAuditInput,
};
use crate::AppState;

/// Start an audit session for a warehouse (or all warehouses)
pub async fn start_audit(
    State(state): State<AppState>,
    Json(input): Json<StartAuditInput>,
) -> AppResult<Json<AuditSessionView>> {
    let service = AuditService::new(state.db);
    let view = service.start(input).await?;
    Ok(Json(view))
}

/// Update counted quantities, notes and check flags
pub async fn update_audit_items(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(updates): Json<Vec<AuditItemUpdate>>,
) -> AppResult<Json<Vec<AuditItem>>> {
    let service = AuditService::new(state.db);
    let items = service.update_items(session_id, updates).await?;
    Ok(Json(items))
}

/// Re-snapshot one item's system quantity from the live lot
pub async fn sync_audit_item(
    State(state): State<AppState>,
    Path((session_id, item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<AuditItem>> {
    let service = AuditService::new(state.db);
    let item = service.sync_item(session_id, item_id).await?;
    Ok(Json(item))
}

/// Apply count differences as adjustments and complete the session
pub async fn finalize_audit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<AuditSessionView>> {
    let service = AuditService::new(state.db);
    let view = service.finalize(session_id).await?;
    Ok(Json(view))
}

/// Undo a finalized session
pub async fn revert_audit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<AuditSessionView>> {
    let service = AuditService::new(state.db);
    let view = service.revert(session_id).await?;
    Ok(Json(view))
}

/// Cancel a session that has not been finalized
pub async fn cancel_audit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<AuditSession>> {
    let service = AuditService::new(state.db);
    let session = service.cancel(session_id).await?;
    Ok(Json(session))
}

/// Delete a cancelled session and its items
pub async fn delete_audit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = AuditService::new(state.db);
    service.delete(session_id).await?;
    Ok(Json(()))
}

/// Get a session with its items
pub async fn get_audit(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> AppResult<Json<AuditSessionView>> {
    let service = AuditService::new(state.db);
    let view = service.get_session(session_id).await?;
    Ok(Json(view))
}

/// List sessions
pub async fn list_audits(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AuditSession>>> {
    let service = AuditService::new(state.db);
    let sessions = service.list_sessions().await?;
    Ok(Json(sessions))
}
