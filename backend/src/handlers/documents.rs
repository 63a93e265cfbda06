//! HTTP handlers for trade documents

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use shared::models::document::DocumentKind;

use crate::error::AppResult;
use crate::services::document::{
    CreatePurchaseInput, CreateSaleInput, DocumentService, DocumentView, TradeDocument,
};
use crate::AppState;

/// Query parameters for document listing
#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub kind: Option<DocumentKind>,
}

/// Create a purchase document; its lines mint lots
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(input): Json<CreatePurchaseInput>,
) -> AppResult<Json<DocumentView>> {
    let service = DocumentService::new(state.db);
    let view = service.create_purchase(input).await?;
    Ok(Json(view))
}

/// Create a sale document
pub async fn create_sale(
    State(state): State<AppState>,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<Json<DocumentView>> {
    let service = DocumentService::new(state.db);
    let view = service.create_sale(input).await?;
    Ok(Json(view))
}

/// Get a document with its lines and minted lots
pub async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> AppResult<Json<DocumentView>> {
    let service = DocumentService::new(state.db);
    let view = service.get_document(document_id).await?;
    Ok(Json(view))
}

/// List documents, optionally by kind
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<TradeDocument>>> {
    let service = DocumentService::new(state.db);
    let documents = service.list_documents(query.kind).await?;
    Ok(Json(documents))
}

/// Delete one document line (guarded by ledger state)
pub async fn delete_document_line(
    State(state): State<AppState>,
    Path(line_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    let service = DocumentService::new(state.db);
    service.delete_line(line_id).await?;
    Ok(Json(()))
}
