//! HTTP handlers for the company registry

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::company::{
    Company, CompanyService, CreateCompanyInput, UpdateCompanyInput,
};
use crate::AppState;

/// Create a company
pub async fn create_company(
    State(state): State<AppState>,
    Json(input): Json<CreateCompanyInput>,
) -> AppResult<Json<Company>> {
    let service = CompanyService::new(state.db);
    let company = service.create_company(input).await?;
    Ok(Json(company))
}

/// Update a company
pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(input): Json<UpdateCompanyInput>,
) -> AppResult<Json<Company>> {
    let service = CompanyService::new(state.db);
    let company = service.update_company(company_id, input).await?;
    Ok(Json(company))
}

/// Get a company by ID
pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Company>> {
    let service = CompanyService::new(state.db);
    let company = service.get_company(company_id).await?;
    Ok(Json(company))
}

/// List companies
pub async fn list_companies(State(state): State<AppState>) -> AppResult<Json<Vec<Company>>> {
    let service = CompanyService::new(state.db);
    let companies = service.list_companies().await?;
    Ok(Json(companies))
}
