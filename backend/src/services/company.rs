//! Company registry service (suppliers and customers)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Company registry service
#[derive(Clone)]
pub struct CompanyService {
    db: PgPool,
}

/// One trading counterpart
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub contact: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a company
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCompanyInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// supplier, customer or both
    pub kind: Option<String>,
    #[validate(length(max = 500))]
    pub contact: Option<String>,
}

/// Input for updating a company
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCompanyInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub kind: Option<String>,
    #[validate(length(max = 500))]
    pub contact: Option<String>,
}

const COMPANY_COLUMNS: &str = "id, name, kind, contact, created_at, updated_at";

fn validate_kind(kind: &str) -> AppResult<()> {
    if !matches!(kind, "supplier" | "customer" | "both") {
        return Err(AppError::Validation {
            field: "kind".to_string(),
            message: "Kind must be supplier, customer or both".to_string(),
        });
    }
    Ok(())
}

impl CompanyService {
    /// Create a new CompanyService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a company
    pub async fn create_company(&self, input: CreateCompanyInput) -> AppResult<Company> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        let kind = input.kind.as_deref().unwrap_or("both");
        validate_kind(kind)?;

        let sql = format!(
            "INSERT INTO companies (name, kind, contact) VALUES ($1, $2, $3) RETURNING {}",
            COMPANY_COLUMNS
        );
        let company = sqlx::query_as::<_, Company>(&sql)
            .bind(&input.name)
            .bind(kind)
            .bind(&input.contact)
            .fetch_one(&self.db)
            .await?;

        Ok(company)
    }

    /// Update a company
    pub async fn update_company(
        &self,
        company_id: Uuid,
        input: UpdateCompanyInput,
    ) -> AppResult<Company> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if let Some(ref kind) = input.kind {
            validate_kind(kind)?;
        }

        let sql = format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                kind = COALESCE($3, kind),
                contact = COALESCE($4, contact),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        );
        sqlx::query_as::<_, Company>(&sql)
            .bind(company_id)
            .bind(&input.name)
            .bind(&input.kind)
            .bind(&input.contact)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Company".to_string()))
    }

    /// Get a company by ID
    pub async fn get_company(&self, company_id: Uuid) -> AppResult<Company> {
        let sql = format!("SELECT {} FROM companies WHERE id = $1", COMPANY_COLUMNS);
        sqlx::query_as::<_, Company>(&sql)
            .bind(company_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Company".to_string()))
    }

    /// List companies by name
    pub async fn list_companies(&self) -> AppResult<Vec<Company>> {
        let sql = format!("SELECT {} FROM companies ORDER BY name", COMPANY_COLUMNS);
        let companies = sqlx::query_as::<_, Company>(&sql).fetch_all(&self.db).await?;

        Ok(companies)
    }
}
