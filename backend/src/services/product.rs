//! Product registry service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Product registry service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

/// One traded product
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub grade: Option<String>,
    pub unit_weight: Option<Decimal>,
    pub weight_unit: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 50))]
    pub grade: Option<String>,
    pub unit_weight: Option<Decimal>,
    pub weight_unit: Option<String>,
}

/// Input for updating a product
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 50))]
    pub grade: Option<String>,
    pub unit_weight: Option<Decimal>,
    pub weight_unit: Option<String>,
}

const PRODUCT_COLUMNS: &str = "id, name, grade, unit_weight, weight_unit, created_at, updated_at";

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        if let Some(unit_weight) = input.unit_weight {
            if unit_weight <= Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "unit_weight".to_string(),
                    message: "Unit weight must be positive".to_string(),
                });
            }
        }

        let sql = format!(
            "INSERT INTO products (name, grade, unit_weight, weight_unit)
             VALUES ($1, $2, $3, $4) RETURNING {}",
            PRODUCT_COLUMNS
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(&input.name)
            .bind(&input.grade)
            .bind(input.unit_weight)
            .bind(input.weight_unit.as_deref().unwrap_or("kg"))
            .fetch_one(&self.db)
            .await?;

        Ok(product)
    }

    /// Update a product
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let sql = format!(
            r#"
            UPDATE products
            SET name = COALESCE($2, name),
                grade = COALESCE($3, grade),
                unit_weight = COALESCE($4, unit_weight),
                weight_unit = COALESCE($5, weight_unit),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        );
        sqlx::query_as::<_, Product>(&sql)
            .bind(product_id)
            .bind(&input.name)
            .bind(&input.grade)
            .bind(input.unit_weight)
            .bind(&input.weight_unit)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// Get a product by ID
    pub async fn get_product(&self, product_id: Uuid) -> AppResult<Product> {
        let sql = format!("SELECT {} FROM products WHERE id = $1", PRODUCT_COLUMNS);
        sqlx::query_as::<_, Product>(&sql)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    /// List products by name
    pub async fn list_products(&self) -> AppResult<Vec<Product>> {
        let sql = format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS);
        let products = sqlx::query_as::<_, Product>(&sql).fetch_all(&self.db).await?;

        Ok(products)
    }

    /// Delete a product that no lot or document line references
    pub async fn delete_product(&self, product_id: Uuid) -> AppResult<()> {
        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM lots WHERE product_id = $1)
                 OR EXISTS(SELECT 1 FROM trade_document_lines WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        if referenced {
            return Err(AppError::Conflict {
                resource: "product".to_string(),
                message: "Product is referenced by lots or trade documents".to_string(),
            });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }
}
