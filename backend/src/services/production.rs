//! Production/repack service: consuming input lots into one output lot
//!
//! Covers unit conversion, repackaging and blending. The output lot's unit
//! cost is derived from the consumed ingredient cost plus any additional
//! cost, spread over the output quantity. A production can only be cancelled
//! while its output lot is provably untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::models::lot::prorated_weight;
use shared::models::stock::production_unit_cost;
use shared::validation::validate_positive_quantity;

use crate::error::{AppError, AppResult};
use crate::services::lot::{
    apply_lot_delta, insert_lot, lock_lots, shift_display_orders, Lot, NewLot,
};

/// Production service for repack and blend jobs
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// One production job owning exactly one output lot
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Production {
    pub id: Uuid,
    pub output_lot_id: Uuid,
    pub additional_cost: Decimal,
    pub sender: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One ingredient consumption record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductionIngredient {
    pub id: Uuid,
    pub production_id: Uuid,
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub weight: Decimal,
    pub created_at: DateTime<Utc>,
}

/// One ingredient of a production request
#[derive(Debug, Deserialize)]
pub struct IngredientInput {
    pub lot_id: Uuid,
    pub use_quantity: Decimal,
}

/// Input for a production job
#[derive(Debug, Deserialize)]
pub struct ProduceInput {
    pub ingredients: Vec<IngredientInput>,
    pub output_product_id: Uuid,
    pub output_quantity: Decimal,
    pub additional_cost: Option<Decimal>,
    pub sender: Option<String>,
}

/// A production with its output lot and ingredients
#[derive(Debug, Serialize)]
pub struct ProductionView {
    pub production: Production,
    pub output_lot: Lot,
    pub ingredients: Vec<ProductionIngredient>,
}

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Consume the ingredient lots and create the output lot
    pub async fn produce(&self, input: ProduceInput) -> AppResult<ProductionView> {
        if input.ingredients.is_empty() {
            return Err(AppError::Validation {
                field: "ingredients".to_string(),
                message: "At least one ingredient is required".to_string(),
            });
        }
        for ingredient in &input.ingredients {
            validate_positive_quantity(ingredient.use_quantity).map_err(|msg| {
                AppError::Validation {
                    field: "ingredients".to_string(),
                    message: msg.to_string(),
                }
            })?;
        }
        let mut ids: Vec<Uuid> = input.ingredients.iter().map(|i| i.lot_id).collect();
        ids.sort();
        ids.dedup();
        if ids.len() != input.ingredients.len() {
            return Err(AppError::Validation {
                field: "ingredients".to_string(),
                message: "A lot cannot appear twice in one production".to_string(),
            });
        }
        validate_positive_quantity(input.output_quantity).map_err(|msg| AppError::Validation {
            field: "output_quantity".to_string(),
            message: msg.to_string(),
        })?;
        let additional_cost = input.additional_cost.unwrap_or(Decimal::ZERO);
        if additional_cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "additional_cost".to_string(),
                message: "Additional cost cannot be negative".to_string(),
            });
        }

        let output_unit_weight = sqlx::query_scalar::<_, Option<Decimal>>(
            "SELECT unit_weight FROM products WHERE id = $1",
        )
        .bind(input.output_product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?
        .unwrap_or(Decimal::ZERO);

        let mut tx = self.db.begin().await?;

        let lot_ids: Vec<Uuid> = input.ingredients.iter().map(|i| i.lot_id).collect();
        let locked = lock_lots(&mut tx, &lot_ids).await?;

        let mut ingredient_cost = Decimal::ZERO;
        for ingredient in &input.ingredients {
            let lot = locked
                .iter()
                .find(|l| l.id == ingredient.lot_id)
                .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
            if lot.status == "cancelled" {
                return Err(AppError::Validation {
                    field: "ingredients".to_string(),
                    message: format!("Lot {} is cancelled", lot.id),
                });
            }
            if ingredient.use_quantity > lot.remaining_quantity {
                return Err(AppError::InsufficientQuantity {
                    resource: format!("lot {}", lot.id),
                    requested: ingredient.use_quantity,
                    available: lot.remaining_quantity,
                });
            }
            ingredient_cost += lot.unit_price * ingredient.use_quantity;
        }

        let unit_price =
            production_unit_cost(ingredient_cost, additional_cost, input.output_quantity)
                .ok_or_else(|| AppError::Validation {
                    field: "output_quantity".to_string(),
                    message: "Output quantity must be positive".to_string(),
                })?;

        // The primary ingredient anchors the output lot: same warehouse, and
        // its display position when it is fully consumed, else the slot just
        // after it.
        let primary_input = &input.ingredients[0];
        let primary = locked
            .iter()
            .find(|l| l.id == primary_input.lot_id)
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
        let output_position = if primary_input.use_quantity == primary.remaining_quantity {
            primary.display_order
        } else {
            primary.display_order + 1
        };
        shift_display_orders(&mut tx, primary.warehouse_id, output_position).await?;

        let mut consumed = Vec::with_capacity(input.ingredients.len());
        for ingredient in &input.ingredients {
            let lot = locked
                .iter()
                .find(|l| l.id == ingredient.lot_id)
                .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
            let weight = prorated_weight(
                lot.total_weight,
                lot.remaining_quantity,
                ingredient.use_quantity,
            );
            apply_lot_delta(&mut tx, lot.id, -ingredient.use_quantity, -weight).await?;
            consumed.push((lot.id, ingredient.use_quantity, weight));
        }

        let output_lot = insert_lot(
            &mut tx,
            &NewLot {
                product_id: input.output_product_id,
                company_id: primary.company_id,
                warehouse_id: primary.warehouse_id,
                document_line_id: None,
                purchase_date: Utc::now().date_naive(),
                quantity: input.output_quantity,
                unit_price,
                total_weight: input.output_quantity * output_unit_weight,
                shipper: None,
                sender: input.sender.clone(),
                display_order: output_position,
            },
        )
        .await?;

        let production = sqlx::query_as::<_, Production>(
            r#"
            INSERT INTO productions (output_lot_id, additional_cost, sender)
            VALUES ($1, $2, $3)
            RETURNING id, output_lot_id, additional_cost, sender, created_at
            "#,
        )
        .bind(output_lot.id)
        .bind(additional_cost)
        .bind(&input.sender)
        .fetch_one(&mut *tx)
        .await?;

        let mut ingredients = Vec::with_capacity(consumed.len());
        for (lot_id, quantity, weight) in consumed {
            let row = sqlx::query_as::<_, ProductionIngredient>(
                r#"
                INSERT INTO production_ingredients (production_id, lot_id, quantity, weight)
                VALUES ($1, $2, $3, $4)
                RETURNING id, production_id, lot_id, quantity, weight, created_at
                "#,
            )
            .bind(production.id)
            .bind(lot_id)
            .bind(quantity)
            .bind(weight)
            .fetch_one(&mut *tx)
            .await?;
            ingredients.push(row);
        }

        tx.commit().await?;

        Ok(ProductionView {
            production,
            output_lot,
            ingredients,
        })
    }

    /// Cancel a production job: restore every ingredient lot and remove the
    /// output lot. Only allowed while the output is fully untouched.
    pub async fn cancel_production(&self, production_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let production = sqlx::query_as::<_, Production>(
            "SELECT id, output_lot_id, additional_cost, sender, created_at
             FROM productions WHERE id = $1",
        )
        .bind(production_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        let ingredients = sqlx::query_as::<_, ProductionIngredient>(
            "SELECT id, production_id, lot_id, quantity, weight, created_at
             FROM production_ingredients WHERE production_id = $1",
        )
        .bind(production.id)
        .fetch_all(&mut *tx)
        .await?;

        let mut lot_ids: Vec<Uuid> = ingredients.iter().map(|i| i.lot_id).collect();
        lot_ids.push(production.output_lot_id);
        let locked = lock_lots(&mut tx, &lot_ids).await?;

        let output = locked
            .iter()
            .find(|l| l.id == production.output_lot_id)
            .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;
        if output.original_quantity != output.remaining_quantity || output.status != "available" {
            return Err(AppError::Conflict {
                resource: "production".to_string(),
                message: "Output lot has already been touched downstream".to_string(),
            });
        }
        if output_has_other_events(&mut tx, output.id, production.id).await? {
            return Err(AppError::Conflict {
                resource: "production".to_string(),
                message: "Output lot has dependent stock events".to_string(),
            });
        }

        for ingredient in &ingredients {
            apply_lot_delta(&mut tx, ingredient.lot_id, ingredient.quantity, ingredient.weight)
                .await?;
        }

        // ingredient rows cascade with the production
        sqlx::query("DELETE FROM productions WHERE id = $1")
            .bind(production.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM lots WHERE id = $1")
            .bind(production.output_lot_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Get a production with its output lot and ingredients
    pub async fn get_production(&self, production_id: Uuid) -> AppResult<ProductionView> {
        let production = sqlx::query_as::<_, Production>(
            "SELECT id, output_lot_id, additional_cost, sender, created_at
             FROM productions WHERE id = $1",
        )
        .bind(production_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production".to_string()))?;

        let output_lot = sqlx::query_as::<_, Lot>(
            "SELECT id, product_id, company_id, warehouse_id, document_line_id,
                    purchase_date, original_quantity, remaining_quantity, unit_price, total_weight,
                    shipper, sender, status, display_order, created_at, updated_at
             FROM lots WHERE id = $1",
        )
        .bind(production.output_lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Lot".to_string()))?;

        let ingredients = sqlx::query_as::<_, ProductionIngredient>(
            "SELECT id, production_id, lot_id, quantity, weight, created_at
             FROM production_ingredients WHERE production_id = $1 ORDER BY created_at, id",
        )
        .bind(production.id)
        .fetch_all(&self.db)
        .await?;

        Ok(ProductionView {
            production,
            output_lot,
            ingredients,
        })
    }

    /// List productions, newest first
    pub async fn list_productions(&self) -> AppResult<Vec<Production>> {
        let productions = sqlx::query_as::<_, Production>(
            "SELECT id, output_lot_id, additional_cost, sender, created_at
             FROM productions ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(productions)
    }
}

/// Whether the output lot is referenced by any stock event other than its
/// own production record
async fn output_has_other_events(
    tx: &mut Transaction<'_, Postgres>,
    lot_id: Uuid,
    production_id: Uuid,
) -> AppResult<bool> {
    let referenced = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(SELECT 1 FROM matchings WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM transfers WHERE source_lot_id = $1 OR dest_lot_id = $1)
            OR EXISTS(SELECT 1 FROM production_ingredients WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM productions WHERE output_lot_id = $1 AND id <> $2)
            OR EXISTS(SELECT 1 FROM adjustments WHERE lot_id = $1)
            OR EXISTS(SELECT 1 FROM vendor_returns WHERE lot_id = $1)
        "#,
    )
    .bind(lot_id)
    .bind(production_id)
    .fetch_one(&mut **tx)
    .await?;

    Ok(referenced)
}
