//! Sales and the inventory depletion they drive
//!
//! A sale of a recipe consumes each ingredient scaled by
//! `sale quantity / recipe yield`. Depletion is written as one `out`
//! transaction per ingredient, dispatched concurrently and awaited as a
//! batch.
//!
//! Multi-step writes here are not atomic. When a batch fails part way, the
//! sale row is put back (flag cleared on create, previous values restored on
//! edit) but ingredient transactions that already landed stay in the ledger.
//! The reconciliation report on inventory items exposes any resulting drift.

use std::sync::Arc;

use futures::future::join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    now_millis, sale_depletions, validation, Action, Actor, IngredientDepletion, Recipe, Sale,
    StockTransaction, Subject, TransactionReason, TransactionType,
};
use uuid::Uuid;
use validator::Validate;

use super::authorize;
use super::stock::{StockService, SystemMovement};
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

#[derive(Clone)]
pub struct SaleService {
    repo: Arc<dyn Repository>,
    stock: StockService,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSaleInput {
    pub recipe_id: Uuid,
    pub quantity: Decimal,
    #[validate(length(max = 100, message = "Receipt id must be at most 100 characters"))]
    pub receipt_id: Option<String>,
    /// Deplete ingredients now; `false` records the sale only
    #[serde(default = "default_true")]
    pub update_inventory: bool,
}

fn default_true() -> bool {
    true
}

/// Partial update of a sale; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateSaleInput {
    pub recipe_id: Option<Uuid>,
    pub quantity: Option<Decimal>,
    #[validate(length(max = 100, message = "Receipt id must be at most 100 characters"))]
    pub receipt_id: Option<String>,
}

/// A sale together with the stock transactions written for it
#[derive(Debug, Clone, Serialize)]
pub struct SaleOutcome {
    pub sale: Sale,
    pub transactions: Vec<StockTransaction>,
}

impl SaleOutcome {
    fn sale_only(sale: Sale) -> Self {
        Self {
            sale,
            transactions: Vec::new(),
        }
    }
}

impl SaleService {
    pub fn new(repo: Arc<dyn Repository>, stock: StockService) -> Self {
        Self { repo, stock }
    }

    pub async fn list(&self, actor: &impl Actor) -> AppResult<Vec<Sale>> {
        authorize(actor, Action::Read, Subject::Sale)?;
        self.repo.list_sales(actor.restaurant_id()).await
    }

    pub async fn get(&self, actor: &impl Actor, sale_id: Uuid) -> AppResult<Sale> {
        authorize(actor, Action::Read, Subject::Sale)?;
        self.repo
            .get_sale(actor.restaurant_id(), sale_id)
            .await?
            .ok_or_else(|| AppError::not_found("Sale"))
    }

    /// Record a sale, depleting ingredients unless `update_inventory` is off
    pub async fn create(
        &self,
        actor: &impl Actor,
        input: CreateSaleInput,
    ) -> AppResult<SaleOutcome> {
        if input.update_inventory {
            return self.create_sale_and_update_inventory(actor, input).await;
        }

        authorize(actor, Action::Create, Subject::Sale)?;
        input.validate()?;
        validation::validate_quantity(input.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;
        self.sellable_recipe(actor, input.recipe_id).await?;

        let sale = self.repo.insert_sale(new_sale(actor, &input, false)).await?;
        tracing::info!(sale_id = %sale.id, "Recorded sale without inventory update");
        Ok(SaleOutcome::sale_only(sale))
    }

    /// Record a sale and deplete every ingredient of its recipe.
    ///
    /// If any ingredient transaction fails the sale stays recorded with
    /// `inventory_updated = false` and the error is returned.
    pub async fn create_sale_and_update_inventory(
        &self,
        actor: &impl Actor,
        input: CreateSaleInput,
    ) -> AppResult<SaleOutcome> {
        authorize(actor, Action::Create, Subject::Sale)?;
        authorize(actor, Action::Create, Subject::StockTransaction)?;
        input.validate()?;
        validation::validate_quantity(input.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;

        let recipe = self.sellable_recipe(actor, input.recipe_id).await?;
        require_ingredients(&recipe)?;
        let depletions = plan_depletion(&recipe, input.quantity)?;

        let sale = self.repo.insert_sale(new_sale(actor, &input, true)).await?;

        let depleted = self
            .dispatch(actor, sale.id, depletions, TransactionType::Out)
            .await;

        match depleted {
            Ok(transactions) => {
                tracing::info!(
                    sale_id = %sale.id,
                    recipe_id = %recipe.id,
                    transactions = transactions.len(),
                    "Recorded sale and depleted inventory"
                );
                Ok(SaleOutcome { sale, transactions })
            }
            Err(e) => {
                tracing::error!(
                    sale_id = %sale.id,
                    error = %e,
                    "Inventory depletion failed, clearing sale flag"
                );
                let rolled_back = Sale {
                    inventory_updated: false,
                    updated_at: now_millis(),
                    ..sale
                };
                if let Err(rollback) = self.repo.update_sale(rolled_back).await {
                    tracing::error!(error = %rollback, "Failed to roll back sale flag");
                }
                Err(e)
            }
        }
    }

    /// Deplete inventory for a sale recorded without it
    pub async fn mark_inventory_updated(
        &self,
        actor: &impl Actor,
        sale_id: Uuid,
    ) -> AppResult<SaleOutcome> {
        authorize(actor, Action::Update, Subject::Sale)?;
        authorize(actor, Action::Create, Subject::StockTransaction)?;

        let sale = self.get(actor, sale_id).await?;
        if sale.inventory_updated {
            return Err(AppError::BusinessRule(
                "Inventory has already been updated for this sale".to_string(),
            ));
        }

        let recipe = self.recipe(actor, sale.recipe_id).await?;
        require_ingredients(&recipe)?;
        let depletions = plan_depletion(&recipe, sale.quantity)?;

        let transactions = self
            .dispatch(actor, sale.id, depletions, TransactionType::Out)
            .await?;

        let sale = self
            .repo
            .update_sale(Sale {
                inventory_updated: true,
                updated_by: actor.user_id(),
                updated_at: now_millis(),
                ..sale
            })
            .await?;

        tracing::info!(
            sale_id = %sale_id,
            transactions = transactions.len(),
            "Marked sale inventory updated"
        );
        Ok(SaleOutcome { sale, transactions })
    }

    /// Edit a sale whose inventory has been applied.
    ///
    /// When the recipe or quantity changes, the original depletion is reversed
    /// in full and the new one applied in full. Edits that change neither, or
    /// sales never applied to inventory, go through [`Self::update_sale`].
    pub async fn update_sale_and_adjust_inventory(
        &self,
        actor: &impl Actor,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> AppResult<SaleOutcome> {
        authorize(actor, Action::Update, Subject::Sale)?;
        input.validate()?;

        let original = self.get(actor, sale_id).await?;
        let recipe_changed = input.recipe_id.is_some_and(|id| id != original.recipe_id);
        let quantity_changed = input.quantity.is_some_and(|q| q != original.quantity);

        if !original.inventory_updated || !(recipe_changed || quantity_changed) {
            return self.update_sale(actor, sale_id, input).await;
        }

        authorize(actor, Action::Create, Subject::StockTransaction)?;
        if let Some(quantity) = input.quantity {
            validation::validate_quantity(quantity)
                .map_err(|m| AppError::validation("quantity", m))?;
        }

        let original_recipe = self.recipe(actor, original.recipe_id).await?;
        let new_recipe = if recipe_changed {
            let recipe_id = input.recipe_id.unwrap_or(original.recipe_id);
            let recipe = self.sellable_recipe(actor, recipe_id).await?;
            require_ingredients(&recipe)?;
            recipe
        } else {
            original_recipe.clone()
        };

        let new_quantity = input.quantity.unwrap_or(original.quantity);
        let reversal = plan_depletion(&original_recipe, original.quantity)?;
        let reapplication = plan_depletion(&new_recipe, new_quantity)?;

        let updated = self
            .repo
            .update_sale(Sale {
                recipe_id: new_recipe.id,
                quantity: new_quantity,
                receipt_id: input.receipt_id.or_else(|| original.receipt_id.clone()),
                updated_by: actor.user_id(),
                updated_at: now_millis(),
                ..original.clone()
            })
            .await?;

        let adjusted = async {
            let mut transactions = self
                .dispatch(actor, sale_id, reversal, TransactionType::In)
                .await?;
            transactions.extend(
                self.dispatch(actor, sale_id, reapplication, TransactionType::Out)
                    .await?,
            );
            Ok::<_, AppError>(transactions)
        }
        .await;

        match adjusted {
            Ok(transactions) => {
                tracing::info!(
                    sale_id = %sale_id,
                    recipe_changed,
                    quantity_changed,
                    transactions = transactions.len(),
                    "Re-applied sale inventory"
                );
                Ok(SaleOutcome {
                    sale: updated,
                    transactions,
                })
            }
            Err(e) => {
                tracing::error!(
                    sale_id = %sale_id,
                    error = %e,
                    "Inventory adjustment failed, restoring sale"
                );
                if let Err(restore) = self.repo.update_sale(original).await {
                    tracing::error!(error = %restore, "Failed to restore sale");
                }
                Err(e)
            }
        }
    }

    /// Write sale fields without touching inventory
    pub async fn update_sale(
        &self,
        actor: &impl Actor,
        sale_id: Uuid,
        input: UpdateSaleInput,
    ) -> AppResult<SaleOutcome> {
        authorize(actor, Action::Update, Subject::Sale)?;
        input.validate()?;

        let current = self.get(actor, sale_id).await?;
        let recipe_changed = input.recipe_id.is_some_and(|id| id != current.recipe_id);
        let quantity_changed = input.quantity.is_some_and(|q| q != current.quantity);
        if current.inventory_updated && (recipe_changed || quantity_changed) {
            return Err(AppError::BusinessRule(
                "Changing the recipe or quantity of this sale requires adjusting inventory"
                    .to_string(),
            ));
        }

        if let Some(quantity) = input.quantity {
            validation::validate_quantity(quantity)
                .map_err(|m| AppError::validation("quantity", m))?;
        }
        if recipe_changed {
            self.sellable_recipe(actor, input.recipe_id.unwrap_or(current.recipe_id))
                .await?;
        }

        let sale = self
            .repo
            .update_sale(Sale {
                recipe_id: input.recipe_id.unwrap_or(current.recipe_id),
                quantity: input.quantity.unwrap_or(current.quantity),
                receipt_id: input.receipt_id.or(current.receipt_id.clone()),
                updated_by: actor.user_id(),
                updated_at: now_millis(),
                ..current
            })
            .await?;

        tracing::info!(sale_id = %sale_id, "Updated sale");
        Ok(SaleOutcome::sale_only(sale))
    }

    /// Delete a sale, returning its ingredients to stock if they were taken
    pub async fn delete_sale(&self, actor: &impl Actor, sale_id: Uuid) -> AppResult<SaleOutcome> {
        authorize(actor, Action::Delete, Subject::Sale)?;
        let sale = self.get(actor, sale_id).await?;

        let transactions = if sale.inventory_updated {
            let recipe = self.recipe(actor, sale.recipe_id).await?;
            let reversal = plan_depletion(&recipe, sale.quantity)?;
            self.dispatch(actor, sale.id, reversal, TransactionType::In)
                .await?
        } else {
            Vec::new()
        };

        self.repo.delete_sale(actor.restaurant_id(), sale_id).await?;
        tracing::info!(sale_id = %sale_id, reversed = transactions.len(), "Deleted sale");
        Ok(SaleOutcome { sale, transactions })
    }

    /// Issue one transaction per ingredient concurrently.
    ///
    /// Every transaction is awaited; the first failure is returned and the
    /// ones that succeeded are left in place.
    async fn dispatch(
        &self,
        actor: &impl Actor,
        sale_id: Uuid,
        depletions: Vec<IngredientDepletion>,
        direction: TransactionType,
    ) -> AppResult<Vec<StockTransaction>> {
        let (reason, notes) = match direction {
            TransactionType::Out => (TransactionReason::Sale, format!("Sale {}", sale_id)),
            TransactionType::In => (
                TransactionReason::Adjustment,
                format!("Reversal of sale {}", sale_id),
            ),
        };

        let pending = depletions
            .into_iter()
            .map(|depletion| {
                self.stock.record_system(
                    actor,
                    SystemMovement {
                        item_id: depletion.item_id,
                        transaction_type: direction,
                        quantity: depletion.quantity,
                        reason,
                        notes: notes.clone(),
                    },
                )
            });

        join_all(pending)
            .await
            .into_iter()
            .map(|result| result.map(|movement| movement.transaction))
            .collect()
    }

    async fn recipe(&self, actor: &impl Actor, recipe_id: Uuid) -> AppResult<Recipe> {
        self.repo
            .get_recipe(actor.restaurant_id(), recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))
    }

    /// A recipe new sales may be recorded against
    async fn sellable_recipe(&self, actor: &impl Actor, recipe_id: Uuid) -> AppResult<Recipe> {
        let recipe = self.recipe(actor, recipe_id).await?;
        if !recipe.is_sellable() {
            return Err(AppError::BusinessRule(format!(
                "{} is {} and cannot be sold",
                recipe.name,
                recipe.status.as_str().to_lowercase()
            )));
        }
        Ok(recipe)
    }
}

/// Ingredient quantities for selling `quantity` of `recipe`.
///
/// Checked before any row is written, so an amount that cannot be
/// represented or recorded never leaves a half-applied sale behind.
fn plan_depletion(recipe: &Recipe, quantity: Decimal) -> AppResult<Vec<IngredientDepletion>> {
    let too_large =
        || AppError::validation("quantity", format!("Quantity is too large for {}", recipe.name));

    let depletions = sale_depletions(recipe, quantity).ok_or_else(too_large)?;
    let ceiling = Decimal::from(validation::MAX_QUANTITY);
    if depletions.iter().any(|d| d.quantity > ceiling) {
        return Err(too_large());
    }
    Ok(depletions)
}

fn require_ingredients(recipe: &Recipe) -> AppResult<()> {
    if recipe.ingredients().is_empty() {
        return Err(AppError::BusinessRule(format!(
            "{} has no ingredients",
            recipe.name
        )));
    }
    Ok(())
}

fn new_sale(actor: &impl Actor, input: &CreateSaleInput, inventory_updated: bool) -> Sale {
    let now = now_millis();
    Sale {
        id: Uuid::new_v4(),
        restaurant_id: actor.restaurant_id(),
        recipe_id: input.recipe_id,
        quantity: input.quantity,
        inventory_updated,
        receipt_id: input.receipt_id.clone(),
        created_by: actor.user_id(),
        updated_by: actor.user_id(),
        created_at: now,
        updated_at: now,
    }
}
