//! Recipe service

use std::collections::HashSet;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    now_millis, validation, Action, Actor, Ingredient, Recipe, RecipeContent, RecipeStatus,
    RecipeUnit, Subject,
};
use uuid::Uuid;
use validator::Validate;

use super::authorize;
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

#[derive(Clone)]
pub struct RecipeService {
    repo: Arc<dyn Repository>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecipeInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub quantity: Option<Decimal>,
    pub unit: Option<RecipeUnit>,
    #[serde(default = "default_status")]
    pub status: RecipeStatus,
    #[serde(default)]
    pub content: RecipeContent,
}

fn default_status() -> RecipeStatus {
    RecipeStatus::Active
}

/// Partial update of a recipe; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRecipeInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub quantity: Option<Decimal>,
    pub unit: Option<RecipeUnit>,
    pub status: Option<RecipeStatus>,
    pub content: Option<RecipeContent>,
}

impl RecipeService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    /// Recipes of the actor's restaurant; removed ones only when asked for
    pub async fn list(&self, actor: &impl Actor, include_removed: bool) -> AppResult<Vec<Recipe>> {
        authorize(actor, Action::Read, Subject::Recipe)?;
        let recipes = self.repo.list_recipes(actor.restaurant_id()).await?;
        Ok(recipes
            .into_iter()
            .filter(|r| include_removed || r.status != RecipeStatus::Removed)
            .collect())
    }

    pub async fn get(&self, actor: &impl Actor, recipe_id: Uuid) -> AppResult<Recipe> {
        authorize(actor, Action::Read, Subject::Recipe)?;
        self.repo
            .get_recipe(actor.restaurant_id(), recipe_id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipe"))
    }

    pub async fn create(&self, actor: &impl Actor, input: CreateRecipeInput) -> AppResult<Recipe> {
        authorize(actor, Action::Create, Subject::Recipe)?;
        input.validate()?;
        validation::validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;
        validation::validate_recipe_yield(input.quantity)
            .map_err(|m| AppError::validation("quantity", m))?;
        self.check_ingredients(actor, &input.content.ingredients)
            .await?;

        let now = now_millis();
        let recipe = self
            .repo
            .insert_recipe(Recipe {
                id: Uuid::new_v4(),
                restaurant_id: actor.restaurant_id(),
                name: input.name.trim().to_string(),
                quantity: input.quantity,
                unit: input.unit,
                status: input.status,
                content: input.content,
                created_by: actor.user_id(),
                updated_by: actor.user_id(),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(
            recipe_id = %recipe.id,
            ingredients = recipe.ingredients().len(),
            "Created recipe"
        );
        Ok(recipe)
    }

    pub async fn update(
        &self,
        actor: &impl Actor,
        recipe_id: Uuid,
        input: UpdateRecipeInput,
    ) -> AppResult<Recipe> {
        authorize(actor, Action::Update, Subject::Recipe)?;
        input.validate()?;

        let mut recipe = self.get(actor, recipe_id).await?;
        if let Some(name) = input.name {
            validation::validate_name(&name).map_err(|m| AppError::validation("name", m))?;
            recipe.name = name.trim().to_string();
        }
        if input.quantity.is_some() {
            validation::validate_recipe_yield(input.quantity)
                .map_err(|m| AppError::validation("quantity", m))?;
            recipe.quantity = input.quantity;
        }
        if input.unit.is_some() {
            recipe.unit = input.unit;
        }
        if let Some(status) = input.status {
            recipe.status = status;
        }
        if let Some(content) = input.content {
            self.check_ingredients(actor, &content.ingredients).await?;
            recipe.content = content;
        }
        recipe.updated_by = actor.user_id();
        recipe.updated_at = now_millis();

        let recipe = self.repo.update_recipe(recipe).await?;
        tracing::info!(recipe_id = %recipe_id, status = %recipe.status, "Updated recipe");
        Ok(recipe)
    }

    pub async fn set_status(
        &self,
        actor: &impl Actor,
        recipe_id: Uuid,
        status: RecipeStatus,
    ) -> AppResult<Recipe> {
        let input = UpdateRecipeInput {
            status: Some(status),
            ..UpdateRecipeInput::default()
        };
        self.update(actor, recipe_id, input).await
    }

    /// Ingredients must be well formed and refer to items of the same restaurant
    async fn check_ingredients(
        &self,
        actor: &impl Actor,
        ingredients: &[Ingredient],
    ) -> AppResult<()> {
        validation::validate_ingredients(ingredients)
            .map_err(|m| AppError::validation("content.ingredients", m))?;
        if ingredients.is_empty() {
            return Ok(());
        }

        let known: HashSet<Uuid> = self
            .repo
            .list_items(actor.restaurant_id())
            .await?
            .into_iter()
            .map(|item| item.id)
            .collect();

        match ingredients
            .iter()
            .find(|i| !known.contains(&i.inventory_item_id))
        {
            Some(missing) => Err(AppError::validation(
                "content.ingredients",
                format!("Inventory item {} does not exist", missing.inventory_item_id),
            )),
            None => Ok(()),
        }
    }
}
