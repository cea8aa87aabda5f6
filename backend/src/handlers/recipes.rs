//! HTTP handlers for recipes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{Recipe, RecipeStatus};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::recipes::{CreateRecipeInput, UpdateRecipeInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    #[serde(default)]
    pub include_removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: RecipeStatus,
}

pub async fn list_recipes(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<RecipeQuery>,
) -> AppResult<Json<Vec<Recipe>>> {
    Ok(Json(
        state
            .services
            .recipes
            .list(&user, query.include_removed)
            .await?,
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(state.services.recipes.get(&user, recipe_id).await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = state.services.recipes.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<UpdateRecipeInput>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(
        state
            .services
            .recipes
            .update(&user, recipe_id, input)
            .await?,
    ))
}

/// Activate, deactivate or remove a recipe
pub async fn set_recipe_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<StatusInput>,
) -> AppResult<Json<Recipe>> {
    Ok(Json(
        state
            .services
            .recipes
            .set_status(&user, recipe_id, input.status)
            .await?,
    ))
}
