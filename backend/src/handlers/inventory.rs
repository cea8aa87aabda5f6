//! HTTP handlers for inventory items

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::InventoryItem;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{CreateItemInput, ItemFilter, Reconciliation, UpdateItemInput};
use crate::AppState;

pub async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ItemFilter>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.services.inventory.list(&user, &filter).await?))
}

pub async fn low_stock_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<InventoryItem>>> {
    Ok(Json(state.services.inventory.low_stock(&user).await?))
}

pub async fn get_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(state.services.inventory.get(&user, item_id).await?))
}

pub async fn create_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateItemInput>,
) -> AppResult<(StatusCode, Json<InventoryItem>)> {
    let item = state.services.inventory.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    Ok(Json(state.services.inventory.update(&user, item_id, input).await?))
}

pub async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.inventory.delete(&user, item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Compare an item's stored stock with its ledger balance
pub async fn reconcile_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Reconciliation>> {
    Ok(Json(state.services.inventory.reconcile(&user, item_id).await?))
}
