//! HTTP handlers for sales

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Sale;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::sales::{CreateSaleInput, SaleOutcome, UpdateSaleInput};
use crate::AppState;

pub async fn list_sales(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Sale>>> {
    Ok(Json(state.services.sales.list(&user).await?))
}

pub async fn get_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Sale>> {
    Ok(Json(state.services.sales.get(&user, sale_id).await?))
}

/// Record a sale, depleting ingredients unless `update_inventory` is false
pub async fn create_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateSaleInput>,
) -> AppResult<(StatusCode, Json<SaleOutcome>)> {
    let outcome = state.services.sales.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn update_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
    Json(input): Json<UpdateSaleInput>,
) -> AppResult<Json<SaleOutcome>> {
    Ok(Json(
        state
            .services
            .sales
            .update_sale_and_adjust_inventory(&user, sale_id, input)
            .await?,
    ))
}

/// Deplete ingredients for a sale recorded without them
pub async fn mark_inventory_updated(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleOutcome>> {
    Ok(Json(
        state
            .services
            .sales
            .mark_inventory_updated(&user, sale_id)
            .await?,
    ))
}

pub async fn delete_sale(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<SaleOutcome>> {
    Ok(Json(state.services.sales.delete_sale(&user, sale_id).await?))
}
