//! HTTP handlers for suppliers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Supplier;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::suppliers::SupplierInput;
use crate::AppState;

pub async fn list_suppliers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<Supplier>>> {
    Ok(Json(state.services.suppliers.list(&user).await?))
}

pub async fn get_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    Ok(Json(state.services.suppliers.get(&user, supplier_id).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let supplier = state.services.suppliers.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    Ok(Json(
        state
            .services
            .suppliers
            .update(&user, supplier_id, input)
            .await?,
    ))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.suppliers.delete(&user, supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
