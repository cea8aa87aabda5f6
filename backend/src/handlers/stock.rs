//! HTTP handlers for stock transactions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::{StockTransaction, SyncReport};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::repository::StockMovement;
use crate::services::stock::{RecordTransactionInput, UpdateTransactionInput};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub item_id: Option<Uuid>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    Ok(Json(state.services.stock.list(&user, query.item_id).await?))
}

pub async fn get_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<StockTransaction>> {
    Ok(Json(state.services.stock.get(&user, transaction_id).await?))
}

/// Record a stock transaction and apply it to the item
pub async fn record_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<(StatusCode, Json<StockMovement>)> {
    let movement = state.services.stock.record(&user, input).await?;
    Ok((StatusCode::CREATED, Json(movement)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(transaction_id): Path<Uuid>,
    Json(input): Json<UpdateTransactionInput>,
) -> AppResult<Json<StockMovement>> {
    Ok(Json(
        state
            .services
            .stock
            .update(&user, transaction_id, input)
            .await?,
    ))
}

/// Apply a batch of transactions queued while offline
pub async fn sync_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(entries): Json<Vec<RecordTransactionInput>>,
) -> AppResult<Json<SyncReport>> {
    Ok(Json(state.services.stock.sync_offline(&user, entries).await?))
}
