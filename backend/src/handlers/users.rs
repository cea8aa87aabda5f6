//! HTTP handlers for team management

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::User;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::users::{CreateUserInput, UpdateUserInput};
use crate::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(state.services.users.list(&user).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    Ok(Json(state.services.users.get(&user, user_id).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    let created = state.services.users.create(&user, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUserInput>,
) -> AppResult<Json<User>> {
    Ok(Json(state.services.users.update(&user, user_id, input).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.users.delete(&user, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
