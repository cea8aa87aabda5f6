//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};

use crate::error::AppResult;
use crate::services::auth::{
    AuthTokens, LoginInput, LoginResponse, RefreshInput, RegisterInput, RegisterResponse,
};
use crate::AppState;

/// Open a restaurant with its first manager
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let response = state.services.auth.register(input).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.services.auth.login(input).await?))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshInput>,
) -> AppResult<Json<AuthTokens>> {
    Ok(Json(state.services.auth.refresh(&input.refresh_token).await?))
}
