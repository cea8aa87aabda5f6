//! Authentication middleware
//!
//! Validates the bearer token and exposes the caller to handlers as an
//! [`AuthUser`], which the services accept as an [`Actor`].

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use shared::{Actor, Role};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::{decode_claims, Claims};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub restaurant_id: Uuid,
    pub role: Role,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            restaurant_id: claims.restaurant_id,
            role: claims.role,
        }
    }
}

impl Actor for AuthUser {
    fn user_id(&self) -> Uuid {
        self.user_id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn restaurant_id(&self) -> Uuid {
        self.restaurant_id
    }
}

/// Reject requests without a valid access token
pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or_else(|| {
        AppError::Unauthorized("Missing or invalid Authorization header".to_string())
    })?;

    let claims = decode_claims(&state.config.jwt.secret, bearer.token())?;
    let user = AuthUser::from(claims);

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[tokio::test]
    async fn extractor_requires_the_middleware() {
        let (mut parts, _) = HttpRequest::new(()).into_parts();
        let result = CurrentUser::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn extractor_reads_the_inserted_user() {
        let (mut parts, _) = HttpRequest::new(()).into_parts();
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            role: Role::Staff,
        };
        parts.extensions.insert(user.clone());

        let CurrentUser(found) = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found.user_id, user.user_id);
        assert!(!found.is_manager());
    }
}
