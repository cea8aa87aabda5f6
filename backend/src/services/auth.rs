//! Authentication service for sign-up, login and token management

use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::{validation, Restaurant, Role, User};
use uuid::Uuid;
use validator::Validate;

use crate::config::JwtConfig;
use crate::error::{AppError, AppResult};
use crate::repository::{Repository, UserAccount};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    repo: Arc<dyn Repository>,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for opening a restaurant together with its first manager
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 200, message = "Restaurant name must be 1-200 characters"))]
    pub restaurant_name: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: String,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub restaurant: Restaurant,
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    pub restaurant_id: Uuid,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Tokens issued on login, with the profile they were issued for
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

impl AuthService {
    pub fn new(repo: Arc<dyn Repository>, jwt: &JwtConfig) -> Self {
        Self {
            repo,
            jwt_secret: jwt.secret.clone(),
            access_token_expiry: jwt.access_token_expiry,
            refresh_token_expiry: jwt.refresh_token_expiry,
        }
    }

    /// Create a restaurant and its first manager, then sign the manager in
    pub async fn register(&self, input: RegisterInput) -> AppResult<RegisterResponse> {
        input.validate()?;
        validation::validate_password(&input.password)
            .map_err(|m| AppError::validation("password", m))?;

        let email = normalize_email(&input.email);
        if self.repo.find_account_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let now = Utc::now();
        let restaurant = self
            .repo
            .insert_restaurant(Restaurant {
                id: Uuid::new_v4(),
                name: input.restaurant_name.trim().to_string(),
                created_at: now,
            })
            .await?;

        let user = self
            .repo
            .insert_user(UserAccount {
                user: User {
                    id: Uuid::new_v4(),
                    restaurant_id: restaurant.id,
                    email,
                    full_name: input.full_name.trim().to_string(),
                    role: Role::Manager,
                    created_at: now,
                    updated_at: now,
                },
                password_hash,
            })
            .await?;

        let tokens = self.issue_tokens(&user).await?;
        tracing::info!(restaurant_id = %restaurant.id, user_id = %user.id, "Registered restaurant");

        Ok(RegisterResponse {
            restaurant,
            user,
            tokens,
        })
    }

    /// Authenticate with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<LoginResponse> {
        let account = self
            .repo
            .find_account_by_email(&normalize_email(&input.email))
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(&input.password, &account.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::debug!(user_id = %account.user.id, "Rejected login with wrong password");
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.issue_tokens(&account.user).await?;
        tracing::info!(user_id = %account.user.id, "User logged in");

        Ok(LoginResponse {
            user: account.user,
            tokens,
        })
    }

    /// Trade a refresh token for a new pair. Each refresh token works once.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let invalid = || AppError::Unauthorized("Invalid or expired refresh token".to_string());

        let user_id = self
            .repo
            .consume_refresh_token(&hash_token(refresh_token))
            .await?
            .ok_or_else(invalid)?;

        // The profile may have been deleted or its role changed since login
        let user = self.repo.find_user(user_id).await?.ok_or_else(invalid)?;
        self.issue_tokens(&user).await
    }

    /// Validate an access token and return its claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode_claims(&self.jwt_secret, token)
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let tokens = self.generate_tokens(user)?;
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);
        self.repo
            .store_refresh_token(user.id, hash_token(&tokens.refresh_token), expires_at)
            .await?;
        Ok(tokens)
    }

    fn generate_tokens(&self, user: &User) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            restaurant_id: user.restaurant_id,
            role: user.role,
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            refresh_token: Uuid::new_v4().to_string(),
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

/// Decode and verify an access token signed with `secret`
pub fn decode_claims(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Refresh tokens are stored as SHA-256 hex digests
fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
