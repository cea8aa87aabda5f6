//! Team management within a restaurant

use std::sync::Arc;

use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use serde::Deserialize;
use shared::{validation, Action, Actor, Role, Subject, User};
use uuid::Uuid;
use validator::Validate;

use super::authorize;
use crate::error::{AppError, AppResult};
use crate::repository::{Repository, UserAccount};

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
}

/// Input for adding a team member
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserInput {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: String,
    pub role: Role,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub full_name: Option<String>,
    pub role: Option<Role>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, actor: &impl Actor) -> AppResult<Vec<User>> {
        authorize(actor, Action::Read, Subject::UserProfile)?;
        self.repo.list_users(actor.restaurant_id()).await
    }

    pub async fn get(&self, actor: &impl Actor, user_id: Uuid) -> AppResult<User> {
        authorize(actor, Action::Read, Subject::UserProfile)?;
        self.repo
            .get_user(actor.restaurant_id(), user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    pub async fn create(&self, actor: &impl Actor, input: CreateUserInput) -> AppResult<User> {
        authorize(actor, Action::Create, Subject::UserProfile)?;
        input.validate()?;
        validation::validate_password(&input.password)
            .map_err(|m| AppError::validation("password", m))?;

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let now = Utc::now();
        let user = self
            .repo
            .insert_user(UserAccount {
                user: User {
                    id: Uuid::new_v4(),
                    restaurant_id: actor.restaurant_id(),
                    email: input.email.trim().to_lowercase(),
                    full_name: input.full_name.trim().to_string(),
                    role: input.role,
                    created_at: now,
                    updated_at: now,
                },
                password_hash,
            })
            .await?;

        tracing::info!(
            user_id = %user.id,
            role = %user.role,
            created_by = %actor.user_id(),
            "Added team member"
        );
        Ok(user)
    }

    /// Change a member's name or role. Managers cannot change their own role.
    pub async fn update(
        &self,
        actor: &impl Actor,
        user_id: Uuid,
        input: UpdateUserInput,
    ) -> AppResult<User> {
        authorize(actor, Action::Update, Subject::UserProfile)?;
        input.validate()?;

        let mut user = self.get(actor, user_id).await?;
        if let Some(role) = input.role {
            if user_id == actor.user_id() && role != user.role {
                return Err(AppError::BusinessRule(
                    "You cannot change your own role".to_string(),
                ));
            }
            user.role = role;
        }
        if let Some(name) = input.full_name {
            validation::validate_name(&name).map_err(|m| AppError::validation("full_name", m))?;
            user.full_name = name.trim().to_string();
        }
        user.updated_at = Utc::now();

        let user = self.repo.update_user(user).await?;
        tracing::info!(user_id = %user_id, role = %user.role, "Updated team member");
        Ok(user)
    }

    pub async fn delete(&self, actor: &impl Actor, user_id: Uuid) -> AppResult<()> {
        authorize(actor, Action::Delete, Subject::UserProfile)?;
        if user_id == actor.user_id() {
            return Err(AppError::BusinessRule(
                "You cannot delete your own account".to_string(),
            ));
        }

        if !self.repo.delete_user(actor.restaurant_id(), user_id).await? {
            return Err(AppError::not_found("User"));
        }
        tracing::info!(user_id = %user_id, "Removed team member");
        Ok(())
    }
}
