//! User, role and restaurant models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::string_enum! {
    /// Roles a user can hold within a restaurant
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Role: "role" {
        Manager => "manager",
        Staff => "staff",
    }
}

/// Anything that acts on behalf of a user: a stored profile, or the claims
/// carried by an access token
pub trait Actor {
    fn user_id(&self) -> Uuid;
    fn role(&self) -> Role;
    fn restaurant_id(&self) -> Uuid;

    fn is_manager(&self) -> bool {
        self.role() == Role::Manager
    }
}

/// A user profile, tenant-scoped to a single restaurant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Actor for User {
    fn user_id(&self) -> Uuid {
        self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn restaurant_id(&self) -> Uuid {
        self.restaurant_id
    }
}

/// A restaurant is the tenant every other record belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
