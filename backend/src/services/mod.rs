//! Business logic services
//!
//! Each service holds an injected [`Repository`] and takes the acting user
//! per call. Every mutation consults the ability engine before touching
//! storage.

use std::sync::Arc;

use shared::{define_abilities_for, Action, Actor, PermissionError, Subject};
use uuid::Uuid;

use crate::config::Config;
use crate::repository::Repository;

pub mod alerts;
pub mod analytics;
pub mod auth;
pub mod inventory;
pub mod recipes;
pub mod sales;
pub mod stock;
pub mod suppliers;
pub mod users;

pub use alerts::{AlertFeed, AlertService};
pub use analytics::AnalyticsService;
pub use auth::AuthService;
pub use inventory::InventoryService;
pub use recipes::RecipeService;
pub use sales::SaleService;
pub use stock::StockService;
pub use suppliers::SupplierService;
pub use users::UserService;

/// Require that `actor` may perform `action` on `subject`
pub(crate) fn authorize(
    actor: &impl Actor,
    action: Action,
    subject: Subject,
) -> Result<(), PermissionError> {
    if define_abilities_for(Some(actor)).can(action, subject) {
        Ok(())
    } else {
        Err(denial_for(actor, subject))
    }
}

/// Require that a record belongs to the actor's restaurant
pub(crate) fn ensure_tenant(
    actor: &impl Actor,
    restaurant_id: Uuid,
) -> Result<(), PermissionError> {
    if shared::can_access_restaurant(Some(actor), restaurant_id) {
        Ok(())
    } else {
        Err(PermissionError::WrongRestaurant)
    }
}

fn denial_for(actor: &impl Actor, subject: Subject) -> PermissionError {
    match subject {
        Subject::AuditLog => PermissionError::AuditLogReadonly,
        _ if !actor.is_manager() => PermissionError::ManagerOnly,
        _ => PermissionError::Forbidden,
    }
}

/// Every service, wired to one repository
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub inventory: InventoryService,
    pub stock: StockService,
    pub alerts: AlertService,
    pub suppliers: SupplierService,
    pub recipes: RecipeService,
    pub sales: SaleService,
    pub users: UserService,
    pub analytics: AnalyticsService,
}

impl Services {
    pub fn new(repo: Arc<dyn Repository>, config: &Config, feed: AlertFeed) -> Self {
        let stock = StockService::new(repo.clone(), feed.clone());
        Self {
            auth: AuthService::new(repo.clone(), &config.jwt),
            inventory: InventoryService::new(repo.clone(), stock.clone()),
            alerts: AlertService::new(repo.clone(), feed),
            suppliers: SupplierService::new(repo.clone()),
            recipes: RecipeService::new(repo.clone()),
            sales: SaleService::new(repo.clone(), stock.clone()),
            users: UserService::new(repo.clone()),
            analytics: AnalyticsService::new(repo),
            stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::{Role, User};

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            email: "someone@example.com".to_string(),
            full_name: "Someone".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn staff_denials_name_managers() {
        let staff = user(Role::Staff);
        assert_eq!(
            authorize(&staff, Action::Delete, Subject::InventoryItem),
            Err(PermissionError::ManagerOnly)
        );
        assert!(authorize(&staff, Action::Create, Subject::StockTransaction).is_ok());
    }

    #[test]
    fn audit_log_is_readonly_even_for_managers() {
        let manager = user(Role::Manager);
        assert_eq!(
            authorize(&manager, Action::Update, Subject::AuditLog),
            Err(PermissionError::AuditLogReadonly)
        );
    }

    #[test]
    fn tenant_mismatch_is_rejected() {
        let manager = user(Role::Manager);
        assert!(ensure_tenant(&manager, manager.restaurant_id).is_ok());
        assert_eq!(
            ensure_tenant(&manager, Uuid::new_v4()),
            Err(PermissionError::WrongRestaurant)
        );
    }
}
