//! Supplier service

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use shared::{validation, Action, Actor, Subject, Supplier};
use uuid::Uuid;
use validator::Validate;

use super::authorize;
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

#[derive(Clone)]
pub struct SupplierService {
    repo: Arc<dyn Repository>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    #[validate(length(max = 200))]
    pub contact_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Blank optional text is stored as absent
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SupplierService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, actor: &impl Actor) -> AppResult<Vec<Supplier>> {
        authorize(actor, Action::Read, Subject::Supplier)?;
        self.repo.list_suppliers(actor.restaurant_id()).await
    }

    pub async fn get(&self, actor: &impl Actor, supplier_id: Uuid) -> AppResult<Supplier> {
        authorize(actor, Action::Read, Subject::Supplier)?;
        self.repo
            .get_supplier(actor.restaurant_id(), supplier_id)
            .await?
            .ok_or_else(|| AppError::not_found("Supplier"))
    }

    pub async fn create(&self, actor: &impl Actor, input: SupplierInput) -> AppResult<Supplier> {
        authorize(actor, Action::Create, Subject::Supplier)?;
        input.validate()?;
        validation::validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let now = Utc::now();
        let supplier = self
            .repo
            .insert_supplier(Supplier {
                id: Uuid::new_v4(),
                restaurant_id: actor.restaurant_id(),
                name: input.name.trim().to_string(),
                contact_name: non_blank(input.contact_name),
                email: non_blank(input.email),
                phone: non_blank(input.phone),
                address: non_blank(input.address),
                notes: non_blank(input.notes),
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(supplier_id = %supplier.id, name = %supplier.name, "Created supplier");
        Ok(supplier)
    }

    /// Replace a supplier's details
    pub async fn update(
        &self,
        actor: &impl Actor,
        supplier_id: Uuid,
        input: SupplierInput,
    ) -> AppResult<Supplier> {
        authorize(actor, Action::Update, Subject::Supplier)?;
        input.validate()?;
        validation::validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let current = self.get(actor, supplier_id).await?;
        let supplier = self
            .repo
            .update_supplier(Supplier {
                name: input.name.trim().to_string(),
                contact_name: non_blank(input.contact_name),
                email: non_blank(input.email),
                phone: non_blank(input.phone),
                address: non_blank(input.address),
                notes: non_blank(input.notes),
                updated_at: Utc::now(),
                ..current
            })
            .await?;

        tracing::info!(supplier_id = %supplier_id, "Updated supplier");
        Ok(supplier)
    }

    /// Delete a supplier no item is sourced from
    pub async fn delete(&self, actor: &impl Actor, supplier_id: Uuid) -> AppResult<()> {
        authorize(actor, Action::Delete, Subject::Supplier)?;
        let supplier = self.get(actor, supplier_id).await?;

        let linked = self
            .repo
            .list_items(actor.restaurant_id())
            .await?
            .iter()
            .filter(|item| item.supplier_id == Some(supplier_id))
            .count();
        if linked > 0 {
            return Err(AppError::BusinessRule(format!(
                "Cannot delete {}: {} inventory {} this supplier",
                supplier.name,
                linked,
                if linked == 1 { "item still uses" } else { "items still use" }
            )));
        }

        self.repo
            .delete_supplier(actor.restaurant_id(), supplier_id)
            .await?;
        tracing::info!(supplier_id = %supplier_id, "Deleted supplier");
        Ok(())
    }
}
