//! Inventory item service

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    calculate_stock_balance, can_update_fields, is_low_stock, validation, Action, Actor,
    InventoryItem, ItemCategory, PermissionError, Subject, TransactionReason, TransactionType,
    Unit,
};
use uuid::Uuid;
use validator::Validate;

use super::stock::{StockService, SystemMovement};
use super::{authorize, ensure_tenant};
use crate::error::{AppError, AppResult};
use crate::repository::{ItemReferences, Repository};

#[derive(Clone)]
pub struct InventoryService {
    repo: Arc<dyn Repository>,
    stock: StockService,
}

/// Filters for listing items
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemFilter {
    pub category: Option<ItemCategory>,
    #[serde(default)]
    pub low_stock: bool,
    pub search: Option<String>,
}

impl ItemFilter {
    fn matches(&self, item: &InventoryItem) -> bool {
        if self.category.is_some_and(|c| c != item.category) {
            return false;
        }
        if self.low_stock && !is_low_stock(item) {
            return false;
        }
        match &self.search {
            Some(term) => item.name.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: String,
    pub category: ItemCategory,
    pub unit: Unit,
    #[serde(default)]
    pub cost_per_unit: Decimal,
    /// Opening stock, recorded as an adjustment so the ledger accounts for it
    #[serde(default)]
    pub current_stock: Decimal,
    #[serde(default)]
    pub min_threshold: Decimal,
    pub supplier_id: Option<Uuid>,
}

/// Partial update of an item; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 200, message = "Name must be 1-200 characters"))]
    pub name: Option<String>,
    pub category: Option<ItemCategory>,
    pub unit: Option<Unit>,
    pub cost_per_unit: Option<Decimal>,
    pub current_stock: Option<Decimal>,
    pub min_threshold: Option<Decimal>,
    /// `Some(None)` clears the supplier
    #[serde(default, with = "double_option")]
    pub supplier_id: Option<Option<Uuid>>,
    pub restaurant_id: Option<Uuid>,
}

impl UpdateItemInput {
    /// Names of the fields this update touches
    pub fn fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("category", self.category.is_some()),
            ("unit", self.unit.is_some()),
            ("cost_per_unit", self.cost_per_unit.is_some()),
            ("current_stock", self.current_stock.is_some()),
            ("min_threshold", self.min_threshold.is_some()),
            ("supplier_id", self.supplier_id.is_some()),
            ("restaurant_id", self.restaurant_id.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, present)| present.then_some(field))
        .collect()
    }
}

/// Distinguishes an absent field from an explicit `null`
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// Stored stock compared with the balance the ledger implies
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    pub item_id: Uuid,
    pub recorded_stock: Decimal,
    pub ledger_balance: Decimal,
    pub difference: Decimal,
    pub consistent: bool,
}

fn blockers_message(name: &str, refs: &ItemReferences) -> Option<String> {
    let plural = |n: i64, one: &str, many: &str| {
        format!("{} {}", n, if n == 1 { one } else { many })
    };
    let mut blockers = Vec::new();
    if refs.transactions > 0 {
        blockers.push(plural(refs.transactions, "stock transaction", "stock transactions"));
    }
    if refs.alerts > 0 {
        blockers.push(plural(refs.alerts, "alert", "alerts"));
    }
    if refs.recipes > 0 {
        blockers.push(plural(refs.recipes, "recipe", "recipes"));
    }
    if blockers.is_empty() {
        return None;
    }
    Some(format!(
        "Cannot delete {}: it is still referenced by {}",
        name,
        blockers.join(" and ")
    ))
}

impl InventoryService {
    pub fn new(repo: Arc<dyn Repository>, stock: StockService) -> Self {
        Self { repo, stock }
    }

    pub async fn list(
        &self,
        actor: &impl Actor,
        filter: &ItemFilter,
    ) -> AppResult<Vec<InventoryItem>> {
        authorize(actor, Action::Read, Subject::InventoryItem)?;
        let items = self.repo.list_items(actor.restaurant_id()).await?;
        Ok(items.into_iter().filter(|item| filter.matches(item)).collect())
    }

    pub async fn get(&self, actor: &impl Actor, item_id: Uuid) -> AppResult<InventoryItem> {
        authorize(actor, Action::Read, Subject::InventoryItem)?;
        self.repo
            .get_item(actor.restaurant_id(), item_id)
            .await?
            .ok_or_else(|| AppError::not_found("Inventory item"))
    }

    /// Items at or below their minimum threshold
    pub async fn low_stock(&self, actor: &impl Actor) -> AppResult<Vec<InventoryItem>> {
        let filter = ItemFilter {
            low_stock: true,
            ..ItemFilter::default()
        };
        self.list(actor, &filter).await
    }

    pub async fn create(
        &self,
        actor: &impl Actor,
        input: CreateItemInput,
    ) -> AppResult<InventoryItem> {
        authorize(actor, Action::Create, Subject::InventoryItem)?;
        input.validate()?;
        validation::validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;
        validation::validate_cost(Some(input.cost_per_unit))
            .map_err(|m| AppError::validation("cost_per_unit", m))?;
        validation::validate_stock_level(input.current_stock)
            .map_err(|m| AppError::validation("current_stock", m))?;
        validation::validate_threshold(input.min_threshold)
            .map_err(|m| AppError::validation("min_threshold", m))?;
        if let Some(supplier_id) = input.supplier_id {
            self.ensure_supplier(actor, supplier_id).await?;
        }

        let now = Utc::now();
        let item = self
            .repo
            .insert_item(InventoryItem {
                id: Uuid::new_v4(),
                restaurant_id: actor.restaurant_id(),
                name: input.name.trim().to_string(),
                category: input.category,
                unit: input.unit,
                cost_per_unit: input.cost_per_unit,
                current_stock: Decimal::ZERO,
                min_threshold: input.min_threshold,
                supplier_id: input.supplier_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        tracing::info!(item_id = %item.id, name = %item.name, "Created inventory item");

        if input.current_stock > Decimal::ZERO {
            let movement = self
                .stock
                .record_system(
                    actor,
                    SystemMovement {
                        item_id: item.id,
                        transaction_type: TransactionType::In,
                        quantity: input.current_stock,
                        reason: TransactionReason::Adjustment,
                        notes: "Opening stock".to_string(),
                    },
                )
                .await?;
            return Ok(movement.item);
        }
        Ok(item)
    }

    /// Apply a partial update.
    ///
    /// A new `current_stock` is recorded as an adjustment transaction for the
    /// difference, so the ledger stays the source of truth for stock.
    pub async fn update(
        &self,
        actor: &impl Actor,
        item_id: Uuid,
        input: UpdateItemInput,
    ) -> AppResult<InventoryItem> {
        authorize(actor, Action::Update, Subject::InventoryItem)?;
        input.validate()?;
        if !can_update_fields(Some(actor), Subject::InventoryItem, &input.fields()) {
            return Err(PermissionError::RestrictedFields.into());
        }
        if let Some(restaurant_id) = input.restaurant_id {
            ensure_tenant(actor, restaurant_id)?;
        }
        if let Some(target) = input.current_stock {
            validation::validate_stock_level(target)
                .map_err(|m| AppError::validation("current_stock", m))?;
        }

        let current = self.get(actor, item_id).await?;
        let mut item = current.clone();

        if let Some(name) = &input.name {
            validation::validate_name(name).map_err(|m| AppError::validation("name", m))?;
            item.name = name.trim().to_string();
        }
        if let Some(category) = input.category {
            item.category = category;
        }
        if let Some(unit) = input.unit {
            item.unit = unit;
        }
        if let Some(cost) = input.cost_per_unit {
            validation::validate_cost(Some(cost))
                .map_err(|m| AppError::validation("cost_per_unit", m))?;
            item.cost_per_unit = cost;
        }
        if let Some(threshold) = input.min_threshold {
            validation::validate_threshold(threshold)
                .map_err(|m| AppError::validation("min_threshold", m))?;
            item.min_threshold = threshold;
        }
        if let Some(supplier_id) = input.supplier_id {
            if let Some(id) = supplier_id {
                self.ensure_supplier(actor, id).await?;
            }
            item.supplier_id = supplier_id;
        }
        item.updated_at = Utc::now();

        let mut item = self.repo.update_item(item).await?;

        if let Some(target) = input.current_stock {
            let delta = target - item.current_stock;
            if !delta.is_zero() {
                let direction = if delta > Decimal::ZERO {
                    TransactionType::In
                } else {
                    TransactionType::Out
                };
                let movement = self
                    .stock
                    .record_system(
                        actor,
                        SystemMovement {
                            item_id,
                            transaction_type: direction,
                            quantity: delta.abs(),
                            reason: TransactionReason::Adjustment,
                            notes: format!(
                                "Stock count corrected from {} to {}",
                                item.current_stock.normalize(),
                                target.normalize()
                            ),
                        },
                    )
                    .await?;
                item = movement.item;
            }
        }

        tracing::info!(item_id = %item_id, fields = ?input.fields(), "Updated inventory item");
        Ok(item)
    }

    /// Delete an item nothing references
    pub async fn delete(&self, actor: &impl Actor, item_id: Uuid) -> AppResult<()> {
        authorize(actor, Action::Delete, Subject::InventoryItem)?;
        let item = self.get(actor, item_id).await?;

        let refs = self.repo.item_references(actor.restaurant_id(), item_id).await?;
        if let Some(message) = blockers_message(&item.name, &refs) {
            return Err(AppError::BusinessRule(message));
        }

        if !self.repo.delete_item(actor.restaurant_id(), item_id).await? {
            return Err(AppError::not_found("Inventory item"));
        }
        tracing::info!(item_id = %item_id, name = %item.name, "Deleted inventory item");
        Ok(())
    }

    /// Compare an item's stored stock with its ledger balance
    pub async fn reconcile(&self, actor: &impl Actor, item_id: Uuid) -> AppResult<Reconciliation> {
        let item = self.get(actor, item_id).await?;
        authorize(actor, Action::Read, Subject::StockTransaction)?;
        let ledger = self
            .repo
            .list_transactions(actor.restaurant_id(), Some(item_id))
            .await?;

        let balance = calculate_stock_balance(&item, &ledger);
        let difference = item.current_stock - balance;
        if !difference.is_zero() {
            tracing::warn!(item_id = %item_id, %difference, "Stock differs from ledger");
        }

        Ok(Reconciliation {
            item_id,
            recorded_stock: item.current_stock,
            ledger_balance: balance,
            difference,
            consistent: difference.is_zero(),
        })
    }

    async fn ensure_supplier(&self, actor: &impl Actor, supplier_id: Uuid) -> AppResult<()> {
        match self.repo.get_supplier(actor.restaurant_id(), supplier_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::validation("supplier_id", "Supplier does not exist")),
        }
    }
}
