//! In-memory repository for demo mode and tests

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use shared::{
    Alert, InventoryItem, Recipe, RecipeStatus, Restaurant, Sale, StockTransaction,
    Supplier, User,
};

use super::{
    alert_for_change, amendment_delta, shifted_stock, ItemReferences, Repository, StockMovement,
    UserAccount,
};
use crate::error::{AppError, AppResult};

#[derive(Debug)]
struct RefreshToken {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

#[derive(Default)]
struct Tables {
    restaurants: HashMap<Uuid, Restaurant>,
    accounts: HashMap<Uuid, UserAccount>,
    refresh_tokens: HashMap<String, RefreshToken>,
    items: HashMap<Uuid, InventoryItem>,
    transactions: Vec<StockTransaction>,
    suppliers: HashMap<Uuid, Supplier>,
    alerts: Vec<Alert>,
    recipes: HashMap<Uuid, Recipe>,
    sales: HashMap<Uuid, Sale>,
}

impl Tables {
    /// Move an item's stock and record the alert the change calls for
    fn move_stock(
        &mut self,
        restaurant_id: Uuid,
        item_id: Uuid,
        delta: rust_decimal::Decimal,
    ) -> AppResult<(InventoryItem, Option<Alert>)> {
        let item = self
            .items
            .get_mut(&item_id)
            .filter(|item| item.restaurant_id == restaurant_id)
            .ok_or_else(|| AppError::not_found("Inventory item"))?;

        let before = item.clone();
        item.current_stock = shifted_stock(item.current_stock, delta)?;
        item.updated_at = Utc::now();
        let after = item.clone();

        let alert = alert_for_change(&before, &after);
        if let Some(alert) = &alert {
            self.alerts.push(alert.clone());
        }
        Ok((after, alert))
    }
}

/// Repository keeping every table in process memory.
///
/// Cloning shares the same tables.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T, F>(mut rows: Vec<T>, key: F) -> Vec<T>
where
    F: Fn(&T) -> DateTime<Utc>,
{
    rows.sort_by_key(|row| std::cmp::Reverse(key(row)));
    rows
}

#[async_trait]
impl Repository for InMemoryRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    // ------------------------------------------------------------------
    // Restaurants, users and sessions
    // ------------------------------------------------------------------

    async fn insert_restaurant(&self, restaurant: Restaurant) -> AppResult<Restaurant> {
        let mut tables = self.tables.write().await;
        tables.restaurants.insert(restaurant.id, restaurant.clone());
        Ok(restaurant)
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.get(&user_id).map(|a| a.user.clone()))
    }

    async fn get_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .get(&user_id)
            .filter(|a| a.user.restaurant_id == restaurant_id)
            .map(|a| a.user.clone()))
    }

    async fn list_users(&self, restaurant_id: Uuid) -> AppResult<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .accounts
            .values()
            .filter(|a| a.user.restaurant_id == restaurant_id)
            .map(|a| a.user.clone())
            .collect();
        users.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(users)
    }

    async fn insert_user(&self, account: UserAccount) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables
            .accounts
            .values()
            .any(|a| a.user.email.eq_ignore_ascii_case(&account.user.email))
        {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }
        let user = account.user.clone();
        tables.accounts.insert(user.id, account);
        Ok(user)
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&user.id)
            .filter(|a| a.user.restaurant_id == user.restaurant_id)
            .ok_or_else(|| AppError::not_found("User"))?;
        account.user = user.clone();
        Ok(user)
    }

    async fn delete_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .accounts
            .get(&user_id)
            .is_some_and(|a| a.user.restaurant_id == restaurant_id);
        if owned {
            tables.accounts.remove(&user_id);
            tables.refresh_tokens.retain(|_, t| t.user_id != user_id);
        }
        Ok(owned)
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        tables.refresh_tokens.insert(
            token_hash,
            RefreshToken {
                user_id,
                expires_at,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn consume_refresh_token(&self, token_hash: &str) -> AppResult<Option<Uuid>> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        Ok(match tables.refresh_tokens.get_mut(token_hash) {
            Some(token) if !token.revoked && token.expires_at > now => {
                token.revoked = true;
                Some(token.user_id)
            }
            _ => None,
        })
    }

    // ------------------------------------------------------------------
    // Inventory items
    // ------------------------------------------------------------------

    async fn list_items(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<InventoryItem> = tables
            .items
            .values()
            .filter(|i| i.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_item(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<Option<InventoryItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .items
            .get(&item_id)
            .filter(|i| i.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn insert_item(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_item(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .items
            .get_mut(&item.id)
            .filter(|i| i.restaurant_id == item.restaurant_id)
            .ok_or_else(|| AppError::not_found("Inventory item"))?;
        let current_stock = stored.current_stock;
        *stored = InventoryItem {
            current_stock,
            ..item
        };
        Ok(stored.clone())
    }

    async fn delete_item(&self, restaurant_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .items
            .get(&item_id)
            .is_some_and(|i| i.restaurant_id == restaurant_id);
        if owned {
            tables.items.remove(&item_id);
        }
        Ok(owned)
    }

    async fn item_references(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<ItemReferences> {
        let tables = self.tables.read().await;
        let transactions = tables
            .transactions
            .iter()
            .filter(|t| t.restaurant_id == restaurant_id && t.item_id == item_id)
            .count() as i64;
        let alerts = tables
            .alerts
            .iter()
            .filter(|a| a.restaurant_id == restaurant_id && a.item_id == item_id)
            .count() as i64;
        let recipes = tables
            .recipes
            .values()
            .filter(|r| r.restaurant_id == restaurant_id && r.status != RecipeStatus::Removed)
            .filter(|r| r.ingredients().iter().any(|i| i.inventory_item_id == item_id))
            .count() as i64;
        Ok(ItemReferences {
            transactions,
            alerts,
            recipes,
        })
    }

    // ------------------------------------------------------------------
    // Stock transactions
    // ------------------------------------------------------------------

    async fn list_transactions(
        &self,
        restaurant_id: Uuid,
        item_id: Option<Uuid>,
    ) -> AppResult<Vec<StockTransaction>> {
        let tables = self.tables.read().await;
        let rows = tables
            .transactions
            .iter()
            .filter(|t| t.restaurant_id == restaurant_id)
            .filter(|t| item_id.map_or(true, |id| t.item_id == id))
            .cloned()
            .collect();
        Ok(newest_first(rows, |t| t.created_at))
    }

    async fn get_transaction(
        &self,
        restaurant_id: Uuid,
        transaction_id: Uuid,
    ) -> AppResult<Option<StockTransaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .iter()
            .find(|t| t.id == transaction_id && t.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn apply_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement> {
        let mut tables = self.tables.write().await;
        if tables.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(AppError::DuplicateEntry("transaction id".to_string()));
        }
        let (item, alert) = tables.move_stock(
            transaction.restaurant_id,
            transaction.item_id,
            transaction.signed_quantity(),
        )?;
        tables.transactions.push(transaction.clone());
        Ok(StockMovement {
            transaction,
            item,
            alert,
        })
    }

    async fn amend_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement> {
        let mut tables = self.tables.write().await;
        let index = tables
            .transactions
            .iter()
            .position(|t| t.id == transaction.id && t.restaurant_id == transaction.restaurant_id)
            .ok_or_else(|| AppError::not_found("Stock transaction"))?;

        let delta = amendment_delta(&tables.transactions[index], &transaction)?;
        let (item, alert) =
            tables.move_stock(transaction.restaurant_id, transaction.item_id, delta)?;
        tables.transactions[index] = transaction.clone();

        Ok(StockMovement {
            transaction,
            item,
            alert,
        })
    }

    // ------------------------------------------------------------------
    // Suppliers
    // ------------------------------------------------------------------

    async fn list_suppliers(&self, restaurant_id: Uuid) -> AppResult<Vec<Supplier>> {
        let tables = self.tables.read().await;
        let mut suppliers: Vec<Supplier> = tables
            .suppliers
            .values()
            .filter(|s| s.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn get_supplier(
        &self,
        restaurant_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<Option<Supplier>> {
        let tables = self.tables.read().await;
        Ok(tables
            .suppliers
            .get(&supplier_id)
            .filter(|s| s.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn insert_supplier(&self, supplier: Supplier) -> AppResult<Supplier> {
        let mut tables = self.tables.write().await;
        tables.suppliers.insert(supplier.id, supplier.clone());
        Ok(supplier)
    }

    async fn update_supplier(&self, supplier: Supplier) -> AppResult<Supplier> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .suppliers
            .get_mut(&supplier.id)
            .filter(|s| s.restaurant_id == supplier.restaurant_id)
            .ok_or_else(|| AppError::not_found("Supplier"))?;
        *stored = supplier.clone();
        Ok(supplier)
    }

    async fn delete_supplier(&self, restaurant_id: Uuid, supplier_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .suppliers
            .get(&supplier_id)
            .is_some_and(|s| s.restaurant_id == restaurant_id);
        if owned {
            tables.suppliers.remove(&supplier_id);
        }
        Ok(owned)
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    async fn list_alerts(&self, restaurant_id: Uuid, unread_only: bool) -> AppResult<Vec<Alert>> {
        let tables = self.tables.read().await;
        let rows = tables
            .alerts
            .iter()
            .filter(|a| a.restaurant_id == restaurant_id && (!unread_only || !a.is_read))
            .cloned()
            .collect();
        Ok(newest_first(rows, |a| a.created_at))
    }

    async fn set_alert_read(
        &self,
        restaurant_id: Uuid,
        alert_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<Alert>> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id && a.restaurant_id == restaurant_id)
            .map(|alert| {
                alert.is_read = is_read;
                alert.clone()
            }))
    }

    async fn mark_all_alerts_read(&self, restaurant_id: Uuid) -> AppResult<u64> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for alert in tables
            .alerts
            .iter_mut()
            .filter(|a| a.restaurant_id == restaurant_id && !a.is_read)
        {
            alert.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    async fn list_recipes(&self, restaurant_id: Uuid) -> AppResult<Vec<Recipe>> {
        let tables = self.tables.read().await;
        let mut recipes: Vec<Recipe> = tables
            .recipes
            .values()
            .filter(|r| r.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes)
    }

    async fn get_recipe(&self, restaurant_id: Uuid, recipe_id: Uuid) -> AppResult<Option<Recipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .get(&recipe_id)
            .filter(|r| r.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn insert_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        let mut tables = self.tables.write().await;
        tables.recipes.insert(recipe.id, recipe.clone());
        Ok(recipe)
    }

    async fn update_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .recipes
            .get_mut(&recipe.id)
            .filter(|r| r.restaurant_id == recipe.restaurant_id)
            .ok_or_else(|| AppError::not_found("Recipe"))?;
        *stored = recipe.clone();
        Ok(recipe)
    }

    // ------------------------------------------------------------------
    // Sales
    // ------------------------------------------------------------------

    async fn list_sales(&self, restaurant_id: Uuid) -> AppResult<Vec<Sale>> {
        let tables = self.tables.read().await;
        let mut sales: Vec<Sale> = tables
            .sales
            .values()
            .filter(|s| s.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        sales.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(sales)
    }

    async fn get_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<Option<Sale>> {
        let tables = self.tables.read().await;
        Ok(tables
            .sales
            .get(&sale_id)
            .filter(|s| s.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn insert_sale(&self, sale: Sale) -> AppResult<Sale> {
        let mut tables = self.tables.write().await;
        tables.sales.insert(sale.id, sale.clone());
        Ok(sale)
    }

    async fn update_sale(&self, sale: Sale) -> AppResult<Sale> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .sales
            .get_mut(&sale.id)
            .filter(|s| s.restaurant_id == sale.restaurant_id)
            .ok_or_else(|| AppError::not_found("Sale"))?;
        *stored = sale.clone();
        Ok(sale)
    }

    async fn delete_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let owned = tables
            .sales
            .get(&sale_id)
            .is_some_and(|s| s.restaurant_id == restaurant_id);
        if owned {
            tables.sales.remove(&sale_id);
        }
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::{ItemCategory, TransactionReason, TransactionType, Unit};

    fn item(restaurant_id: Uuid, stock: i64, threshold: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            restaurant_id,
            name: "Milk".to_string(),
            category: ItemCategory::Dairy,
            unit: Unit::L,
            cost_per_unit: Decimal::ONE,
            current_stock: Decimal::from(stock),
            min_threshold: Decimal::from(threshold),
            supplier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn out(item: &InventoryItem, qty: i64) -> StockTransaction {
        StockTransaction {
            id: Uuid::new_v4(),
            restaurant_id: item.restaurant_id,
            item_id: item.id,
            transaction_type: TransactionType::Out,
            quantity: Decimal::from(qty),
            reason: TransactionReason::Waste,
            cost: None,
            sku: None,
            notes: None,
            user_id: Uuid::nil(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn applying_a_drop_raises_one_alert() {
        let repo = InMemoryRepository::new();
        let milk = repo.insert_item(item(Uuid::new_v4(), 10, 5)).await.unwrap();

        let first = repo.apply_transaction(out(&milk, 6)).await.unwrap();
        assert_eq!(first.item.current_stock, Decimal::from(4));
        assert!(first.alert.is_some());

        let second = repo.apply_transaction(out(&milk, 1)).await.unwrap();
        assert!(second.alert.is_none());
        assert_eq!(repo.list_alerts(milk.restaurant_id, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn items_are_tenant_scoped() {
        let repo = InMemoryRepository::new();
        let milk = repo.insert_item(item(Uuid::new_v4(), 10, 5)).await.unwrap();

        assert!(repo.get_item(Uuid::new_v4(), milk.id).await.unwrap().is_none());
        assert!(!repo.delete_item(Uuid::new_v4(), milk.id).await.unwrap());

        let mut foreign = out(&milk, 1);
        foreign.restaurant_id = Uuid::new_v4();
        assert!(repo.apply_transaction(foreign).await.is_err());
    }

    #[tokio::test]
    async fn amending_moves_stock_by_the_delta() {
        let repo = InMemoryRepository::new();
        let milk = repo.insert_item(item(Uuid::new_v4(), 10, 0)).await.unwrap();
        let mut txn = repo.apply_transaction(out(&milk, 2)).await.unwrap().transaction;

        txn.quantity = Decimal::from(5);
        let movement = repo.amend_transaction(txn).await.unwrap();

        assert_eq!(movement.item.current_stock, Decimal::from(5));
    }

    #[tokio::test]
    async fn refresh_tokens_are_single_use() {
        let repo = InMemoryRepository::new();
        let user_id = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        repo.store_refresh_token(user_id, "hash".to_string(), expires_at)
            .await
            .unwrap();

        assert_eq!(repo.consume_refresh_token("hash").await.unwrap(), Some(user_id));
        assert_eq!(repo.consume_refresh_token("hash").await.unwrap(), None);
    }
}
