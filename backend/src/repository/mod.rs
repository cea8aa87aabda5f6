//! Data access for every table the platform stores
//!
//! Services talk to storage only through [`Repository`], so the same
//! business rules run against PostgreSQL in production and against the
//! seeded in-memory store in demo mode and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    alert_message, alert_on_change, Alert, InventoryItem, Recipe, Restaurant, Sale,
    StockTransaction, Supplier, User,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub mod demo;
pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// A user profile together with its login secret
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user: User,
    pub password_hash: String,
}

/// Records that prevent an inventory item from being deleted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemReferences {
    pub transactions: i64,
    pub alerts: i64,
    pub recipes: i64,
}

/// Result of applying a stock transaction to an item
#[derive(Debug, Clone, Serialize)]
pub struct StockMovement {
    pub transaction: StockTransaction,
    pub item: InventoryItem,
    /// Alert raised because this movement pushed the item into a worse state
    pub alert: Option<Alert>,
}

/// Storage operations, all scoped by restaurant
#[async_trait]
pub trait Repository: Send + Sync {
    /// Short name for health output
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> AppResult<()>;

    // ------------------------------------------------------------------
    // Restaurants, users and sessions
    // ------------------------------------------------------------------

    async fn insert_restaurant(&self, restaurant: Restaurant) -> AppResult<Restaurant>;

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<UserAccount>>;

    /// Look a user up by id regardless of tenant (token refresh)
    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    async fn get_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<Option<User>>;

    async fn list_users(&self, restaurant_id: Uuid) -> AppResult<Vec<User>>;

    async fn insert_user(&self, account: UserAccount) -> AppResult<User>;

    async fn update_user(&self, user: User) -> AppResult<User>;

    async fn delete_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<bool>;

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Revoke a refresh token and return its owner if it was still valid
    async fn consume_refresh_token(&self, token_hash: &str) -> AppResult<Option<Uuid>>;

    // ------------------------------------------------------------------
    // Inventory items
    // ------------------------------------------------------------------

    async fn list_items(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryItem>>;

    async fn get_item(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<Option<InventoryItem>>;

    async fn insert_item(&self, item: InventoryItem) -> AppResult<InventoryItem>;

    /// Overwrite an item's descriptive fields. Stock only changes through transactions.
    async fn update_item(&self, item: InventoryItem) -> AppResult<InventoryItem>;

    async fn delete_item(&self, restaurant_id: Uuid, item_id: Uuid) -> AppResult<bool>;

    async fn item_references(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<ItemReferences>;

    // ------------------------------------------------------------------
    // Stock transactions
    // ------------------------------------------------------------------

    async fn list_transactions(
        &self,
        restaurant_id: Uuid,
        item_id: Option<Uuid>,
    ) -> AppResult<Vec<StockTransaction>>;

    async fn get_transaction(
        &self,
        restaurant_id: Uuid,
        transaction_id: Uuid,
    ) -> AppResult<Option<StockTransaction>>;

    /// Append a transaction, move the item's stock by its signed quantity
    /// and raise an alert when the new level warrants one.
    async fn apply_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement>;

    /// Replace a transaction and move the item's stock by the difference
    /// between the old and new signed quantities.
    async fn amend_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement>;

    // ------------------------------------------------------------------
    // Suppliers
    // ------------------------------------------------------------------

    async fn list_suppliers(&self, restaurant_id: Uuid) -> AppResult<Vec<Supplier>>;

    async fn get_supplier(
        &self,
        restaurant_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<Option<Supplier>>;

    async fn insert_supplier(&self, supplier: Supplier) -> AppResult<Supplier>;

    async fn update_supplier(&self, supplier: Supplier) -> AppResult<Supplier>;

    async fn delete_supplier(&self, restaurant_id: Uuid, supplier_id: Uuid) -> AppResult<bool>;

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    async fn list_alerts(&self, restaurant_id: Uuid, unread_only: bool) -> AppResult<Vec<Alert>>;

    async fn set_alert_read(
        &self,
        restaurant_id: Uuid,
        alert_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<Alert>>;

    /// Returns how many alerts changed
    async fn mark_all_alerts_read(&self, restaurant_id: Uuid) -> AppResult<u64>;

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    async fn list_recipes(&self, restaurant_id: Uuid) -> AppResult<Vec<Recipe>>;

    async fn get_recipe(&self, restaurant_id: Uuid, recipe_id: Uuid) -> AppResult<Option<Recipe>>;

    async fn insert_recipe(&self, recipe: Recipe) -> AppResult<Recipe>;

    async fn update_recipe(&self, recipe: Recipe) -> AppResult<Recipe>;

    // ------------------------------------------------------------------
    // Sales
    // ------------------------------------------------------------------

    async fn list_sales(&self, restaurant_id: Uuid) -> AppResult<Vec<Sale>>;

    async fn get_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<Option<Sale>>;

    async fn insert_sale(&self, sale: Sale) -> AppResult<Sale>;

    async fn update_sale(&self, sale: Sale) -> AppResult<Sale>;

    async fn delete_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<bool>;
}

/// Build the alert row a stock change calls for, if any
pub(crate) fn alert_for_change(before: &InventoryItem, after: &InventoryItem) -> Option<Alert> {
    alert_on_change(before, after).map(|alert_type| Alert {
        id: Uuid::new_v4(),
        restaurant_id: after.restaurant_id,
        item_id: after.id,
        alert_type,
        message: alert_message(after, alert_type),
        is_read: false,
        created_at: Utc::now(),
    })
}

/// Stock after applying `delta`, refusing values a decimal cannot hold
pub(crate) fn shifted_stock(current: Decimal, delta: Decimal) -> AppResult<Decimal> {
    current.checked_add(delta).ok_or_else(stock_out_of_range)
}

/// Net stock change from replacing `previous` with `amended`
pub(crate) fn amendment_delta(
    previous: &StockTransaction,
    amended: &StockTransaction,
) -> AppResult<Decimal> {
    amended
        .signed_quantity()
        .checked_sub(previous.signed_quantity())
        .ok_or_else(stock_out_of_range)
}

fn stock_out_of_range() -> AppError {
    AppError::validation("quantity", "Stock level would be out of range")
}
