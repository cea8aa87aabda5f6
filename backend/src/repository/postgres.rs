//! PostgreSQL repository
//!
//! Enum-valued columns are stored as TEXT and parsed back through the shared
//! `FromStr` impls, so an unexpected value surfaces as an internal error
//! instead of a silent default.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    Alert, AlertType, InventoryItem, ItemCategory, Recipe, RecipeContent, RecipeStatus,
    RecipeUnit, Restaurant, Role, Sale, StockTransaction, Supplier, TransactionReason,
    TransactionType, Unit, UnknownVariant, User,
};

use super::{
    alert_for_change, amendment_delta, shifted_stock, ItemReferences, Repository, StockMovement,
    UserAccount,
};
use crate::error::{AppError, AppResult};

/// Repository backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgRepository {
    db: PgPool,
}

impl PgRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn parse<T: FromStr<Err = UnknownVariant>>(value: &str) -> AppResult<T> {
    T::from_str(value).map_err(|e| AppError::Internal(format!("Corrupt row: {}", e)))
}

fn parse_opt<T: FromStr<Err = UnknownVariant>>(value: Option<String>) -> AppResult<Option<T>> {
    value.as_deref().map(parse).transpose()
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    restaurant_id: Uuid,
    email: String,
    full_name: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_account(self) -> AppResult<UserAccount> {
        Ok(UserAccount {
            user: User {
                id: self.id,
                restaurant_id: self.restaurant_id,
                email: self.email,
                full_name: self.full_name,
                role: parse::<Role>(&self.role)?,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            password_hash: self.password_hash,
        })
    }

    fn into_user(self) -> AppResult<User> {
        self.into_account().map(|account| account.user)
    }
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    category: String,
    unit: String,
    cost_per_unit: Decimal,
    current_stock: Decimal,
    min_threshold: Decimal,
    supplier_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> AppResult<Self> {
        Ok(InventoryItem {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            category: parse::<ItemCategory>(&row.category)?,
            unit: parse::<Unit>(&row.unit)?,
            cost_per_unit: row.cost_per_unit,
            current_stock: row.current_stock,
            min_threshold: row.min_threshold,
            supplier_id: row.supplier_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    restaurant_id: Uuid,
    item_id: Uuid,
    transaction_type: String,
    quantity: Decimal,
    reason: String,
    cost: Option<Decimal>,
    sku: Option<String>,
    notes: Option<String>,
    user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for StockTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> AppResult<Self> {
        Ok(StockTransaction {
            id: row.id,
            restaurant_id: row.restaurant_id,
            item_id: row.item_id,
            transaction_type: parse::<TransactionType>(&row.transaction_type)?,
            quantity: row.quantity,
            reason: parse::<TransactionReason>(&row.reason)?,
            cost: row.cost,
            sku: row.sku,
            notes: row.notes,
            user_id: row.user_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SupplierRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    contact_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            contact_name: row.contact_name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    restaurant_id: Uuid,
    item_id: Uuid,
    alert_type: String,
    message: String,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = AppError;

    fn try_from(row: AlertRow) -> AppResult<Self> {
        Ok(Alert {
            id: row.id,
            restaurant_id: row.restaurant_id,
            item_id: row.item_id,
            alert_type: parse::<AlertType>(&row.alert_type)?,
            message: row.message,
            is_read: row.is_read,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    quantity: Option<Decimal>,
    unit: Option<String>,
    status: String,
    content: Json<RecipeContent>,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<RecipeRow> for Recipe {
    type Error = AppError;

    fn try_from(row: RecipeRow) -> AppResult<Self> {
        Ok(Recipe {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            quantity: row.quantity,
            unit: parse_opt::<RecipeUnit>(row.unit)?,
            status: parse::<RecipeStatus>(&row.status)?,
            content: row.content.0,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    restaurant_id: Uuid,
    recipe_id: Uuid,
    quantity: Decimal,
    inventory_updated: bool,
    receipt_id: Option<String>,
    created_by: Uuid,
    updated_by: Uuid,
    created_at: i64,
    updated_at: i64,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            restaurant_id: row.restaurant_id,
            recipe_id: row.recipe_id,
            quantity: row.quantity,
            inventory_updated: row.inventory_updated,
            receipt_id: row.receipt_id,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn collect<R, T>(rows: Vec<R>) -> AppResult<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const USER_COLUMNS: &str =
    "id, restaurant_id, email, full_name, role, password_hash, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, restaurant_id, name, category, unit, cost_per_unit, current_stock, \
     min_threshold, supplier_id, created_at, updated_at";
const TRANSACTION_COLUMNS: &str = "id, restaurant_id, item_id, transaction_type, quantity, reason, \
     cost, sku, notes, user_id, created_at";
const SUPPLIER_COLUMNS: &str =
    "id, restaurant_id, name, contact_name, email, phone, address, notes, created_at, updated_at";
/// Every column a stock transaction amendment may change
const AMEND_TRANSACTION_SQL: &str = "UPDATE stock_transactions \
     SET transaction_type = $1, quantity = $2, reason = $3, notes = $4, cost = $5, sku = $6 \
     WHERE id = $7";
const ALERT_COLUMNS: &str = "id, restaurant_id, item_id, alert_type, message, is_read, created_at";
const RECIPE_COLUMNS: &str = "id, restaurant_id, name, quantity, unit, status, content, \
     created_by, updated_by, created_at, updated_at";
const SALE_COLUMNS: &str = "id, restaurant_id, recipe_id, quantity, inventory_updated, receipt_id, \
     created_by, updated_by, created_at, updated_at";

/// An UPDATE that matched no row means the record is gone or belongs elsewhere
fn ensure_affected(rows: u64, resource: &str) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::not_found(resource));
    }
    Ok(())
}

impl PgRepository {
    /// Lock the item row, move its stock and record any alert, all within `tx`
    async fn move_stock(
        tx: &mut Transaction<'_, Postgres>,
        restaurant_id: Uuid,
        item_id: Uuid,
        delta: Decimal,
    ) -> AppResult<(InventoryItem, Option<Alert>)> {
        let before: InventoryItem = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE id = $1 AND restaurant_id = $2 FOR UPDATE"
        ))
        .bind(item_id)
        .bind(restaurant_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory item"))?
        .try_into()?;
        let current_stock = shifted_stock(before.current_stock, delta)?;

        let after: InventoryItem = sqlx::query_as::<_, ItemRow>(&format!(
            "UPDATE inventory_items SET current_stock = $1, updated_at = NOW() \
             WHERE id = $2 RETURNING {ITEM_COLUMNS}"
        ))
        .bind(current_stock)
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await?
        .try_into()?;

        let alert = alert_for_change(&before, &after);
        if let Some(alert) = &alert {
            sqlx::query(
                r#"
                INSERT INTO alerts (id, restaurant_id, item_id, alert_type, message, is_read, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(alert.id)
            .bind(alert.restaurant_id)
            .bind(alert.item_id)
            .bind(alert.alert_type.as_str())
            .bind(&alert.message)
            .bind(alert.is_read)
            .bind(alert.created_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok((after, alert))
    }
}

#[async_trait]
impl Repository for PgRepository {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Restaurants, users and sessions
    // ------------------------------------------------------------------

    async fn insert_restaurant(&self, restaurant: Restaurant) -> AppResult<Restaurant> {
        sqlx::query("INSERT INTO restaurants (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(restaurant.id)
            .bind(&restaurant.name)
            .bind(restaurant.created_at)
            .execute(&self.db)
            .await?;
        Ok(restaurant)
    }

    async fn find_account_by_email(&self, email: &str) -> AppResult<Option<UserAccount>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .map(UserRow::into_account)
        .transpose()
    }

    async fn find_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .map(UserRow::into_user)
        .transpose()
    }

    async fn get_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(user_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .map(UserRow::into_user)
        .transpose()
    }

    async fn list_users(&self, restaurant_id: Uuid) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM user_profiles WHERE restaurant_id = $1 ORDER BY full_name"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(UserRow::into_user)
        .collect()
    }

    async fn insert_user(&self, account: UserAccount) -> AppResult<User> {
        let user = account.user;
        let result = sqlx::query(
            r#"
            INSERT INTO user_profiles (id, restaurant_id, email, full_name, role, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(user.restaurant_id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(&account.password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::DuplicateEntry("email".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_user(&self, user: User) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE user_profiles SET full_name = $1, role = $2, updated_at = $3
            WHERE id = $4 AND restaurant_id = $5
            "#,
        )
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.updated_at)
        .bind(user.id)
        .bind(user.restaurant_id)
        .execute(&self.db)
        .await?;
        ensure_affected(result.rows_affected(), "User")?;
        Ok(user)
    }

    async fn delete_user(&self, restaurant_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1 AND restaurant_id = $2")
            .bind(user_id)
            .bind(restaurant_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: String,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn consume_refresh_token(&self, token_hash: &str) -> AppResult<Option<Uuid>> {
        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE refresh_tokens SET revoked_at = NOW()
            WHERE token_hash = $1 AND revoked_at IS NULL AND expires_at > NOW()
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.db)
        .await?;
        Ok(user_id)
    }

    // ------------------------------------------------------------------
    // Inventory items
    // ------------------------------------------------------------------

    async fn list_items(&self, restaurant_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE restaurant_id = $1 ORDER BY name"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;
        collect(rows)
    }

    async fn get_item(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<Option<InventoryItem>> {
        sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(item_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .map(InventoryItem::try_from)
        .transpose()
    }

    async fn insert_item(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        sqlx::query(
            r#"
            INSERT INTO inventory_items
                (id, restaurant_id, name, category, unit, cost_per_unit, current_stock,
                 min_threshold, supplier_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(item.id)
        .bind(item.restaurant_id)
        .bind(&item.name)
        .bind(item.category.as_str())
        .bind(item.unit.as_str())
        .bind(item.cost_per_unit)
        .bind(item.current_stock)
        .bind(item.min_threshold)
        .bind(item.supplier_id)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.db)
        .await?;
        Ok(item)
    }

    async fn update_item(&self, item: InventoryItem) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE inventory_items
            SET name = $1, category = $2, unit = $3, cost_per_unit = $4,
                min_threshold = $5, supplier_id = $6, updated_at = $7
            WHERE id = $8 AND restaurant_id = $9
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(&item.name)
        .bind(item.category.as_str())
        .bind(item.unit.as_str())
        .bind(item.cost_per_unit)
        .bind(item.min_threshold)
        .bind(item.supplier_id)
        .bind(item.updated_at)
        .bind(item.id)
        .bind(item.restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Inventory item"))?
        .try_into()
    }

    async fn delete_item(&self, restaurant_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM inventory_items WHERE id = $1 AND restaurant_id = $2")
                .bind(item_id)
                .bind(restaurant_id)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn item_references(
        &self,
        restaurant_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<ItemReferences> {
        let (transactions, alerts, recipes) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM stock_transactions WHERE item_id = $1 AND restaurant_id = $2),
                (SELECT COUNT(*) FROM alerts WHERE item_id = $1 AND restaurant_id = $2),
                (SELECT COUNT(*) FROM recipes
                  WHERE restaurant_id = $2 AND status <> 'Removed'
                    AND content->'ingredients' @> jsonb_build_array(
                        jsonb_build_object('inventory_item_id', $1::text)))
            "#,
        )
        .bind(item_id)
        .bind(restaurant_id)
        .fetch_one(&self.db)
        .await?;

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
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {TRANSACTION_COLUMNS} FROM stock_transactions
            WHERE restaurant_id = $1 AND ($2::uuid IS NULL OR item_id = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(restaurant_id)
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;
        collect(rows)
    }

    async fn get_transaction(
        &self,
        restaurant_id: Uuid,
        transaction_id: Uuid,
    ) -> AppResult<Option<StockTransaction>> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM stock_transactions WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(transaction_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .map(StockTransaction::try_from)
        .transpose()
    }

    async fn apply_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;

        let (item, alert) = Self::move_stock(
            &mut tx,
            transaction.restaurant_id,
            transaction.item_id,
            transaction.signed_quantity(),
        )
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO stock_transactions
                (id, restaurant_id, item_id, transaction_type, quantity, reason, cost, sku, notes, user_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(transaction.id)
        .bind(transaction.restaurant_id)
        .bind(transaction.item_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.quantity)
        .bind(transaction.reason.as_str())
        .bind(transaction.cost)
        .bind(&transaction.sku)
        .bind(&transaction.notes)
        .bind(transaction.user_id)
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::DuplicateEntry("transaction id".to_string()));
            }
            other => {
                other?;
            }
        }

        tx.commit().await?;

        Ok(StockMovement {
            transaction,
            item,
            alert,
        })
    }

    async fn amend_transaction(&self, transaction: StockTransaction) -> AppResult<StockMovement> {
        let mut tx = self.db.begin().await?;

        let previous: StockTransaction = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM stock_transactions \
             WHERE id = $1 AND restaurant_id = $2 FOR UPDATE"
        ))
        .bind(transaction.id)
        .bind(transaction.restaurant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Stock transaction"))?
        .try_into()?;

        let delta = amendment_delta(&previous, &transaction)?;
        let (item, alert) =
            Self::move_stock(&mut tx, transaction.restaurant_id, transaction.item_id, delta).await?;

        sqlx::query(AMEND_TRANSACTION_SQL)
            .bind(transaction.transaction_type.as_str())
            .bind(transaction.quantity)
            .bind(transaction.reason.as_str())
            .bind(&transaction.notes)
            .bind(transaction.cost)
            .bind(&transaction.sku)
            .bind(transaction.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

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
        let rows = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE restaurant_id = $1 ORDER BY name"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    async fn get_supplier(
        &self,
        restaurant_id: Uuid,
        supplier_id: Uuid,
    ) -> AppResult<Option<Supplier>> {
        let row = sqlx::query_as::<_, SupplierRow>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(supplier_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Supplier::from))
    }

    async fn insert_supplier(&self, supplier: Supplier) -> AppResult<Supplier> {
        sqlx::query(
            r#"
            INSERT INTO suppliers
                (id, restaurant_id, name, contact_name, email, phone, address, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(supplier.id)
        .bind(supplier.restaurant_id)
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.notes)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.db)
        .await?;
        Ok(supplier)
    }

    async fn update_supplier(&self, supplier: Supplier) -> AppResult<Supplier> {
        let result = sqlx::query(
            r#"
            UPDATE suppliers
            SET name = $1, contact_name = $2, email = $3, phone = $4, address = $5, notes = $6, updated_at = $7
            WHERE id = $8 AND restaurant_id = $9
            "#,
        )
        .bind(&supplier.name)
        .bind(&supplier.contact_name)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(&supplier.address)
        .bind(&supplier.notes)
        .bind(supplier.updated_at)
        .bind(supplier.id)
        .bind(supplier.restaurant_id)
        .execute(&self.db)
        .await?;
        ensure_affected(result.rows_affected(), "Supplier")?;
        Ok(supplier)
    }

    async fn delete_supplier(&self, restaurant_id: Uuid, supplier_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = $1 AND restaurant_id = $2")
            .bind(supplier_id)
            .bind(restaurant_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    async fn list_alerts(&self, restaurant_id: Uuid, unread_only: bool) -> AppResult<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS} FROM alerts
            WHERE restaurant_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC
            "#
        ))
        .bind(restaurant_id)
        .bind(unread_only)
        .fetch_all(&self.db)
        .await?;
        collect(rows)
    }

    async fn set_alert_read(
        &self,
        restaurant_id: Uuid,
        alert_id: Uuid,
        is_read: bool,
    ) -> AppResult<Option<Alert>> {
        sqlx::query_as::<_, AlertRow>(&format!(
            "UPDATE alerts SET is_read = $1 WHERE id = $2 AND restaurant_id = $3 RETURNING {ALERT_COLUMNS}"
        ))
        .bind(is_read)
        .bind(alert_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .map(Alert::try_from)
        .transpose()
    }

    async fn mark_all_alerts_read(&self, restaurant_id: Uuid) -> AppResult<u64> {
        let result =
            sqlx::query("UPDATE alerts SET is_read = TRUE WHERE restaurant_id = $1 AND NOT is_read")
                .bind(restaurant_id)
                .execute(&self.db)
                .await?;
        Ok(result.rows_affected())
    }

    // ------------------------------------------------------------------
    // Recipes
    // ------------------------------------------------------------------

    async fn list_recipes(&self, restaurant_id: Uuid) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE restaurant_id = $1 ORDER BY name"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;
        collect(rows)
    }

    async fn get_recipe(&self, restaurant_id: Uuid, recipe_id: Uuid) -> AppResult<Option<Recipe>> {
        sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(recipe_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?
        .map(Recipe::try_from)
        .transpose()
    }

    async fn insert_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        sqlx::query(
            r#"
            INSERT INTO recipes
                (id, restaurant_id, name, quantity, unit, status, content, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(recipe.id)
        .bind(recipe.restaurant_id)
        .bind(&recipe.name)
        .bind(recipe.quantity)
        .bind(recipe.unit.map(|u| u.as_str()))
        .bind(recipe.status.as_str())
        .bind(Json(&recipe.content))
        .bind(recipe.created_by)
        .bind(recipe.updated_by)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&self.db)
        .await?;
        Ok(recipe)
    }

    async fn update_recipe(&self, recipe: Recipe) -> AppResult<Recipe> {
        let result = sqlx::query(
            r#"
            UPDATE recipes
            SET name = $1, quantity = $2, unit = $3, status = $4, content = $5, updated_by = $6, updated_at = $7
            WHERE id = $8 AND restaurant_id = $9
            "#,
        )
        .bind(&recipe.name)
        .bind(recipe.quantity)
        .bind(recipe.unit.map(|u| u.as_str()))
        .bind(recipe.status.as_str())
        .bind(Json(&recipe.content))
        .bind(recipe.updated_by)
        .bind(recipe.updated_at)
        .bind(recipe.id)
        .bind(recipe.restaurant_id)
        .execute(&self.db)
        .await?;
        ensure_affected(result.rows_affected(), "Recipe")?;
        Ok(recipe)
    }

    // ------------------------------------------------------------------
    // Sales
    // ------------------------------------------------------------------

    async fn list_sales(&self, restaurant_id: Uuid) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE restaurant_id = $1 ORDER BY created_at DESC"
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Sale::from).collect())
    }

    async fn get_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<Option<Sale>> {
        let row = sqlx::query_as::<_, SaleRow>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = $1 AND restaurant_id = $2"
        ))
        .bind(sale_id)
        .bind(restaurant_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Sale::from))
    }

    async fn insert_sale(&self, sale: Sale) -> AppResult<Sale> {
        sqlx::query(
            r#"
            INSERT INTO sales
                (id, restaurant_id, recipe_id, quantity, inventory_updated, receipt_id, created_by, updated_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(sale.id)
        .bind(sale.restaurant_id)
        .bind(sale.recipe_id)
        .bind(sale.quantity)
        .bind(sale.inventory_updated)
        .bind(&sale.receipt_id)
        .bind(sale.created_by)
        .bind(sale.updated_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&self.db)
        .await?;
        Ok(sale)
    }

    async fn update_sale(&self, sale: Sale) -> AppResult<Sale> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET recipe_id = $1, quantity = $2, inventory_updated = $3, receipt_id = $4, updated_by = $5, updated_at = $6
            WHERE id = $7 AND restaurant_id = $8
            "#,
        )
        .bind(sale.recipe_id)
        .bind(sale.quantity)
        .bind(sale.inventory_updated)
        .bind(&sale.receipt_id)
        .bind(sale.updated_by)
        .bind(sale.updated_at)
        .bind(sale.id)
        .bind(sale.restaurant_id)
        .execute(&self.db)
        .await?;
        ensure_affected(result.rows_affected(), "Sale")?;
        Ok(sale)
    }

    async fn delete_sale(&self, restaurant_id: Uuid, sale_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sales WHERE id = $1 AND restaurant_id = $2")
            .bind(sale_id)
            .bind(restaurant_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amendment_writes_every_editable_column() {
        let set_clause = AMEND_TRANSACTION_SQL
            .split("SET")
            .nth(1)
            .and_then(|rest| rest.split("WHERE").next())
            .unwrap();
        for column in ["transaction_type", "quantity", "reason", "notes", "cost", "sku"] {
            assert!(
                set_clause.contains(&format!("{column} = $")),
                "{column} missing from amendment"
            );
        }
        // one bind per assignment plus the id
        assert_eq!(AMEND_TRANSACTION_SQL.matches('$').count(), 7);
    }

    #[test]
    fn unmatched_update_is_not_found() {
        assert!(ensure_affected(1, "Sale").is_ok());
        assert!(matches!(
            ensure_affected(0, "Sale"),
            Err(AppError::NotFound(resource)) if resource == "Sale"
        ));
    }
}
