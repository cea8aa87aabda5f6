//! WASM bindings for the restaurant inventory platform
//!
//! Exposes the shared ability rules, stock arithmetic and offline cache to
//! the browser so the client gates its UI and counts stock with exactly the
//! logic the server enforces. Values cross the boundary as JSON strings.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    Action, Actor, InventoryItem, OfflineCache, Recipe, Role, StockTransaction, Subject,
};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("restaurant inventory module loaded"));
}

/// The signed-in user as the client knows it. Accepts a full profile too.
#[derive(Debug, Clone, Deserialize)]
struct Session {
    #[serde(alias = "user_id")]
    id: Uuid,
    restaurant_id: Uuid,
    role: Role,
}

impl Actor for Session {
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

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_session(json: &str) -> Result<Option<Session>, String> {
    if json.trim().is_empty() || json.trim() == "null" {
        return Ok(None);
    }
    serde_json::from_str(json).map_err(|e| format!("Invalid session: {}", e))
}

fn parse_action(action: &str) -> Result<Action, String> {
    serde_json::from_value(serde_json::Value::String(action.to_string()))
        .map_err(|_| format!("Unknown action: {}", action))
}

fn parse_subject(subject: &str) -> Result<Subject, String> {
    serde_json::from_value(serde_json::Value::String(subject.to_string()))
        .map_err(|_| format!("Unknown subject: {}", subject))
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|e| format!("Invalid amount '{}': {}", value, e))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("Invalid timestamp '{}': {}", value, e))
}

// chrono's clock is unavailable in the browser without extra features
fn browser_now() -> DateTime<Utc> {
    shared::from_epoch_millis(js_sys::Date::now() as i64).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ----------------------------------------------------------------------
// Abilities
// ----------------------------------------------------------------------

fn ability_rules(session_json: &str) -> Result<String, String> {
    let session = parse_session(session_json)?;
    let ability = shared::define_abilities_for(session.as_ref());
    serde_json::to_string(&ability).map_err(|e| e.to_string())
}

fn check_can(session_json: &str, action: &str, subject: &str) -> Result<bool, String> {
    let session = parse_session(session_json)?;
    let ability = shared::define_abilities_for(session.as_ref());
    Ok(ability.can(parse_action(action)?, parse_subject(subject)?))
}

fn check_fields(session_json: &str, subject: &str, fields_json: &str) -> Result<bool, String> {
    let session = parse_session(session_json)?;
    let fields: Vec<String> =
        serde_json::from_str(fields_json).map_err(|e| format!("Invalid field list: {}", e))?;
    Ok(shared::can_update_fields(
        session.as_ref(),
        parse_subject(subject)?,
        &fields,
    ))
}

fn check_transaction_window(
    session_json: &str,
    created_at: &str,
    now: DateTime<Utc>,
) -> Result<bool, String> {
    let session = parse_session(session_json)?;
    Ok(shared::can_update_transaction_at(
        session.as_ref(),
        parse_timestamp(created_at)?,
        now,
    ))
}

/// Serialized rule list for the given session (`null` for signed out)
#[wasm_bindgen]
pub fn abilities_for(session_json: &str) -> Result<String, JsValue> {
    ability_rules(session_json).map_err(js_error)
}

/// Whether the session may perform `action` on `subject`
#[wasm_bindgen]
pub fn can(session_json: &str, action: &str, subject: &str) -> Result<bool, JsValue> {
    check_can(session_json, action, subject).map_err(js_error)
}

/// Whether the session may change every field in the JSON array `fields_json`
#[wasm_bindgen]
pub fn can_update_fields(
    session_json: &str,
    subject: &str,
    fields_json: &str,
) -> Result<bool, JsValue> {
    check_fields(session_json, subject, fields_json).map_err(js_error)
}

/// Whether a transaction created at `created_at` (RFC 3339) is still editable
#[wasm_bindgen]
pub fn can_update_transaction(session_json: &str, created_at: &str) -> Result<bool, JsValue> {
    check_transaction_window(session_json, created_at, browser_now()).map_err(js_error)
}

// ----------------------------------------------------------------------
// Stock arithmetic
// ----------------------------------------------------------------------

fn parse_item(item_json: &str) -> Result<InventoryItem, String> {
    serde_json::from_str(item_json).map_err(|e| format!("Invalid inventory item: {}", e))
}

fn stock_balance(item_json: &str, transactions_json: &str) -> Result<String, String> {
    let item = parse_item(item_json)?;
    let transactions: Vec<StockTransaction> = serde_json::from_str(transactions_json)
        .map_err(|e| format!("Invalid transactions: {}", e))?;
    Ok(shared::calculate_stock_balance(&item, &transactions).to_string())
}

fn low_stock(item_json: &str) -> Result<bool, String> {
    parse_item(item_json).map(|item| shared::is_low_stock(&item))
}

fn item_alert_type(item_json: &str) -> Result<Option<String>, String> {
    let item = parse_item(item_json)?;
    Ok(shared::alert_type_for(&item).map(|t| t.as_str().to_string()))
}

fn depletion_preview(recipe_json: &str, sale_quantity: &str) -> Result<String, String> {
    let recipe: Recipe =
        serde_json::from_str(recipe_json).map_err(|e| format!("Invalid recipe: {}", e))?;
    let quantity = parse_decimal(sale_quantity)?;
    shared::validate_quantity(quantity)?;

    let depletions = shared::sale_depletions(&recipe, quantity)
        .ok_or_else(|| format!("Quantity is too large for {}", recipe.name))?;
    serde_json::to_string(&depletions).map_err(|e| e.to_string())
}

/// Everything in minus everything out for the item, from its transactions
#[wasm_bindgen]
pub fn calculate_stock_balance(
    item_json: &str,
    transactions_json: &str,
) -> Result<String, JsValue> {
    stock_balance(item_json, transactions_json).map_err(js_error)
}

#[wasm_bindgen]
pub fn is_low_stock(item_json: &str) -> Result<bool, JsValue> {
    low_stock(item_json).map_err(js_error)
}

/// `"low_stock"`, `"out_of_stock"`, or `undefined` when stock is healthy
#[wasm_bindgen]
pub fn alert_type_for(item_json: &str) -> Result<Option<String>, JsValue> {
    item_alert_type(item_json).map_err(js_error)
}

/// Ingredient quantities a sale of `sale_quantity` would consume
#[wasm_bindgen]
pub fn preview_sale_depletion(recipe_json: &str, sale_quantity: &str) -> Result<String, JsValue> {
    depletion_preview(recipe_json, sale_quantity).map_err(js_error)
}

#[wasm_bindgen]
pub fn format_currency(amount: &str) -> Result<String, JsValue> {
    parse_decimal(amount)
        .map(shared::format_currency)
        .map_err(js_error)
}

#[wasm_bindgen]
pub fn format_date(timestamp: &str) -> Result<String, JsValue> {
    parse_timestamp(timestamp)
        .map(shared::format_date)
        .map_err(js_error)
}

// ----------------------------------------------------------------------
// Offline cache
// ----------------------------------------------------------------------

/// Browser handle to the offline cache. The page persists `to_json()` in
/// local storage and restores it with `from_json`.
#[wasm_bindgen]
pub struct OfflineStore {
    cache: OfflineCache,
}

impl OfflineStore {
    fn restore(json: &str) -> Result<Self, String> {
        OfflineCache::from_json(json)
            .map(|cache| Self { cache })
            .map_err(|e| format!("Invalid offline cache: {}", e))
    }

    fn snapshot(&self) -> Result<String, String> {
        self.cache.to_json().map_err(|e| e.to_string())
    }

    fn load_items(&mut self, items_json: &str) -> Result<(), String> {
        let items: Vec<InventoryItem> =
            serde_json::from_str(items_json).map_err(|e| format!("Invalid items: {}", e))?;
        self.cache.replace_items(items);
        Ok(())
    }

    fn queue(&mut self, transaction_json: &str) -> Result<(), String> {
        let transaction: StockTransaction = serde_json::from_str(transaction_json)
            .map_err(|e| format!("Invalid transaction: {}", e))?;
        shared::validate_quantity(transaction.quantity)?;
        if !transaction
            .reason
            .allowed_for(transaction.transaction_type)
        {
            return Err(format!(
                "Reason '{}' is not valid for '{}' transactions",
                transaction.reason, transaction.transaction_type
            ));
        }
        self.cache
            .queue_transaction(transaction)
            .map_err(str::to_string)
    }

    fn pending(&self) -> Result<String, String> {
        serde_json::to_string(&self.cache.pending_transactions()).map_err(|e| e.to_string())
    }

    fn parse_id(id: &str) -> Result<Uuid, String> {
        Uuid::parse_str(id).map_err(|e| format!("Invalid id '{}': {}", id, e))
    }
}

#[wasm_bindgen]
impl OfflineStore {
    #[wasm_bindgen(constructor)]
    pub fn new() -> OfflineStore {
        OfflineStore {
            cache: OfflineCache::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<OfflineStore, JsValue> {
        Self::restore(json).map_err(js_error)
    }

    pub fn to_json(&self) -> Result<String, JsValue> {
        self.snapshot().map_err(js_error)
    }

    /// Replace cached items with a server snapshot, keeping queued work applied
    pub fn replace_items(&mut self, items_json: &str) -> Result<(), JsValue> {
        self.load_items(items_json).map_err(js_error)
    }

    pub fn items(&self) -> Result<String, JsValue> {
        let items: Vec<&InventoryItem> = self.cache.items().collect();
        serde_json::to_string(&items).map_err(js_error)
    }

    /// Record a stock transaction while offline
    pub fn queue_transaction(&mut self, transaction_json: &str) -> Result<(), JsValue> {
        self.queue(transaction_json).map_err(js_error)
    }

    /// Transactions the server has not acknowledged, oldest first
    pub fn pending_transactions(&self) -> Result<String, JsValue> {
        self.pending().map_err(js_error)
    }

    pub fn pending_count(&self) -> usize {
        self.cache.pending_transactions().len()
    }

    /// Flag a queued transaction as accepted by the server
    pub fn mark_synced(&mut self, transaction_id: &str) -> Result<bool, JsValue> {
        let id = Self::parse_id(transaction_id).map_err(js_error)?;
        Ok(self.cache.mark_synced(id))
    }

    pub fn unread_alert_count(&self) -> usize {
        self.cache.unread_alert_count()
    }

    pub fn mark_alert_read(&mut self, alert_id: &str) -> Result<bool, JsValue> {
        let id = Self::parse_id(alert_id).map_err(js_error)?;
        Ok(self.cache.mark_alert_read(id))
    }
}

impl Default for OfflineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    const RESTAURANT: &str = "8d1f5a3c-2b4e-4c6d-9e7f-0a1b2c3d4e5f";
    const ITEM: &str = "3f2e1d0c-9b8a-4765-8432-10fedcba9876";

    fn session(role: &str) -> String {
        json!({
            "id": "5b6c7d8e-1a2b-4c3d-8e9f-a0b1c2d3e4f5",
            "restaurant_id": RESTAURANT,
            "role": role,
        })
        .to_string()
    }

    fn item(stock: &str, threshold: &str) -> serde_json::Value {
        json!({
            "id": ITEM,
            "restaurant_id": RESTAURANT,
            "name": "Tomatoes",
            "category": "produce",
            "unit": "kg",
            "cost_per_unit": "2.50",
            "current_stock": stock,
            "min_threshold": threshold,
            "supplier_id": null,
            "created_at": "2024-01-05T10:00:00Z",
            "updated_at": "2024-01-05T10:00:00Z",
        })
    }

    fn transaction(id: &str, kind: &str, quantity: &str, reason: &str) -> serde_json::Value {
        json!({
            "id": id,
            "restaurant_id": RESTAURANT,
            "item_id": ITEM,
            "type": kind,
            "quantity": quantity,
            "reason": reason,
            "cost": null,
            "sku": null,
            "notes": null,
            "user_id": "5b6c7d8e-1a2b-4c3d-8e9f-a0b1c2d3e4f5",
            "created_at": "2024-01-05T12:00:00Z",
        })
    }

    #[test]
    fn test_staff_cannot_delete_items() {
        assert!(check_can(&session("staff"), "read", "InventoryItem").unwrap());
        assert!(!check_can(&session("staff"), "delete", "InventoryItem").unwrap());
        assert!(check_can(&session("manager"), "delete", "InventoryItem").unwrap());
    }

    #[test]
    fn test_signed_out_can_do_nothing() {
        assert!(!check_can("null", "read", "Alert").unwrap());
        assert_eq!(ability_rules("").unwrap(), r#"{"rules":[]}"#);
    }

    #[test]
    fn test_unknown_subject_is_an_error() {
        assert!(check_can(&session("staff"), "read", "Lot").is_err());
        assert!(check_can(&session("staff"), "fly", "Alert").is_err());
    }

    #[test]
    fn test_staff_field_policy() {
        let staff = session("staff");
        assert!(check_fields(&staff, "InventoryItem", r#"["name","current_stock"]"#).unwrap());
        assert!(!check_fields(&staff, "InventoryItem", r#"["cost_per_unit"]"#).unwrap());
        assert!(check_fields(&staff, "StockTransaction", r#"["quantity","notes"]"#).unwrap());
        assert!(!check_fields(&staff, "StockTransaction", r#"["cost"]"#).unwrap());
    }

    #[test]
    fn test_edit_window() {
        let created = "2024-01-05T12:00:00Z";
        let later = parse_timestamp(created).unwrap() + Duration::hours(25);
        assert!(!check_transaction_window(&session("staff"), created, later).unwrap());
        assert!(check_transaction_window(&session("manager"), created, later).unwrap());
    }

    #[test]
    fn test_stock_balance_and_alerts() {
        let item_json = item("10", "5").to_string();
        let transactions = json!([
            transaction("0a000000-0000-4000-8000-000000000001", "in", "4", "purchase"),
            transaction("0a000000-0000-4000-8000-000000000002", "out", "1.5", "waste"),
        ])
        .to_string();

        assert_eq!(stock_balance(&item_json, &transactions).unwrap(), "2.5");
        assert!(!low_stock(&item_json).unwrap());
        assert_eq!(
            item_alert_type(&item("0", "5").to_string()).unwrap().as_deref(),
            Some("out_of_stock")
        );
        assert_eq!(
            item_alert_type(&item("3", "5").to_string()).unwrap().as_deref(),
            Some("low_stock")
        );
    }

    fn recipe(yield_quantity: &str) -> String {
        json!({
            "id": "7c1d2e3f-4a5b-4c6d-8e9f-0a1b2c3d4e50",
            "restaurant_id": RESTAURANT,
            "name": "Salsa",
            "quantity": yield_quantity,
            "unit": "kg",
            "status": "Active",
            "content": {
                "ingredients": [{ "inventory_item_id": ITEM, "quantity": "2", "unit": "kg" }]
            },
            "created_by": "5b6c7d8e-1a2b-4c3d-8e9f-a0b1c2d3e4f5",
            "updated_by": "5b6c7d8e-1a2b-4c3d-8e9f-a0b1c2d3e4f5",
            "created_at": 1704448800000_i64,
            "updated_at": 1704448800000_i64,
        })
        .to_string()
    }

    #[test]
    fn test_depletion_preview() {
        let preview: serde_json::Value =
            serde_json::from_str(&depletion_preview(&recipe("5"), "10").unwrap()).unwrap();
        assert_eq!(preview[0]["item_id"], ITEM);
        assert_eq!(preview[0]["quantity"], "4");

        // a tiny yield pushes the multiplier past what a decimal can hold
        let err = depletion_preview(&recipe("0.0000000000000000000000000001"), "1000000");
        assert_eq!(err.unwrap_err(), "Quantity is too large for Salsa");
    }

    #[test]
    fn test_offline_store_queue_and_sync() {
        let mut store = OfflineStore::new();
        store
            .load_items(&json!([item("10", "5")]).to_string())
            .unwrap();

        let id = "0a000000-0000-4000-8000-000000000003";
        store
            .queue(&transaction(id, "out", "3", "waste").to_string())
            .unwrap();
        assert_eq!(store.pending_count(), 1);

        // wrong direction for the reason
        let bad = transaction("0a000000-0000-4000-8000-000000000004", "in", "1", "waste");
        assert!(store.queue(&bad.to_string()).is_err());

        let restored = OfflineStore::restore(&store.snapshot().unwrap()).unwrap();
        assert_eq!(restored.pending_count(), 1);

        store.cache.mark_synced(Uuid::parse_str(id).unwrap());
        assert_eq!(store.pending_count(), 0);
        assert_eq!(store.pending().unwrap(), "[]");
    }
}
