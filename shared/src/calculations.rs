//! Inventory arithmetic and presentation helpers

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AlertType, InventoryItem, Recipe, RecipeUnit, StockTransaction};

/// Balance of an item derived from the ledger: everything in minus everything out.
///
/// Transactions for other items are ignored; order does not matter.
pub fn calculate_stock_balance(item: &InventoryItem, transactions: &[StockTransaction]) -> Decimal {
    ledger_balance(item.id, transactions)
}

/// [`calculate_stock_balance`] keyed by item id
pub fn ledger_balance(item_id: Uuid, transactions: &[StockTransaction]) -> Decimal {
    transactions
        .iter()
        .filter(|t| t.item_id == item_id)
        .map(StockTransaction::signed_quantity)
        .sum()
}

/// Stock at or below the threshold counts as low
pub fn is_low_stock(item: &InventoryItem) -> bool {
    item.current_stock <= item.min_threshold
}

/// Which alert, if any, an item's current stock warrants
pub fn alert_type_for(item: &InventoryItem) -> Option<AlertType> {
    if item.current_stock <= Decimal::ZERO {
        Some(AlertType::OutOfStock)
    } else if is_low_stock(item) {
        Some(AlertType::LowStock)
    } else {
        None
    }
}

/// The alert a stock decrease newly warrants.
///
/// Only a drop that moves the item into a worse alert state raises one, so
/// repeated sales of an already-low item do not flood the alert list.
pub fn alert_on_change(before: &InventoryItem, after: &InventoryItem) -> Option<AlertType> {
    if after.current_stock >= before.current_stock {
        return None;
    }
    let now = alert_type_for(after)?;
    if alert_type_for(before) == Some(now) {
        None
    } else {
        Some(now)
    }
}

pub fn alert_message(item: &InventoryItem, alert_type: AlertType) -> String {
    match alert_type {
        AlertType::OutOfStock => format!("{} is out of stock", item.name),
        AlertType::LowStock => format!(
            "{} is running low: {} {} left (minimum {} {})",
            item.name,
            item.current_stock.normalize(),
            item.unit,
            item.min_threshold.normalize(),
            item.unit,
        ),
    }
}

/// Total value of stock on hand at cost
pub fn inventory_value(items: &[InventoryItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.current_stock * item.cost_per_unit)
        .sum()
}

/// Scale factor from a recipe's yield to the quantity sold.
///
/// A recipe without a yield (or with a zero yield) counts as yielding one.
/// `None` when the result does not fit in a `Decimal`.
pub fn sale_multiplier(sale_quantity: Decimal, recipe_yield: Option<Decimal>) -> Option<Decimal> {
    let yield_quantity = recipe_yield
        .filter(|q| !q.is_zero())
        .unwrap_or(Decimal::ONE);
    sale_quantity.checked_div(yield_quantity)
}

/// Amount of one inventory item consumed by a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDepletion {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit: RecipeUnit,
}

/// Per-ingredient quantities for a recipe scaled by `multiplier`.
///
/// `None` if any scaled quantity overflows.
pub fn ingredient_depletions(
    recipe: &Recipe,
    multiplier: Decimal,
) -> Option<Vec<IngredientDepletion>> {
    recipe
        .ingredients()
        .iter()
        .map(|ingredient| {
            ingredient
                .quantity
                .checked_mul(multiplier)
                .map(|quantity| IngredientDepletion {
                    item_id: ingredient.inventory_item_id,
                    quantity,
                    unit: ingredient.unit,
                })
        })
        .collect()
}

/// Ingredients consumed by selling `sale_quantity` of `recipe`
pub fn sale_depletions(
    recipe: &Recipe,
    sale_quantity: Decimal,
) -> Option<Vec<IngredientDepletion>> {
    let multiplier = sale_multiplier(sale_quantity, recipe.quantity)?;
    ingredient_depletions(recipe, multiplier)
}

/// Format an amount as US dollars, e.g. `$1,234.50` or `-$3.00`
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}${grouped}.{cents}")
}

/// e.g. `Jan 5, 2024`
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// e.g. `Jan 5, 2024, 3:07 PM`
pub fn format_date_time(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}
