//! Sale models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sale of some quantity of a recipe.
///
/// `inventory_updated` records whether the recipe's ingredients have been
/// deducted from stock for this sale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub recipe_id: Uuid,
    pub quantity: Decimal,
    pub inventory_updated: bool,
    pub receipt_id: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
}
