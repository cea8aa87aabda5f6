//! Inventory item and stock transaction models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::string_enum! {
    /// Storage categories for inventory items
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ItemCategory: "item category" {
        Produce => "produce",
        Meat => "meat",
        Seafood => "seafood",
        Dairy => "dairy",
        DryGoods => "dry_goods",
        Beverages => "beverages",
        Frozen => "frozen",
        Bakery => "bakery",
        Condiments => "condiments",
        Cleaning => "cleaning",
        Other => "other",
    }
}

crate::string_enum! {
    /// Units inventory is counted in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum Unit: "unit" {
        Kg => "kg",
        G => "g",
        Lb => "lb",
        Oz => "oz",
        L => "l",
        Ml => "ml",
        Gal => "gal",
        Pcs => "pcs",
        Box => "box",
        Case => "case",
        Bottle => "bottle",
        Can => "can",
        Bag => "bag",
        Dozen => "dozen",
    }
}

/// An item tracked in a restaurant's inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    pub category: ItemCategory,
    pub unit: Unit,
    pub cost_per_unit: Decimal,
    pub current_stock: Decimal,
    pub min_threshold: Decimal,
    pub supplier_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

crate::string_enum! {
    /// Direction of a stock movement
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TransactionType: "transaction type" {
        In => "in",
        Out => "out",
    }
}

impl TransactionType {
    /// Apply this direction's sign to a positive quantity
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            TransactionType::In => quantity,
            TransactionType::Out => -quantity,
        }
    }

    pub fn reverse(&self) -> TransactionType {
        match self {
            TransactionType::In => TransactionType::Out,
            TransactionType::Out => TransactionType::In,
        }
    }
}

crate::string_enum! {
    /// Why stock moved
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum TransactionReason: "transaction reason" {
        Purchase => "purchase",
        Delivery => "delivery",
        Sale => "sale",
        Waste => "waste",
        Transfer => "transfer",
        /// System-generated correction for direct stock edits and opening balances
        Adjustment => "adjustment",
    }
}

impl TransactionReason {
    /// Reasons a user may pick for the given direction
    pub fn selectable_for(transaction_type: TransactionType) -> &'static [TransactionReason] {
        match transaction_type {
            TransactionType::In => &[TransactionReason::Purchase, TransactionReason::Delivery],
            TransactionType::Out => &[
                TransactionReason::Sale,
                TransactionReason::Waste,
                TransactionReason::Transfer,
            ],
        }
    }

    /// Whether this reason can be recorded against the given direction at all
    pub fn allowed_for(&self, transaction_type: TransactionType) -> bool {
        *self == TransactionReason::Adjustment
            || Self::selectable_for(transaction_type).contains(self)
    }
}

/// A single stock movement in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockTransaction {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub item_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub reason: TransactionReason,
    pub cost: Option<Decimal>,
    pub sku: Option<String>,
    pub notes: Option<String>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    /// Quantity with the transaction's direction applied
    pub fn signed_quantity(&self) -> Decimal {
        self.transaction_type.signed(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn reasons_are_constrained_by_direction() {
        assert!(TransactionReason::Purchase.allowed_for(TransactionType::In));
        assert!(TransactionReason::Delivery.allowed_for(TransactionType::In));
        assert!(!TransactionReason::Purchase.allowed_for(TransactionType::Out));
        assert!(TransactionReason::Waste.allowed_for(TransactionType::Out));
        assert!(!TransactionReason::Sale.allowed_for(TransactionType::In));
    }

    #[test]
    fn adjustment_is_not_user_selectable() {
        for t in TransactionType::ALL {
            let selectable = TransactionReason::selectable_for(*t);
            assert!(!selectable.contains(&TransactionReason::Adjustment));
            assert!(TransactionReason::Adjustment.allowed_for(*t));
        }
    }

    #[test]
    fn enum_strings_match_serde() {
        for category in ItemCategory::ALL {
            let json = serde_json::to_string(category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.as_str()));
            assert_eq!(ItemCategory::from_str(category.as_str()).unwrap(), *category);
        }
        assert!(Unit::from_str("furlong").is_err());
    }

    #[test]
    fn transaction_type_serialises_under_type_key() {
        let txn = StockTransaction {
            id: Uuid::nil(),
            restaurant_id: Uuid::nil(),
            item_id: Uuid::nil(),
            transaction_type: TransactionType::Out,
            quantity: Decimal::new(3, 0),
            reason: TransactionReason::Waste,
            cost: None,
            sku: None,
            notes: None,
            user_id: Uuid::nil(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&txn).unwrap();
        assert_eq!(value["type"], "out");
        assert_eq!(txn.signed_quantity(), Decimal::new(-3, 0));
    }
}
