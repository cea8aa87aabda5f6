//! Recipe models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::string_enum! {
    /// Units used for recipe yields and ingredient amounts
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum RecipeUnit: "recipe unit" {
        Kg => "kg",
        G => "g",
        Lb => "lb",
        Oz => "oz",
        L => "l",
        Ml => "ml",
        Pcs => "pcs",
        Cup => "cup",
        Tbsp => "tbsp",
        Tsp => "tsp",
        Serving => "serving",
        Portion => "portion",
        Batch => "batch",
    }
}

crate::string_enum! {
    /// Lifecycle state of a recipe
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum RecipeStatus: "recipe status" {
        Active => "Active",
        Disabled => "Disabled",
        Removed => "Removed",
    }
}

/// One ingredient line of a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub inventory_item_id: Uuid,
    pub quantity: Decimal,
    pub unit: RecipeUnit,
}

/// Structured recipe body
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RecipeContent {
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

/// A recipe whose ingredients are deducted from inventory when sold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    /// How many units one preparation of the recipe yields
    pub quantity: Option<Decimal>,
    pub unit: Option<RecipeUnit>,
    pub status: RecipeStatus,
    pub content: RecipeContent,
    pub created_by: Uuid,
    pub updated_by: Uuid,
    /// Epoch milliseconds
    pub created_at: i64,
    /// Epoch milliseconds
    pub updated_at: i64,
}

impl Recipe {
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.content.ingredients
    }

    pub fn is_sellable(&self) -> bool {
        self.status == RecipeStatus::Active
    }
}
