//! Validation utilities for the restaurant inventory platform

use std::collections::HashSet;

use rust_decimal::Decimal;

use crate::models::{Ingredient, TransactionReason, TransactionType};

// ============================================================================
// Stock Validations
// ============================================================================

/// Largest quantity a single stock movement or sale may carry
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Stock movements always carry a positive quantity; the direction gives the sign
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if quantity > Decimal::from(MAX_QUANTITY) {
        return Err("Quantity must be at most 1,000,000,000");
    }
    Ok(())
}

/// Validate a reason submitted by a user for the given direction
pub fn validate_transaction_reason(
    transaction_type: TransactionType,
    reason: TransactionReason,
) -> Result<(), &'static str> {
    if TransactionReason::selectable_for(transaction_type).contains(&reason) {
        return Ok(());
    }
    match transaction_type {
        TransactionType::In => Err("Stock in must be a purchase or delivery"),
        TransactionType::Out => Err("Stock out must be a sale, waste or transfer"),
    }
}

pub fn validate_cost(cost: Option<Decimal>) -> Result<(), &'static str> {
    match cost {
        Some(c) if c < Decimal::ZERO => Err("Cost cannot be negative"),
        _ => Ok(()),
    }
}

pub fn validate_stock_level(stock: Decimal) -> Result<(), &'static str> {
    if stock < Decimal::ZERO {
        return Err("Stock cannot be negative");
    }
    Ok(())
}

pub fn validate_threshold(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Minimum threshold cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Recipe Validations
// ============================================================================

/// A yield, when given, must be positive
pub fn validate_recipe_yield(quantity: Option<Decimal>) -> Result<(), &'static str> {
    match quantity {
        Some(q) if q <= Decimal::ZERO => Err("Recipe yield must be greater than zero"),
        _ => Ok(()),
    }
}

/// Every ingredient needs a positive amount and may appear only once
pub fn validate_ingredients(ingredients: &[Ingredient]) -> Result<(), &'static str> {
    let mut seen = HashSet::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if ingredient.quantity <= Decimal::ZERO {
            return Err("Ingredient quantity must be greater than zero");
        }
        if !seen.insert(ingredient.inventory_item_id) {
            return Err("An inventory item can only appear once per recipe");
        }
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeUnit;
    use proptest::prelude::*;
    use uuid::Uuid;

    #[test]
    fn reasons_follow_direction() {
        use TransactionReason::{Adjustment, Delivery, Transfer, Waste};
        use TransactionType::{In, Out};

        assert!(validate_transaction_reason(In, Delivery).is_ok());
        assert!(validate_transaction_reason(In, Waste).is_err());
        assert!(validate_transaction_reason(Out, Transfer).is_ok());
        assert!(validate_transaction_reason(Out, Adjustment).is_err());
    }

    #[test]
    fn duplicate_ingredients_rejected() {
        let id = Uuid::new_v4();
        let line = Ingredient {
            inventory_item_id: id,
            quantity: Decimal::ONE,
            unit: RecipeUnit::G,
        };
        assert!(validate_ingredients(&[line.clone()]).is_ok());
        assert!(validate_ingredients(&[line.clone(), line]).is_err());
    }

    #[test]
    fn zero_quantity_ingredient_rejected() {
        let line = Ingredient {
            inventory_item_id: Uuid::new_v4(),
            quantity: Decimal::ZERO,
            unit: RecipeUnit::Pcs,
        };
        assert!(validate_ingredients(&[line]).is_err());
    }

    #[test]
    fn oversized_quantity_rejected() {
        assert!(validate_quantity(Decimal::from(MAX_QUANTITY)).is_ok());
        assert!(validate_quantity(Decimal::from(MAX_QUANTITY + 1)).is_err());
        assert!(validate_quantity(Decimal::MAX).is_err());
    }

    #[test]
    fn blank_names_rejected() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("Basil").is_ok());
    }

    proptest! {
        #[test]
        fn positive_quantities_accepted(n in 1i64..1_000_000i64, scale in 0u32..4u32) {
            prop_assert!(validate_quantity(Decimal::new(n, scale)).is_ok());
        }

        #[test]
        fn non_positive_quantities_rejected(n in -1_000_000i64..=0i64) {
            prop_assert!(validate_quantity(Decimal::from(n)).is_err());
        }
    }
}
