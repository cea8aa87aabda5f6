//! Seed data served in demo mode

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::{
    now_millis, Ingredient, InventoryItem, ItemCategory, Recipe, RecipeContent, RecipeStatus,
    RecipeUnit, Restaurant, Role, StockTransaction, Supplier, TransactionReason, TransactionType,
    Unit, User,
};

use super::{Repository, UserAccount};
use crate::error::{AppError, AppResult};

pub const DEMO_MANAGER_EMAIL: &str = "manager@demo.local";
pub const DEMO_STAFF_EMAIL: &str = "staff@demo.local";
pub const DEMO_PASSWORD: &str = "demo-password";

fn dec(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}

/// Populate a fresh repository with one restaurant, a manager, a staff
/// member, suppliers, stocked items and a recipe.
pub async fn seed(repo: &dyn Repository) -> AppResult<Restaurant> {
    let now = Utc::now();
    let restaurant = repo
        .insert_restaurant(Restaurant {
            id: Uuid::new_v4(),
            name: "Demo Trattoria".to_string(),
            created_at: now,
        })
        .await?;

    let password_hash = bcrypt::hash(DEMO_PASSWORD, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

    let mut users = Vec::new();
    for (email, name, role) in [
        (DEMO_MANAGER_EMAIL, "Maria Manager", Role::Manager),
        (DEMO_STAFF_EMAIL, "Sam Staff", Role::Staff),
    ] {
        let user = repo
            .insert_user(UserAccount {
                user: User {
                    id: Uuid::new_v4(),
                    restaurant_id: restaurant.id,
                    email: email.to_string(),
                    full_name: name.to_string(),
                    role,
                    created_at: now,
                    updated_at: now,
                },
                password_hash: password_hash.clone(),
            })
            .await?;
        users.push(user);
    }
    let manager_id = users[0].id;

    let supplier = |name: &str, contact: &str, email: &str| Supplier {
        id: Uuid::new_v4(),
        restaurant_id: restaurant.id,
        name: name.to_string(),
        contact_name: Some(contact.to_string()),
        email: Some(email.to_string()),
        phone: None,
        address: None,
        notes: None,
        created_at: now,
        updated_at: now,
    };
    let produce = repo
        .insert_supplier(supplier("Green Valley Produce", "Luca", "orders@greenvalley.test"))
        .await?;
    let dairy = repo
        .insert_supplier(supplier("Dairy Direct", "Ana", "sales@dairydirect.test"))
        .await?;

    // (name, category, unit, cost, opening stock, threshold, supplier)
    let catalogue = [
        (
            "Tomatoes",
            ItemCategory::Produce,
            Unit::Kg,
            dec(320, 2),
            dec(25, 0),
            dec(5, 0),
            Some(produce.id),
        ),
        (
            "Basil",
            ItemCategory::Produce,
            Unit::Kg,
            dec(1800, 2),
            dec(15, 1),
            dec(5, 1),
            Some(produce.id),
        ),
        (
            "Mozzarella",
            ItemCategory::Dairy,
            Unit::Kg,
            dec(1150, 2),
            dec(4, 0),
            dec(5, 0),
            Some(dairy.id),
        ),
        ("Flour", ItemCategory::DryGoods, Unit::Kg, dec(120, 2), dec(50, 0), dec(10, 0), None),
        ("Olive Oil", ItemCategory::Condiments, Unit::L, dec(950, 2), dec(8, 0), dec(2, 0), None),
    ];

    let mut stocked = Vec::new();
    for (name, category, unit, cost, opening, threshold, supplier_id) in catalogue {
        let item = repo
            .insert_item(InventoryItem {
                id: Uuid::new_v4(),
                restaurant_id: restaurant.id,
                name: name.to_string(),
                category,
                unit,
                cost_per_unit: cost,
                current_stock: Decimal::ZERO,
                min_threshold: threshold,
                supplier_id,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let reason = if supplier_id.is_some() {
            TransactionReason::Purchase
        } else {
            TransactionReason::Adjustment
        };
        repo.apply_transaction(StockTransaction {
            id: Uuid::new_v4(),
            restaurant_id: restaurant.id,
            item_id: item.id,
            transaction_type: TransactionType::In,
            quantity: opening,
            reason,
            cost: supplier_id.map(|_| cost * opening),
            sku: None,
            notes: Some("Opening stock".to_string()),
            user_id: manager_id,
            created_at: now,
        })
        .await?;
        stocked.push(item);
    }

    let ingredient = |index: usize, quantity: Decimal| Ingredient {
        inventory_item_id: stocked[index].id,
        quantity,
        unit: RecipeUnit::Kg,
    };
    let millis = now_millis();
    repo.insert_recipe(Recipe {
        id: Uuid::new_v4(),
        restaurant_id: restaurant.id,
        name: "Margherita Pizza".to_string(),
        quantity: Some(Decimal::ONE),
        unit: Some(RecipeUnit::Serving),
        status: RecipeStatus::Active,
        content: RecipeContent {
            ingredients: vec![
                ingredient(0, dec(200, 3)),
                ingredient(1, dec(10, 3)),
                ingredient(2, dec(125, 3)),
                ingredient(3, dec(250, 3)),
            ],
        },
        created_by: manager_id,
        updated_by: manager_id,
        created_at: millis,
        updated_at: millis,
    })
    .await?;

    tracing::info!(restaurant_id = %restaurant.id, "Seeded demo restaurant");
    Ok(restaurant)
}
