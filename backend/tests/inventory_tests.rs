//! Inventory item and stock ledger tests
//!
//! - Low-stock alerts follow the threshold as stock moves
//! - Deleting a referenced item is refused with every blocker named
//! - Stored stock always matches the ledger balance

mod common;

use common::{dec, Harness};
use proptest::prelude::*;
use rim_backend::error::AppError;
use rim_backend::repository::Repository;
use rim_backend::services::inventory::{ItemFilter, UpdateItemInput};
use rim_backend::services::stock::RecordTransactionInput;
use rust_decimal::Decimal;
use shared::{AlertType, PermissionError, TransactionReason, TransactionType};
use uuid::Uuid;

fn movement(item_id: Uuid, kind: TransactionType, quantity: Decimal) -> RecordTransactionInput {
    let reason = match kind {
        TransactionType::In => TransactionReason::Purchase,
        TransactionType::Out => TransactionReason::Sale,
    };
    RecordTransactionInput {
        id: None,
        item_id,
        transaction_type: kind,
        quantity,
        reason,
        cost: None,
        sku: None,
        notes: None,
        created_at: None,
    }
}

// ============================================================================
// Stock movements and alerts
// ============================================================================

#[tokio::test]
async fn crossing_the_threshold_raises_one_low_stock_alert() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "10", "5").await;
    let mut alerts = h.feed.subscribe();

    let first = h
        .services
        .stock
        .record(&h.staff, movement(item.id, TransactionType::Out, dec("3")))
        .await
        .unwrap();
    assert_eq!(first.item.current_stock, dec("7"));
    assert!(first.alert.is_none());

    let second = h
        .services
        .stock
        .record(&h.staff, movement(item.id, TransactionType::Out, dec("3")))
        .await
        .unwrap();
    assert_eq!(second.item.current_stock, dec("4"));
    let alert = second.alert.expect("low stock alert");
    assert_eq!(alert.alert_type, AlertType::LowStock);

    let pushed = alerts.recv().await.unwrap();
    assert_eq!(pushed.id, alert.id);

    let low = h.services.inventory.low_stock(&h.staff).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(h.services.alerts.unread_count(&h.staff).await.unwrap(), 1);
}

#[tokio::test]
async fn running_out_escalates_to_out_of_stock() {
    let h = Harness::new().await;
    let item = h.item("Basil", "2", "1").await;

    let movement = h
        .services
        .stock
        .record(&h.staff, movement(item.id, TransactionType::Out, dec("2")))
        .await
        .unwrap();

    assert_eq!(movement.item.current_stock, Decimal::ZERO);
    assert_eq!(movement.alert.unwrap().alert_type, AlertType::OutOfStock);
}

#[tokio::test]
async fn restocking_never_raises_alerts() {
    let h = Harness::new().await;
    let item = h.item("Flour", "1", "5").await;

    let movement = h
        .services
        .stock
        .record(&h.staff, movement(item.id, TransactionType::In, dec("1")))
        .await
        .unwrap();
    assert!(movement.alert.is_none());
}

// ============================================================================
// Item lifecycle
// ============================================================================

#[tokio::test]
async fn opening_stock_is_recorded_in_the_ledger() {
    let h = Harness::new().await;
    let item = h.item("Mozzarella", "12.5", "2").await;

    let ledger = h.services.stock.list(&h.manager, Some(item.id)).await.unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].reason, TransactionReason::Adjustment);
    assert_eq!(ledger[0].quantity, dec("12.5"));
}

#[tokio::test]
async fn stock_edits_become_adjustments() {
    let h = Harness::new().await;
    let item = h.item("Olive Oil", "10", "2").await;

    let updated = h
        .services
        .inventory
        .update(
            &h.manager,
            item.id,
            UpdateItemInput {
                current_stock: Some(dec("6")),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.current_stock, dec("6"));

    let ledger = h.services.stock.list(&h.manager, Some(item.id)).await.unwrap();
    let correction = ledger
        .iter()
        .find(|t| t.transaction_type == TransactionType::Out)
        .unwrap();
    assert_eq!(correction.reason, TransactionReason::Adjustment);
    assert_eq!(correction.quantity, dec("4"));

    let check = h.services.inventory.reconcile(&h.manager, item.id).await.unwrap();
    assert!(check.consistent);
}

#[tokio::test]
async fn staff_cannot_change_cost_or_supplier() {
    let h = Harness::new().await;
    let item = h.item("Onions", "10", "2").await;

    let err = h
        .services
        .inventory
        .update(
            &h.staff,
            item.id,
            UpdateItemInput {
                cost_per_unit: Some(dec("9")),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Permission(PermissionError::RestrictedFields)
    ));

    let renamed = h
        .services
        .inventory
        .update(
            &h.staff,
            item.id,
            UpdateItemInput {
                name: Some("Red Onions".to_string()),
                ..UpdateItemInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Red Onions");
}

#[tokio::test]
async fn delete_names_every_blocker() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "10", "5").await;
    h.services
        .stock
        .record(&h.manager, movement(item.id, TransactionType::Out, dec("6")))
        .await
        .unwrap();

    let err = h.services.inventory.delete(&h.manager, item.id).await.unwrap_err();
    match err {
        AppError::BusinessRule(message) => {
            assert!(message.contains("2 stock transactions"), "{}", message);
            assert!(message.contains("1 alert"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(h.repo.get_item(h.restaurant.id, item.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unreferenced_items_can_be_deleted_by_managers_only() {
    let h = Harness::new().await;
    let item = h.item("Parsley", "0", "1").await;

    let err = h.services.inventory.delete(&h.staff, item.id).await.unwrap_err();
    assert!(matches!(err, AppError::Permission(PermissionError::ManagerOnly)));

    h.services.inventory.delete(&h.manager, item.id).await.unwrap();
    assert!(matches!(
        h.services.inventory.get(&h.manager, item.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn items_of_other_restaurants_are_invisible() {
    let h = Harness::new().await;
    let item = h.item("Garlic", "3", "1").await;
    let outsider = h.outsider().await;

    assert!(h
        .services
        .inventory
        .list(&outsider, &ItemFilter::default())
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        h.services.inventory.get(&outsider, item.id).await,
        Err(AppError::NotFound(_))
    ));

    let err = h
        .services
        .stock
        .record(&outsider, movement(item.id, TransactionType::Out, dec("1")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(h.stock_of(item.id).await, dec("3"));
}

#[tokio::test]
async fn search_and_category_filters_apply() {
    let h = Harness::new().await;
    h.item("Cherry Tomatoes", "5", "1").await;
    h.item("Basil", "5", "1").await;

    let filter = ItemFilter {
        search: Some("tomato".to_string()),
        ..ItemFilter::default()
    };
    let found = h.services.inventory.list(&h.staff, &filter).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Cherry Tomatoes");
}

// ============================================================================
// Property Tests
// ============================================================================

fn movement_strategy() -> impl Strategy<Value = (bool, u32)> {
    (any::<bool>(), 1u32..10_000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Stored stock equals the ledger balance after any sequence of movements
    #[test]
    fn stored_stock_matches_ledger(moves in prop::collection::vec(movement_strategy(), 0..20)) {
        let consistent = tokio_test::block_on(async {
            let h = Harness::new().await;
            let item = h.item("Rice", "50", "5").await;

            for (incoming, hundredths) in moves {
                let kind = if incoming { TransactionType::In } else { TransactionType::Out };
                h.services
                    .stock
                    .record(&h.manager, movement(item.id, kind, Decimal::new(hundredths as i64, 2)))
                    .await
                    .unwrap();
            }

            h.services
                .inventory
                .reconcile(&h.manager, item.id)
                .await
                .unwrap()
                .consistent
        });
        prop_assert!(consistent);
    }
}
