//! Stock transaction tests
//!
//! - Staff edits are limited to quantity, reason and notes
//! - Staff edits close 24 hours after the transaction
//! - Offline-queued transactions sync once, failures stay queued

mod common;

use chrono::{Duration, Utc};
use common::{dec, Harness};
use rim_backend::error::AppError;
use rim_backend::repository::Repository;
use rim_backend::services::stock::{RecordTransactionInput, UpdateTransactionInput};
use shared::{
    InventoryItem, OfflineCache, PermissionError, StockTransaction, TransactionReason,
    TransactionType,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn purchase(item_id: Uuid, quantity: &str) -> RecordTransactionInput {
    RecordTransactionInput {
        id: None,
        item_id,
        transaction_type: TransactionType::In,
        quantity: dec(quantity),
        reason: TransactionReason::Purchase,
        cost: Some(dec("12.00")),
        sku: Some("TOM-01".to_string()),
        notes: None,
        created_at: None,
    }
}

#[tokio::test]
async fn reason_must_match_direction() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "10", "2").await;

    let err = h
        .services
        .stock
        .record(
            &h.staff,
            RecordTransactionInput {
                transaction_type: TransactionType::Out,
                ..purchase(item.id, "1")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "reason"));

    let err = h
        .services
        .stock
        .record(&h.staff, purchase(item.id, "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
    assert_eq!(h.stock_of(item.id).await, dec("10"));
}

#[tokio::test]
async fn amending_quantity_moves_stock_by_the_difference() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let recorded = h
        .services
        .stock
        .record(&h.staff, purchase(item.id, "10"))
        .await
        .unwrap();

    let amended = h
        .services
        .stock
        .update(
            &h.staff,
            recorded.transaction.id,
            UpdateTransactionInput {
                quantity: Some(dec("4")),
                notes: Some("Miscounted delivery".to_string()),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(amended.transaction.quantity, dec("4"));
    assert_eq!(amended.item.current_stock, dec("4"));
}

#[tokio::test]
async fn managers_can_flip_the_direction_of_a_transaction() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let recorded = h
        .services
        .stock
        .record(&h.staff, purchase(item.id, "10"))
        .await
        .unwrap();

    let flipped = h
        .services
        .stock
        .update(
            &h.manager,
            recorded.transaction.id,
            UpdateTransactionInput {
                transaction_type: Some(TransactionType::Out),
                reason: Some(TransactionReason::Waste),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(flipped.item.current_stock, dec("-10"));

    let stored = h
        .repo
        .get_transaction(h.restaurant.id, recorded.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.transaction_type, TransactionType::Out);
    assert_eq!(stored.reason, TransactionReason::Waste);

    let check = h
        .services
        .inventory
        .reconcile(&h.manager, item.id)
        .await
        .unwrap();
    assert!(check.consistent);
    assert_eq!(check.ledger_balance, dec("-10"));
}

#[tokio::test]
async fn stock_that_would_overflow_is_left_unchanged() {
    let h = Harness::new().await;
    let template = h.item("Tomatoes", "0", "2").await;
    let brimming = h
        .repo
        .insert_item(InventoryItem {
            id: Uuid::new_v4(),
            name: "Brimming".to_string(),
            current_stock: Decimal::MAX,
            ..template
        })
        .await
        .unwrap();

    let err = h
        .services
        .stock
        .record(&h.manager, purchase(brimming.id, "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "quantity"));
    assert_eq!(h.stock_of(brimming.id).await, Decimal::MAX);
    assert!(h
        .services
        .stock
        .list(&h.manager, Some(brimming.id))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn staff_cannot_edit_cost_or_sku() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let recorded = h
        .services
        .stock
        .record(&h.staff, purchase(item.id, "10"))
        .await
        .unwrap();

    let err = h
        .services
        .stock
        .update(
            &h.staff,
            recorded.transaction.id,
            UpdateTransactionInput {
                cost: Some(dec("1")),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Permission(PermissionError::RestrictedFields)
    ));

    let ok = h
        .services
        .stock
        .update(
            &h.manager,
            recorded.transaction.id,
            UpdateTransactionInput {
                cost: Some(dec("1")),
                ..UpdateTransactionInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ok.transaction.cost, Some(dec("1")));
}

#[tokio::test]
async fn staff_edit_window_closes_after_a_day() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let recorded = h
        .services
        .stock
        .record(
            &h.staff,
            RecordTransactionInput {
                created_at: Some(Utc::now() - Duration::hours(25)),
                ..purchase(item.id, "10")
            },
        )
        .await
        .unwrap();

    let edit = || UpdateTransactionInput {
        quantity: Some(dec("9")),
        ..UpdateTransactionInput::default()
    };

    let err = h
        .services
        .stock
        .update(&h.staff, recorded.transaction.id, edit())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Permission(PermissionError::TransactionTooOld)
    ));

    let managed = h
        .services
        .stock
        .update(&h.manager, recorded.transaction.id, edit())
        .await
        .unwrap();
    assert_eq!(managed.item.current_stock, dec("9"));
}

#[tokio::test]
async fn future_timestamps_are_clamped() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let recorded = h
        .services
        .stock
        .record(
            &h.staff,
            RecordTransactionInput {
                created_at: Some(Utc::now() + Duration::days(3)),
                ..purchase(item.id, "1")
            },
        )
        .await
        .unwrap();
    assert!(recorded.transaction.created_at <= Utc::now());
}

#[tokio::test]
async fn offline_batch_reports_each_entry() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "0", "2").await;
    let good = RecordTransactionInput {
        id: Some(Uuid::new_v4()),
        ..purchase(item.id, "5")
    };
    let missing_item = RecordTransactionInput {
        id: Some(Uuid::new_v4()),
        ..purchase(Uuid::new_v4(), "5")
    };

    let report = h
        .services
        .stock
        .sync_offline(&h.staff, vec![good.clone(), missing_item.clone()])
        .await
        .unwrap();
    assert_eq!(report.synced, vec![good.id.unwrap()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].transaction_id, missing_item.id.unwrap());

    // A replay after a lost response must not count the stock twice
    let replay = h
        .services
        .stock
        .sync_offline(&h.staff, vec![good])
        .await
        .unwrap();
    assert_eq!(replay.synced.len(), 1);
    assert_eq!(h.stock_of(item.id).await, dec("5"));
}

#[tokio::test]
async fn offline_cache_syncs_through_the_service() {
    let h = Harness::new().await;
    let item = h.item("Tomatoes", "3", "2").await;

    // The second item was deleted on the server after the client cached it
    let gone = InventoryItem {
        id: Uuid::new_v4(),
        ..item.clone()
    };
    let mut cache = OfflineCache::new();
    cache.replace_items(vec![item.clone(), gone.clone()]);

    let queued = |item_id: Uuid, quantity: &str| StockTransaction {
        id: Uuid::new_v4(),
        restaurant_id: h.restaurant.id,
        item_id,
        transaction_type: TransactionType::Out,
        quantity: dec(quantity),
        reason: TransactionReason::Waste,
        cost: None,
        sku: None,
        notes: Some("Recorded offline".to_string()),
        user_id: h.staff.id,
        created_at: Utc::now(),
    };
    cache.queue_transaction(queued(item.id, "1")).unwrap();
    cache.queue_transaction(queued(gone.id, "1")).unwrap();
    assert_eq!(cache.item(item.id).unwrap().current_stock, dec("2"));

    let stock = h.services.stock.clone();
    let staff = h.staff.clone();
    let report = cache
        .sync(|transaction| {
            let stock = stock.clone();
            let staff = staff.clone();
            async move { stock.record(&staff, transaction.into()).await.map(|_| ()) }
        })
        .await;

    assert_eq!(report.synced.len(), 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(cache.pending_transactions().len(), 1);
    assert_eq!(h.stock_of(item.id).await, dec("2"));
}
