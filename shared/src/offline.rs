//! Local cache for working without connectivity
//!
//! Mirrors the subset of server data a client needs to keep counting stock
//! offline: inventory items, stock transactions and alerts. Transactions
//! recorded offline are queued with `synced = false` and pushed when the
//! connection returns. Sync is best effort: failures stay queued and are
//! only retried on the next explicit sync.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Alert, InventoryItem, StockTransaction};

/// A cached stock transaction and whether the server has it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedTransaction {
    #[serde(flatten)]
    pub transaction: StockTransaction,
    pub synced: bool,
}

/// Outcome of pushing queued transactions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    pub synced: Vec<Uuid>,
    pub failed: Vec<SyncFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncFailure {
    pub transaction_id: Uuid,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OfflineCache {
    #[serde(rename = "inventoryItems", default)]
    inventory_items: BTreeMap<Uuid, InventoryItem>,
    #[serde(rename = "stockTransactions", default)]
    stock_transactions: Vec<CachedTransaction>,
    #[serde(default)]
    alerts: BTreeMap<Uuid, Alert>,
}

impl OfflineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    // ------------------------------------------------------------------
    // Inventory items
    // ------------------------------------------------------------------

    /// Replace cached items with a fresh server snapshot.
    ///
    /// Pending offline transactions are re-applied on top so the local view
    /// keeps reflecting work the server has not seen yet.
    pub fn replace_items(&mut self, items: Vec<InventoryItem>) {
        self.inventory_items = items.into_iter().map(|item| (item.id, item)).collect();
        let pending: Vec<StockTransaction> = self
            .stock_transactions
            .iter()
            .filter(|t| !t.synced)
            .map(|t| t.transaction.clone())
            .collect();
        for transaction in &pending {
            self.apply_to_item(transaction);
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.inventory_items.values()
    }

    pub fn item(&self, id: Uuid) -> Option<&InventoryItem> {
        self.inventory_items.get(&id)
    }

    // ------------------------------------------------------------------
    // Stock transactions
    // ------------------------------------------------------------------

    /// Store transactions the server already has, keeping anything still queued
    pub fn cache_transactions(&mut self, transactions: Vec<StockTransaction>) {
        self.stock_transactions.retain(|t| !t.synced);
        let queued: Vec<Uuid> = self
            .stock_transactions
            .iter()
            .map(|t| t.transaction.id)
            .collect();
        self.stock_transactions.extend(
            transactions
                .into_iter()
                .filter(|t| !queued.contains(&t.id))
                .map(|transaction| CachedTransaction {
                    transaction,
                    synced: true,
                }),
        );
    }

    /// Record a transaction while offline and apply it to the cached stock
    pub fn queue_transaction(&mut self, transaction: StockTransaction) -> Result<(), &'static str> {
        if !self.inventory_items.contains_key(&transaction.item_id) {
            return Err("Item is not available offline");
        }
        if self
            .stock_transactions
            .iter()
            .any(|t| t.transaction.id == transaction.id)
        {
            return Err("Transaction is already cached");
        }
        self.apply_to_item(&transaction);
        self.stock_transactions.push(CachedTransaction {
            transaction,
            synced: false,
        });
        Ok(())
    }

    pub fn transactions(&self) -> &[CachedTransaction] {
        &self.stock_transactions
    }

    pub fn pending_transactions(&self) -> Vec<&StockTransaction> {
        self.stock_transactions
            .iter()
            .filter(|t| !t.synced)
            .map(|t| &t.transaction)
            .collect()
    }

    pub fn mark_synced(&mut self, transaction_id: Uuid) -> bool {
        match self
            .stock_transactions
            .iter_mut()
            .find(|t| t.transaction.id == transaction_id)
        {
            Some(entry) => {
                entry.synced = true;
                true
            }
            None => false,
        }
    }

    /// Push every pending transaction through `push`, one at a time, in the
    /// order they were queued.
    pub async fn sync<F, Fut, E>(&mut self, mut push: F) -> SyncReport
    where
        F: FnMut(StockTransaction) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let pending: Vec<StockTransaction> =
            self.pending_transactions().into_iter().cloned().collect();
        let mut report = SyncReport::default();

        for transaction in pending {
            let id = transaction.id;
            match push(transaction).await {
                Ok(()) => {
                    self.mark_synced(id);
                    report.synced.push(id);
                }
                Err(e) => report.failed.push(SyncFailure {
                    transaction_id: id,
                    error: e.to_string(),
                }),
            }
        }

        report
    }

    fn apply_to_item(&mut self, transaction: &StockTransaction) {
        if let Some(item) = self.inventory_items.get_mut(&transaction.item_id) {
            item.current_stock += transaction.signed_quantity();
        }
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    pub fn replace_alerts(&mut self, alerts: Vec<Alert>) {
        self.alerts = alerts.into_iter().map(|a| (a.id, a)).collect();
    }

    /// Add an alert pushed over the realtime channel
    pub fn insert_alert(&mut self, alert: Alert) {
        self.alerts.insert(alert.id, alert);
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.values()
    }

    pub fn unread_alert_count(&self) -> usize {
        self.alerts.values().filter(|a| !a.is_read).count()
    }

    pub fn mark_alert_read(&mut self, alert_id: Uuid) -> bool {
        match self.alerts.get_mut(&alert_id) {
            Some(alert) => {
                alert.is_read = true;
                true
            }
            None => false,
        }
    }
}
