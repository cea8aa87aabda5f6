//! Dashboard metrics and supplier reports

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    epoch_millis, format_currency, format_date, inventory_value, is_low_stock, Action, Actor,
    InventoryItem, ItemCategory, StockTransaction, Subject, TransactionReason, TransactionType,
    Unit,
};
use uuid::Uuid;

use super::authorize;
use crate::error::{AppError, AppResult};
use crate::repository::Repository;

/// Purchases listed per supplier item in the purchase report
pub const RECENT_PURCHASES: usize = 3;

/// Window for the "recent activity" dashboard counters
const RECENT_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AnalyticsService {
    repo: Arc<dyn Repository>,
}

/// Dashboard metrics
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub total_items: usize,
    pub low_stock_items: usize,
    pub out_of_stock_items: usize,
    pub inventory_value: Decimal,
    pub inventory_value_formatted: String,
    pub unread_alerts: usize,
    pub transactions_last_7_days: usize,
    pub sales_last_7_days: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: ItemCategory,
    pub item_count: usize,
    pub low_stock_count: usize,
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseSummary {
    pub transaction_id: Uuid,
    pub quantity: Decimal,
    pub cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

/// One supplier item with its most recent incoming stock
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPurchaseRow {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: Unit,
    pub current_stock: Decimal,
    pub recent_purchases: Vec<PurchaseSummary>,
}

// csv cannot serialize nested sequences, so the export has one line per purchase
#[derive(Debug, Serialize)]
struct PurchaseCsvRecord<'a> {
    supplier: &'a str,
    item: &'a str,
    unit: &'a str,
    current_stock: Decimal,
    purchase_date: String,
    quantity: Option<Decimal>,
    cost: Option<Decimal>,
}

impl AnalyticsService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self { repo }
    }

    pub async fn dashboard(&self, actor: &impl Actor) -> AppResult<DashboardMetrics> {
        authorize(actor, Action::Read, Subject::InventoryItem)?;
        let restaurant_id = actor.restaurant_id();

        let items = self.repo.list_items(restaurant_id).await?;
        let transactions = self.repo.list_transactions(restaurant_id, None).await?;
        let unread_alerts = self.repo.list_alerts(restaurant_id, true).await?.len();
        let sales = self.repo.list_sales(restaurant_id).await?;

        let now = Utc::now();
        let since = now - Duration::days(RECENT_DAYS);
        let since_millis = epoch_millis(since);
        let value = inventory_value(&items);

        Ok(DashboardMetrics {
            total_items: items.len(),
            low_stock_items: items.iter().filter(|i| is_low_stock(i)).count(),
            out_of_stock_items: items
                .iter()
                .filter(|i| i.current_stock <= Decimal::ZERO)
                .count(),
            inventory_value: value,
            inventory_value_formatted: format_currency(value),
            unread_alerts,
            transactions_last_7_days: transactions.iter().filter(|t| t.created_at >= since).count(),
            sales_last_7_days: sales.iter().filter(|s| s.created_at >= since_millis).count(),
            generated_at: now,
        })
    }

    /// Item counts and stock value per category, in category order
    pub async fn category_breakdown(
        &self,
        actor: &impl Actor,
    ) -> AppResult<Vec<CategoryBreakdown>> {
        authorize(actor, Action::Read, Subject::InventoryItem)?;
        let items = self.repo.list_items(actor.restaurant_id()).await?;
        Ok(breakdown(&items))
    }

    /// Every supplier item with its last few purchases or deliveries
    pub async fn supplier_purchase_report(
        &self,
        actor: &impl Actor,
    ) -> AppResult<Vec<SupplierPurchaseRow>> {
        authorize(actor, Action::Read, Subject::Supplier)?;
        authorize(actor, Action::Read, Subject::StockTransaction)?;
        let restaurant_id = actor.restaurant_id();

        let suppliers = self.repo.list_suppliers(restaurant_id).await?;
        let items = self.repo.list_items(restaurant_id).await?;
        let transactions = self.repo.list_transactions(restaurant_id, None).await?;

        let mut rows = Vec::new();
        for supplier in &suppliers {
            for item in items.iter().filter(|i| i.supplier_id == Some(supplier.id)) {
                rows.push(SupplierPurchaseRow {
                    supplier_id: supplier.id,
                    supplier_name: supplier.name.clone(),
                    item_id: item.id,
                    item_name: item.name.clone(),
                    unit: item.unit,
                    current_stock: item.current_stock,
                    recent_purchases: recent_purchases(item.id, &transactions),
                });
            }
        }
        rows.sort_by(|a, b| {
            a.supplier_name
                .cmp(&b.supplier_name)
                .then_with(|| a.item_name.cmp(&b.item_name))
        });

        tracing::debug!(
            restaurant_id = %restaurant_id,
            rows = rows.len(),
            "Built supplier purchase report"
        );
        Ok(rows)
    }

    pub async fn supplier_purchase_csv(&self, actor: &impl Actor) -> AppResult<String> {
        let rows = self.supplier_purchase_report(actor).await?;
        purchases_to_csv(&rows)
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

fn breakdown(items: &[InventoryItem]) -> Vec<CategoryBreakdown> {
    let mut by_category: BTreeMap<ItemCategory, CategoryBreakdown> = BTreeMap::new();
    for item in items {
        let entry = by_category
            .entry(item.category)
            .or_insert_with(|| CategoryBreakdown {
                category: item.category,
                item_count: 0,
                low_stock_count: 0,
                value: Decimal::ZERO,
            });
        entry.item_count += 1;
        if is_low_stock(item) {
            entry.low_stock_count += 1;
        }
        entry.value += item.current_stock * item.cost_per_unit;
    }
    by_category.into_values().collect()
}

/// Newest incoming movements for an item, newest first
fn recent_purchases(item_id: Uuid, transactions: &[StockTransaction]) -> Vec<PurchaseSummary> {
    let mut incoming: Vec<&StockTransaction> = transactions
        .iter()
        .filter(|t| t.item_id == item_id && t.transaction_type == TransactionType::In)
        .filter(|t| {
            matches!(
                t.reason,
                TransactionReason::Purchase | TransactionReason::Delivery
            )
        })
        .collect();
    incoming.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    incoming
        .into_iter()
        .take(RECENT_PURCHASES)
        .map(|t| PurchaseSummary {
            transaction_id: t.id,
            quantity: t.quantity,
            cost: t.cost,
            created_at: t.created_at,
        })
        .collect()
}

fn purchases_to_csv(rows: &[SupplierPurchaseRow]) -> AppResult<String> {
    let mut records = Vec::new();
    for row in rows {
        if row.recent_purchases.is_empty() {
            records.push(csv_record(row, None));
        }
        records.extend(row.recent_purchases.iter().map(|p| csv_record(row, Some(p))));
    }
    AnalyticsService::export_to_csv(&records)
}

fn csv_record<'a>(
    row: &'a SupplierPurchaseRow,
    purchase: Option<&PurchaseSummary>,
) -> PurchaseCsvRecord<'a> {
    PurchaseCsvRecord {
        supplier: &row.supplier_name,
        item: &row.item_name,
        unit: row.unit.as_str(),
        current_stock: row.current_stock,
        purchase_date: purchase
            .map(|p| format_date(p.created_at))
            .unwrap_or_default(),
        quantity: purchase.map(|p| p.quantity),
        cost: purchase.and_then(|p| p.cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Role, User};

    fn item(category: ItemCategory, stock: i64, threshold: i64, cost: i64) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            name: format!("{} item", category),
            category,
            unit: Unit::Kg,
            cost_per_unit: Decimal::new(cost, 0),
            current_stock: Decimal::new(stock, 0),
            min_threshold: Decimal::new(threshold, 0),
            supplier_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn purchase(item_id: Uuid, quantity: i64, days_ago: i64) -> StockTransaction {
        StockTransaction {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            item_id,
            transaction_type: TransactionType::In,
            quantity: Decimal::new(quantity, 0),
            reason: TransactionReason::Purchase,
            cost: None,
            sku: None,
            notes: None,
            user_id: Uuid::nil(),
            created_at: Utc::now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn breakdown_groups_by_category() {
        let items = vec![
            item(ItemCategory::Produce, 10, 2, 3),
            item(ItemCategory::Produce, 1, 2, 5),
            item(ItemCategory::Dairy, 4, 1, 2),
        ];
        let rows = breakdown(&items);
        assert_eq!(rows.len(), 2);

        let produce = &rows[0];
        assert_eq!(produce.category, ItemCategory::Produce);
        assert_eq!(produce.item_count, 2);
        assert_eq!(produce.low_stock_count, 1);
        assert_eq!(produce.value, Decimal::new(35, 0));
    }

    #[test]
    fn only_the_latest_three_purchases_are_kept() {
        let item_id = Uuid::new_v4();
        let mut transactions: Vec<_> = (1..=5).map(|d| purchase(item_id, d, d)).collect();
        let mut waste = purchase(item_id, 9, 0);
        waste.transaction_type = TransactionType::Out;
        waste.reason = TransactionReason::Waste;
        transactions.push(waste);

        let recent = recent_purchases(item_id, &transactions);
        let quantities: Vec<_> = recent.iter().map(|p| p.quantity).collect();
        assert_eq!(
            quantities,
            vec![Decimal::new(1, 0), Decimal::new(2, 0), Decimal::new(3, 0)]
        );
    }

    #[test]
    fn csv_has_a_line_per_purchase() {
        let row = SupplierPurchaseRow {
            supplier_id: Uuid::new_v4(),
            supplier_name: "Dairy Direct".to_string(),
            item_id: Uuid::new_v4(),
            item_name: "Mozzarella".to_string(),
            unit: Unit::Kg,
            current_stock: Decimal::new(4, 0),
            recent_purchases: vec![
                PurchaseSummary {
                    transaction_id: Uuid::new_v4(),
                    quantity: Decimal::new(2, 0),
                    cost: Some(Decimal::new(1250, 2)),
                    created_at: Utc::now(),
                },
                PurchaseSummary {
                    transaction_id: Uuid::new_v4(),
                    quantity: Decimal::new(3, 0),
                    cost: None,
                    created_at: Utc::now(),
                },
            ],
        };

        let csv = purchases_to_csv(&[row]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("supplier,item,unit"));
        assert!(lines[1].starts_with("Dairy Direct,Mozzarella,kg,4,"));
    }

    #[tokio::test]
    async fn staff_can_read_the_dashboard() {
        let repo = Arc::new(crate::repository::InMemoryRepository::new());
        let service = AnalyticsService::new(repo);
        let staff = User {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            email: "staff@example.com".to_string(),
            full_name: "Staff".to_string(),
            role: Role::Staff,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let metrics = service.dashboard(&staff).await.unwrap();
        assert_eq!(metrics.total_items, 0);
        assert_eq!(metrics.inventory_value_formatted, "$0.00");
    }
}
