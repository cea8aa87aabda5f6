//! Stock transaction service
//!
//! The only way stock moves. Every movement is appended to the ledger and
//! applied to the item in one repository call, and any alert the movement
//! raises is pushed to realtime subscribers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    can_update_fields, can_update_transaction, validation, Action, Actor, PermissionError,
    StockTransaction, Subject, SyncFailure, SyncReport, TransactionReason, TransactionType,
};
use uuid::Uuid;
use validator::Validate;

use super::{authorize, AlertFeed};
use crate::error::{AppError, AppResult};
use crate::repository::{Repository, StockMovement};

#[derive(Clone)]
pub struct StockService {
    repo: Arc<dyn Repository>,
    feed: AlertFeed,
}

/// Input for recording a stock movement
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordTransactionInput {
    /// Client-generated id, set by offline clients so replays are idempotent
    #[serde(default)]
    pub id: Option<Uuid>,
    pub item_id: Uuid,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub reason: TransactionReason,
    pub cost: Option<Decimal>,
    #[validate(length(max = 64, message = "SKU must be at most 64 characters"))]
    pub sku: Option<String>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    /// When the movement happened, for transactions recorded offline
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<StockTransaction> for RecordTransactionInput {
    fn from(t: StockTransaction) -> Self {
        Self {
            id: Some(t.id),
            item_id: t.item_id,
            transaction_type: t.transaction_type,
            quantity: t.quantity,
            reason: t.reason,
            cost: t.cost,
            sku: t.sku,
            notes: t.notes,
            created_at: Some(t.created_at),
        }
    }
}

/// Partial update of a transaction; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTransactionInput {
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    pub quantity: Option<Decimal>,
    pub reason: Option<TransactionReason>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
    pub cost: Option<Decimal>,
    #[validate(length(max = 64, message = "SKU must be at most 64 characters"))]
    pub sku: Option<String>,
}

impl UpdateTransactionInput {
    /// Names of the fields this update touches
    pub fn fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.transaction_type.is_some() {
            fields.push("type");
        }
        if self.quantity.is_some() {
            fields.push("quantity");
        }
        if self.reason.is_some() {
            fields.push("reason");
        }
        if self.notes.is_some() {
            fields.push("notes");
        }
        if self.cost.is_some() {
            fields.push("cost");
        }
        if self.sku.is_some() {
            fields.push("sku");
        }
        fields
    }
}

/// A movement generated by the system rather than picked by a user:
/// recipe depletion, sale reversal or a stock correction.
#[derive(Debug, Clone)]
pub(crate) struct SystemMovement {
    pub item_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: Decimal,
    pub reason: TransactionReason,
    pub notes: String,
}

fn invalid(field: &str) -> impl FnOnce(&'static str) -> AppError + '_ {
    move |message| AppError::validation(field, message)
}

impl StockService {
    pub fn new(repo: Arc<dyn Repository>, feed: AlertFeed) -> Self {
        Self { repo, feed }
    }

    pub async fn list(
        &self,
        actor: &impl Actor,
        item_id: Option<Uuid>,
    ) -> AppResult<Vec<StockTransaction>> {
        authorize(actor, Action::Read, Subject::StockTransaction)?;
        self.repo.list_transactions(actor.restaurant_id(), item_id).await
    }

    pub async fn get(
        &self,
        actor: &impl Actor,
        transaction_id: Uuid,
    ) -> AppResult<StockTransaction> {
        authorize(actor, Action::Read, Subject::StockTransaction)?;
        self.repo
            .get_transaction(actor.restaurant_id(), transaction_id)
            .await?
            .ok_or_else(|| AppError::not_found("Stock transaction"))
    }

    /// Record a user-entered stock movement
    pub async fn record(
        &self,
        actor: &impl Actor,
        input: RecordTransactionInput,
    ) -> AppResult<StockMovement> {
        authorize(actor, Action::Create, Subject::StockTransaction)?;
        input.validate()?;
        validation::validate_quantity(input.quantity).map_err(invalid("quantity"))?;
        validation::validate_transaction_reason(input.transaction_type, input.reason)
            .map_err(invalid("reason"))?;
        validation::validate_cost(input.cost).map_err(invalid("cost"))?;

        let now = Utc::now();
        // A clock running ahead on an offline device must not extend the edit window
        let created_at = input.created_at.map_or(now, |at| at.min(now));

        let transaction = StockTransaction {
            id: input.id.unwrap_or_else(Uuid::new_v4),
            restaurant_id: actor.restaurant_id(),
            item_id: input.item_id,
            transaction_type: input.transaction_type,
            quantity: input.quantity,
            reason: input.reason,
            cost: input.cost,
            sku: input.sku,
            notes: input.notes,
            user_id: actor.user_id(),
            created_at,
        };
        self.commit(transaction).await
    }

    /// Record a system-generated movement on behalf of `actor`
    pub(crate) async fn record_system(
        &self,
        actor: &impl Actor,
        movement: SystemMovement,
    ) -> AppResult<StockMovement> {
        authorize(actor, Action::Create, Subject::StockTransaction)?;
        validation::validate_quantity(movement.quantity).map_err(invalid("quantity"))?;
        if !movement.reason.allowed_for(movement.transaction_type) {
            return Err(AppError::validation("reason", "Reason does not match direction"));
        }

        let transaction = StockTransaction {
            id: Uuid::new_v4(),
            restaurant_id: actor.restaurant_id(),
            item_id: movement.item_id,
            transaction_type: movement.transaction_type,
            quantity: movement.quantity,
            reason: movement.reason,
            cost: None,
            sku: None,
            notes: Some(movement.notes),
            user_id: actor.user_id(),
            created_at: Utc::now(),
        };
        self.commit(transaction).await
    }

    async fn commit(&self, transaction: StockTransaction) -> AppResult<StockMovement> {
        let movement = self.repo.apply_transaction(transaction).await?;

        tracing::info!(
            transaction_id = %movement.transaction.id,
            item_id = %movement.item.id,
            kind = %movement.transaction.transaction_type,
            reason = %movement.transaction.reason,
            quantity = %movement.transaction.quantity,
            stock = %movement.item.current_stock,
            "Recorded stock transaction"
        );

        if let Some(alert) = &movement.alert {
            tracing::info!(
                item_id = %alert.item_id,
                alert_type = %alert.alert_type,
                "Stock alert raised"
            );
            self.feed.publish(alert.clone());
        }
        Ok(movement)
    }

    /// Edit a recorded transaction. Staff may only touch quantity, reason and
    /// notes, and only within the edit window.
    pub async fn update(
        &self,
        actor: &impl Actor,
        transaction_id: Uuid,
        input: UpdateTransactionInput,
    ) -> AppResult<StockMovement> {
        authorize(actor, Action::Update, Subject::StockTransaction)?;
        input.validate()?;

        if !can_update_fields(Some(actor), Subject::StockTransaction, &input.fields()) {
            return Err(PermissionError::RestrictedFields.into());
        }

        let current = self.get(actor, transaction_id).await?;
        if !can_update_transaction(Some(actor), current.created_at) {
            return Err(PermissionError::TransactionTooOld.into());
        }

        let mut updated = current.clone();
        if let Some(kind) = input.transaction_type {
            updated.transaction_type = kind;
        }
        if let Some(quantity) = input.quantity {
            validation::validate_quantity(quantity).map_err(invalid("quantity"))?;
            updated.quantity = quantity;
        }
        if let Some(reason) = input.reason {
            validation::validate_transaction_reason(updated.transaction_type, reason)
                .map_err(invalid("reason"))?;
            updated.reason = reason;
        } else if !updated.reason.allowed_for(updated.transaction_type) {
            return Err(AppError::validation("reason", "Reason does not match direction"));
        }
        if input.cost.is_some() {
            validation::validate_cost(input.cost).map_err(invalid("cost"))?;
            updated.cost = input.cost;
        }
        if input.notes.is_some() {
            updated.notes = input.notes;
        }
        if input.sku.is_some() {
            updated.sku = input.sku;
        }

        let movement = self.repo.amend_transaction(updated).await?;
        tracing::info!(
            transaction_id = %transaction_id,
            user_id = %actor.user_id(),
            stock = %movement.item.current_stock,
            "Updated stock transaction"
        );
        if let Some(alert) = &movement.alert {
            self.feed.publish(alert.clone());
        }
        Ok(movement)
    }

    /// Apply transactions queued by an offline client.
    ///
    /// Entries are applied in order; each one succeeds or fails on its own.
    /// An entry whose id is already recorded counts as synced so a client
    /// retrying after a lost response does not double-count stock.
    pub async fn sync_offline(
        &self,
        actor: &impl Actor,
        entries: Vec<RecordTransactionInput>,
    ) -> AppResult<SyncReport> {
        authorize(actor, Action::Create, Subject::StockTransaction)?;
        let mut report = SyncReport::default();

        for mut entry in entries {
            let id = *entry.id.get_or_insert_with(Uuid::new_v4);

            if self
                .repo
                .get_transaction(actor.restaurant_id(), id)
                .await?
                .is_some()
            {
                report.synced.push(id);
                continue;
            }

            match self.record(actor, entry).await {
                Ok(_) => report.synced.push(id),
                Err(e) => {
                    tracing::warn!(
                        transaction_id = %id,
                        error = %e,
                        "Offline transaction rejected"
                    );
                    report.failed.push(SyncFailure {
                        transaction_id: id,
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            "Applied offline transactions"
        );
        Ok(report)
    }
}
