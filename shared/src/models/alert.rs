//! Stock alert models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::string_enum! {
    /// Kinds of stock alert
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AlertType: "alert type" {
        LowStock => "low_stock",
        OutOfStock => "out_of_stock",
    }
}

/// An alert raised when an item's stock falls to or below its threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub item_id: Uuid,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
