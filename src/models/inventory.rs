//! Inventory and audit-trail types

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Current stock level for one badge type
#[derive(Debug, Clone, Serialize)]
pub struct InventoryRecord {
    pub badge_id: String,
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub reorder_threshold: i64,
    pub is_low_stock: bool,
    pub last_updated: DateTime<Utc>,
}

/// One audit-log entry; append-only, immutable after creation
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentRecord {
    pub id: i64,
    pub badge_id: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub adjustment: i64,
    pub reason: String,
    pub scan_id: Option<i64>,
    pub timestamp: DateTime<Utc>,
}

/// Before/after quantities from a successful mutation
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuantityChange {
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub adjustment: i64,
}
