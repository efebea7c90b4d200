//! Inventory persistence and the adjustment audit trail
//!
//! Every quantity mutation runs in one transaction: re-read the current
//! quantity, validate the result is non-negative, update the stock level,
//! and append an audit row. The re-read inside the transaction is what
//! prevents lost updates between concurrent adjustments.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::db::parse_timestamp;
use crate::error::{Error, Result};
use crate::models::{AdjustmentRecord, InventoryRecord, QuantityChange};

/// Full inventory, joined with catalog data, ordered by name
pub async fn list_inventory(pool: &SqlitePool) -> Result<Vec<InventoryRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT b.badge_id, b.name, b.category, b.reorder_threshold,
               i.quantity, i.last_updated
        FROM inventory i
        JOIN badges b ON b.badge_id = i.badge_id
        ORDER BY b.name
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        records.push(record_from_row(&row)?);
    }
    Ok(records)
}

/// Inventory record for one badge
pub async fn get_inventory(pool: &SqlitePool, badge_id: &str) -> Result<InventoryRecord> {
    let row = sqlx::query(
        r#"
        SELECT b.badge_id, b.name, b.category, b.reorder_threshold,
               i.quantity, i.last_updated
        FROM inventory i
        JOIN badges b ON b.badge_id = i.badge_id
        WHERE b.badge_id = ?
        "#,
    )
    .bind(badge_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => record_from_row(&row),
        None => Err(Error::NotFound(format!("Badge {} not found", badge_id))),
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<InventoryRecord> {
    let quantity: i64 = row.get("quantity");
    let reorder_threshold: i64 = row.get("reorder_threshold");
    let last_updated_str: String = row.get("last_updated");

    Ok(InventoryRecord {
        badge_id: row.get("badge_id"),
        name: row.get("name"),
        category: row.get("category"),
        quantity,
        reorder_threshold,
        is_low_stock: quantity <= reorder_threshold,
        last_updated: parse_timestamp(&last_updated_str)?,
    })
}

/// Apply a signed quantity delta with an audit record.
///
/// Rejects any adjustment that would drive the quantity negative; nothing is
/// written in that case.
pub async fn apply_adjustment(
    pool: &SqlitePool,
    badge_id: &str,
    adjustment: i64,
    reason: &str,
    scan_id: Option<i64>,
) -> Result<QuantityChange> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT quantity FROM inventory WHERE badge_id = ?")
        .bind(badge_id)
        .fetch_optional(&mut *tx)
        .await?;

    let old_quantity: i64 = match row {
        Some(row) => row.get("quantity"),
        None => {
            return Err(Error::NotFound(format!("Badge {} not found", badge_id)));
        }
    };

    let new_quantity = old_quantity + adjustment;
    if new_quantity < 0 {
        // Transaction dropped without commit, no writes happen
        return Err(Error::InvalidInput(format!(
            "Adjustment of {} would make quantity negative (current: {})",
            adjustment, old_quantity
        )));
    }

    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE inventory SET quantity = ?, last_updated = ? WHERE badge_id = ?")
        .bind(new_quantity)
        .bind(&now)
        .bind(badge_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_adjustments
            (badge_id, old_quantity, new_quantity, adjustment, reason, scan_id, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(badge_id)
    .bind(old_quantity)
    .bind(new_quantity)
    .bind(adjustment)
    .bind(reason)
    .bind(scan_id)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        badge_id = %badge_id,
        old_quantity,
        new_quantity,
        adjustment,
        "Inventory adjusted"
    );

    Ok(QuantityChange {
        old_quantity,
        new_quantity,
        adjustment,
    })
}

/// Set an absolute quantity; audited as the equivalent delta.
///
/// The delta is computed from a re-read inside the same transaction that
/// writes, so a concurrent adjustment cannot skew the final quantity away
/// from the requested value.
pub async fn set_quantity(
    pool: &SqlitePool,
    badge_id: &str,
    quantity: i64,
    reason: &str,
) -> Result<QuantityChange> {
    if quantity < 0 {
        return Err(Error::InvalidInput(format!(
            "Quantity cannot be negative, got {}",
            quantity
        )));
    }

    let mut tx = pool.begin().await?;

    let row = sqlx::query("SELECT quantity FROM inventory WHERE badge_id = ?")
        .bind(badge_id)
        .fetch_optional(&mut *tx)
        .await?;

    let old_quantity: i64 = match row {
        Some(row) => row.get("quantity"),
        None => {
            return Err(Error::NotFound(format!("Badge {} not found", badge_id)));
        }
    };

    let adjustment = quantity - old_quantity;
    let now = Utc::now().to_rfc3339();

    sqlx::query("UPDATE inventory SET quantity = ?, last_updated = ? WHERE badge_id = ?")
        .bind(quantity)
        .bind(&now)
        .bind(badge_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory_adjustments
            (badge_id, old_quantity, new_quantity, adjustment, reason, scan_id, timestamp)
        VALUES (?, ?, ?, ?, ?, NULL, ?)
        "#,
    )
    .bind(badge_id)
    .bind(old_quantity)
    .bind(quantity)
    .bind(adjustment)
    .bind(reason)
    .bind(&now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        badge_id = %badge_id,
        old_quantity,
        new_quantity = quantity,
        adjustment,
        "Inventory quantity set"
    );

    Ok(QuantityChange {
        old_quantity,
        new_quantity: quantity,
        adjustment,
    })
}

/// Recent audit records, newest first, optionally filtered to one badge
pub async fn list_adjustments(
    pool: &SqlitePool,
    badge_id: Option<&str>,
    limit: i64,
) -> Result<Vec<AdjustmentRecord>> {
    let rows = match badge_id {
        Some(badge_id) => {
            sqlx::query(
                r#"
                SELECT id, badge_id, old_quantity, new_quantity, adjustment, reason, scan_id, timestamp
                FROM inventory_adjustments
                WHERE badge_id = ?
                ORDER BY id DESC
                LIMIT ?
                "#,
            )
            .bind(badge_id)
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT id, badge_id, old_quantity, new_quantity, adjustment, reason, scan_id, timestamp
                FROM inventory_adjustments
                ORDER BY id DESC
                LIMIT ?
                "#,
            )
            .bind(limit)
            .fetch_all(pool)
            .await?
        }
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let timestamp_str: String = row.get("timestamp");
        records.push(AdjustmentRecord {
            id: row.get("id"),
            badge_id: row.get("badge_id"),
            old_quantity: row.get("old_quantity"),
            new_quantity: row.get("new_quantity"),
            adjustment: row.get("adjustment"),
            reason: row.get("reason"),
            scan_id: row.get("scan_id"),
            timestamp: parse_timestamp(&timestamp_str)?,
        });
    }
    Ok(records)
}
