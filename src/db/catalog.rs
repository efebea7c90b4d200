//! Badge catalog persistence
//!
//! Registering a badge also seeds its inventory row at quantity zero, so
//! every catalog entry always has a stock level.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::error::Result;
use crate::models::{CatalogEntry, CatalogSnapshot};

/// Insert or update a catalog entry and ensure its inventory row exists
pub async fn save_badge(pool: &SqlitePool, entry: &CatalogEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO badges (badge_id, name, category)
        VALUES (?, ?, ?)
        ON CONFLICT(badge_id) DO UPDATE SET
            name = excluded.name,
            category = excluded.category
        "#,
    )
    .bind(&entry.badge_id)
    .bind(&entry.name)
    .bind(&entry.category)
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO inventory (badge_id, quantity, last_updated)
        VALUES (?, 0, ?)
        ON CONFLICT(badge_id) DO NOTHING
        "#,
    )
    .bind(&entry.badge_id)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Load the full catalog, ordered by name
pub async fn load_catalog(pool: &SqlitePool) -> Result<CatalogSnapshot> {
    let rows = sqlx::query("SELECT badge_id, name, category FROM badges ORDER BY name")
        .fetch_all(pool)
        .await?;

    let entries = rows
        .iter()
        .map(|row| CatalogEntry {
            badge_id: row.get("badge_id"),
            name: row.get("name"),
            category: row.get("category"),
        })
        .collect();

    Ok(CatalogSnapshot::new(entries))
}

/// Load one catalog entry
pub async fn get_badge(pool: &SqlitePool, badge_id: &str) -> Result<Option<CatalogEntry>> {
    let row = sqlx::query("SELECT badge_id, name, category FROM badges WHERE badge_id = ?")
        .bind(badge_id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|row| CatalogEntry {
        badge_id: row.get("badge_id"),
        name: row.get("name"),
        category: row.get("category"),
    }))
}
