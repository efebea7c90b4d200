//! Database access for the badge inventory service
//!
//! One SQLite database holds the badge catalog, current inventory, the
//! append-only adjustment audit trail, and all scan-processing state.
//! Tables are created on startup if missing; timestamps are stored as
//! RFC3339 TEXT.

pub mod catalog;
pub mod detections;
pub mod inventory;
pub mod scans;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::error::{Error, Result};

/// Initialize the connection pool and create tables.
///
/// `":memory:"` gives a single-connection in-memory database (used by tests;
/// more than one connection would each see a different empty database).
pub async fn init_pool(database_path: &str) -> Result<SqlitePool> {
    let pool = if database_path == ":memory:" {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?
    } else {
        let path = Path::new(database_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!(path = %database_path, "Connecting to database");
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);
        SqlitePoolOptions::new().connect_with(options).await?
    };

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create the schema if it doesn't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badges (
            badge_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            reorder_threshold INTEGER NOT NULL DEFAULT 5
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory (
            badge_id TEXT PRIMARY KEY REFERENCES badges(badge_id) ON DELETE CASCADE,
            quantity INTEGER NOT NULL DEFAULT 0 CHECK (quantity >= 0),
            last_updated TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            status TEXT NOT NULL DEFAULT 'pending',
            total_images INTEGER NOT NULL DEFAULT 0,
            processed_images INTEGER NOT NULL DEFAULT 0,
            progress_message TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scan_images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_id INTEGER NOT NULL REFERENCES scans(id) ON DELETE CASCADE,
            image_path TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            uploaded_at TEXT NOT NULL,
            processed_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS badge_detections (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            scan_image_id INTEGER NOT NULL REFERENCES scan_images(id) ON DELETE CASCADE,
            badge_id TEXT NOT NULL REFERENCES badges(badge_id) ON DELETE CASCADE,
            badge_name TEXT NOT NULL,
            detected_name TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            confidence REAL NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS inventory_adjustments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            badge_id TEXT NOT NULL REFERENCES badges(badge_id) ON DELETE CASCADE,
            old_quantity INTEGER NOT NULL,
            new_quantity INTEGER NOT NULL,
            adjustment INTEGER NOT NULL,
            reason TEXT NOT NULL DEFAULT '',
            scan_id INTEGER REFERENCES scans(id) ON DELETE SET NULL,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized");
    Ok(())
}

/// Parse an RFC3339 TEXT timestamp from a database column
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Invalid timestamp {:?}: {}", s, e)))
}
