//! Scan and scan-image persistence
//!
//! Scan status is the source of truth for the processing state machine;
//! the background processor writes progress here and the status endpoint
//! reads it back.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::db::parse_timestamp;
use crate::error::{Error, Result};
use crate::models::{Scan, ScanImage, ScanStatus};

/// Create a new scan in `pending` state
pub async fn create_scan(pool: &SqlitePool) -> Result<i64> {
    let result = sqlx::query("INSERT INTO scans (status, created_at) VALUES ('pending', ?)")
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

/// Attach an uploaded image to a scan and bump its image count
pub async fn add_scan_image(pool: &SqlitePool, scan_id: i64, image_path: &str) -> Result<i64> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO scan_images (scan_id, image_path, status, uploaded_at) VALUES (?, ?, 'pending', ?)",
    )
    .bind(scan_id)
    .bind(image_path)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *tx)
    .await?;

    sqlx::query("UPDATE scans SET total_images = total_images + 1 WHERE id = ?")
        .bind(scan_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(result.last_insert_rowid())
}

/// Load one scan
pub async fn get_scan(pool: &SqlitePool, scan_id: i64) -> Result<Option<Scan>> {
    let row = sqlx::query(
        "SELECT id, status, total_images, processed_images, progress_message, created_at FROM scans WHERE id = ?",
    )
    .bind(scan_id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let status_str: String = row.get("status");
            let created_at_str: String = row.get("created_at");
            Ok(Some(Scan {
                id: row.get("id"),
                status: ScanStatus::parse(&status_str)?,
                total_images: row.get("total_images"),
                processed_images: row.get("processed_images"),
                progress_message: row.get("progress_message"),
                created_at: parse_timestamp(&created_at_str)?,
            }))
        }
        None => Ok(None),
    }
}

/// Load a scan's images in upload order
pub async fn list_scan_images(pool: &SqlitePool, scan_id: i64) -> Result<Vec<ScanImage>> {
    let rows = sqlx::query(
        "SELECT id, scan_id, image_path, status, uploaded_at, processed_at FROM scan_images WHERE scan_id = ? ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    let mut images = Vec::with_capacity(rows.len());
    for row in rows {
        let status_str: String = row.get("status");
        let uploaded_at_str: String = row.get("uploaded_at");
        let processed_at_str: Option<String> = row.get("processed_at");
        images.push(ScanImage {
            id: row.get("id"),
            scan_id: row.get("scan_id"),
            image_path: row.get("image_path"),
            status: ScanStatus::parse(&status_str)?,
            uploaded_at: parse_timestamp(&uploaded_at_str)?,
            processed_at: processed_at_str
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        });
    }
    Ok(images)
}

/// Atomically move a scan from `pending` to `processing`.
///
/// Returns false if the scan was not pending, so a second process request
/// cannot start a duplicate run.
pub async fn try_claim_scan(pool: &SqlitePool, scan_id: i64) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE scans SET status = 'processing', progress_message = 'Starting scan processing' WHERE id = ? AND status = 'pending'",
    )
    .bind(scan_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Set a scan's terminal (or intermediate) status
pub async fn update_scan_status(
    pool: &SqlitePool,
    scan_id: i64,
    status: ScanStatus,
    message: Option<&str>,
) -> Result<()> {
    let result = sqlx::query("UPDATE scans SET status = ?, progress_message = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(message)
        .bind(scan_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Scan {} not found", scan_id)));
    }
    Ok(())
}

/// Update processed-image count and progress message mid-run
pub async fn update_scan_progress(
    pool: &SqlitePool,
    scan_id: i64,
    processed_images: i64,
    message: &str,
) -> Result<()> {
    sqlx::query("UPDATE scans SET processed_images = ?, progress_message = ? WHERE id = ?")
        .bind(processed_images)
        .bind(message)
        .bind(scan_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Set an image's status; stamps `processed_at` on terminal states
pub async fn update_image_status(
    pool: &SqlitePool,
    image_id: i64,
    status: ScanStatus,
) -> Result<()> {
    let processed_at = status.is_terminal().then(|| Utc::now().to_rfc3339());

    sqlx::query("UPDATE scan_images SET status = ?, processed_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(processed_at)
        .bind(image_id)
        .execute(pool)
        .await?;
    Ok(())
}
