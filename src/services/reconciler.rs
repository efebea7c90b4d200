//! Scan-to-inventory reconciliation
//!
//! Turns a completed scan's aggregated detections into inventory additions,
//! one audited adjustment per badge. Preview mode computes the same changes
//! without writing anything, so an operator can review before applying.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::{detections, inventory, scans};
use crate::error::{Error, Result};
use crate::models::ScanStatus;

/// One badge's inventory change from a reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationChange {
    pub badge_id: String,
    pub badge_name: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub adjustment: i64,
}

/// Outcome of reconciling one scan against inventory
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub scan_id: i64,
    /// True when nothing was written
    pub preview: bool,
    pub changes: Vec<ReconciliationChange>,
}

/// Apply (or preview) a completed scan's detections as inventory additions.
///
/// Only `completed` scans are eligible; each badge gets one adjustment equal
/// to its summed detected quantity, with the scan id on the audit record.
pub async fn update_from_scan(
    pool: &SqlitePool,
    scan_id: i64,
    preview: bool,
) -> Result<ReconciliationReport> {
    let scan = scans::get_scan(pool, scan_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Scan {} not found", scan_id)))?;

    if scan.status != ScanStatus::Completed {
        return Err(Error::Conflict(format!(
            "Scan {} is {}, only completed scans can update inventory",
            scan_id,
            scan.status.as_str()
        )));
    }

    let totals = detections::aggregate_detections(pool, scan_id).await?;
    let mut changes = Vec::with_capacity(totals.len());

    for total in totals {
        let change = if preview {
            let current = inventory::get_inventory(pool, &total.badge_id).await?;
            ReconciliationChange {
                badge_id: total.badge_id,
                badge_name: total.badge_name,
                old_quantity: current.quantity,
                new_quantity: current.quantity + total.total_quantity,
                adjustment: total.total_quantity,
            }
        } else {
            let reason = format!("Detected in scan {}", scan_id);
            let applied = inventory::apply_adjustment(
                pool,
                &total.badge_id,
                total.total_quantity,
                &reason,
                Some(scan_id),
            )
            .await?;
            ReconciliationChange {
                badge_id: total.badge_id,
                badge_name: total.badge_name,
                old_quantity: applied.old_quantity,
                new_quantity: applied.new_quantity,
                adjustment: applied.adjustment,
            }
        };
        changes.push(change);
    }

    if !preview {
        info!(scan_id, badges = changes.len(), "Inventory updated from scan");
    }

    Ok(ReconciliationReport {
        scan_id,
        preview,
        changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{catalog, init_pool};
    use crate::models::{BadgeMatch, CatalogEntry};

    async fn seeded_scan(pool: &SqlitePool, status: ScanStatus) -> i64 {
        for (id, name) in [("b1", "Bushcraft"), ("b2", "Milestone 1")] {
            catalog::save_badge(
                pool,
                &CatalogEntry {
                    badge_id: id.to_string(),
                    name: name.to_string(),
                    category: "Test".to_string(),
                },
            )
            .await
            .unwrap();
        }

        let scan_id = scans::create_scan(pool).await.unwrap();
        let img1 = scans::add_scan_image(pool, scan_id, "/img/a.jpg").await.unwrap();
        let img2 = scans::add_scan_image(pool, scan_id, "/img/b.jpg").await.unwrap();

        let m = |badge_id: &str, name: &str| BadgeMatch {
            badge_id: badge_id.to_string(),
            matched_name: name.to_string(),
            detected_name: name.to_lowercase(),
            match_score: 95.0,
            confidence_score: 0.9,
            matched: true,
            category: Some("Test".to_string()),
        };
        // b1 appears in both images: 2 + 3 = 5; plus one more detection of 1
        detections::insert_detection(pool, img1, &m("b1", "Bushcraft"), 2).await.unwrap();
        detections::insert_detection(pool, img2, &m("b1", "Bushcraft"), 3).await.unwrap();
        detections::insert_detection(pool, img2, &m("b1", "Bushcraft"), 1).await.unwrap();
        detections::insert_detection(pool, img1, &m("b2", "Milestone 1"), 4).await.unwrap();

        scans::update_scan_status(pool, scan_id, status, None).await.unwrap();
        scan_id
    }

    #[tokio::test]
    async fn test_apply_aggregates_and_audits() {
        let pool = init_pool(":memory:").await.unwrap();
        let scan_id = seeded_scan(&pool, ScanStatus::Completed).await;

        let report = update_from_scan(&pool, scan_id, false).await.unwrap();
        assert!(!report.preview);
        assert_eq!(report.changes.len(), 2);

        // 2 + 3 + 1 aggregates to a single +6 adjustment
        let b1 = &report.changes[0];
        assert_eq!(b1.badge_id, "b1");
        assert_eq!(b1.old_quantity, 0);
        assert_eq!(b1.adjustment, 6);
        assert_eq!(b1.new_quantity, 6);

        assert_eq!(inventory::get_inventory(&pool, "b1").await.unwrap().quantity, 6);
        assert_eq!(inventory::get_inventory(&pool, "b2").await.unwrap().quantity, 4);

        // One audit row per badge, tagged with the scan id
        let audit = inventory::list_adjustments(&pool, Some("b1"), 10).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].scan_id, Some(scan_id));
        assert!(audit[0].reason.contains(&format!("scan {}", scan_id)));
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let pool = init_pool(":memory:").await.unwrap();
        let scan_id = seeded_scan(&pool, ScanStatus::Completed).await;

        let report = update_from_scan(&pool, scan_id, true).await.unwrap();
        assert!(report.preview);
        assert_eq!(report.changes[0].new_quantity, 6);

        // Quantities untouched, no audit rows
        assert_eq!(inventory::get_inventory(&pool, "b1").await.unwrap().quantity, 0);
        assert!(inventory::list_adjustments(&pool, None, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_incomplete_scan_is_a_conflict() {
        let pool = init_pool(":memory:").await.unwrap();
        let scan_id = seeded_scan(&pool, ScanStatus::Processing).await;

        let err = update_from_scan(&pool, scan_id, false).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_missing_scan_not_found() {
        let pool = init_pool(":memory:").await.unwrap();
        let err = update_from_scan(&pool, 42, false).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_applying_twice_creates_two_adjustments() {
        let pool = init_pool(":memory:").await.unwrap();
        let scan_id = seeded_scan(&pool, ScanStatus::Completed).await;

        update_from_scan(&pool, scan_id, false).await.unwrap();
        update_from_scan(&pool, scan_id, false).await.unwrap();

        // Each application is a separate audited adjustment
        assert_eq!(inventory::get_inventory(&pool, "b1").await.unwrap().quantity, 12);
        let audit = inventory::list_adjustments(&pool, Some("b1"), 10).await.unwrap();
        assert_eq!(audit.len(), 2);
    }
}
