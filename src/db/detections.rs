//! Badge detection persistence
//!
//! Only catalog-matched detections are stored; unmatched names are logged
//! and dropped by the processor. Aggregation across a scan groups by badge
//! so the same badge seen in several photos sums up.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::db::parse_timestamp;
use crate::error::Result;
use crate::models::{BadgeMatch, StoredDetection};

/// Aggregated detection total for one badge across a whole scan
#[derive(Debug, Clone, serde::Serialize)]
pub struct DetectionTotal {
    pub badge_id: String,
    pub badge_name: String,
    pub total_quantity: i64,
}

/// Persist one matched detection
pub async fn insert_detection(
    pool: &SqlitePool,
    scan_image_id: i64,
    badge_match: &BadgeMatch,
    quantity: i64,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO badge_detections
            (scan_image_id, badge_id, badge_name, detected_name, quantity, confidence, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(scan_image_id)
    .bind(&badge_match.badge_id)
    .bind(&badge_match.matched_name)
    .bind(&badge_match.detected_name)
    .bind(quantity)
    .bind(badge_match.confidence_score)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// All stored detections for a scan, in insertion order
pub async fn list_detections_for_scan(
    pool: &SqlitePool,
    scan_id: i64,
) -> Result<Vec<StoredDetection>> {
    let rows = sqlx::query(
        r#"
        SELECT d.id, d.scan_image_id, d.badge_id, d.badge_name, d.detected_name,
               d.quantity, d.confidence, d.created_at
        FROM badge_detections d
        JOIN scan_images i ON i.id = d.scan_image_id
        WHERE i.scan_id = ?
        ORDER BY d.id
        "#,
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    let mut detections = Vec::with_capacity(rows.len());
    for row in rows {
        let created_at_str: String = row.get("created_at");
        detections.push(StoredDetection {
            id: row.get("id"),
            scan_image_id: row.get("scan_image_id"),
            badge_id: row.get("badge_id"),
            badge_name: row.get("badge_name"),
            detected_name: row.get("detected_name"),
            quantity: row.get("quantity"),
            confidence: row.get("confidence"),
            created_at: parse_timestamp(&created_at_str)?,
        });
    }
    Ok(detections)
}

/// Sum detected quantities per badge across every image in a scan
pub async fn aggregate_detections(pool: &SqlitePool, scan_id: i64) -> Result<Vec<DetectionTotal>> {
    let rows = sqlx::query(
        r#"
        SELECT d.badge_id, b.name AS badge_name, SUM(d.quantity) AS total_quantity
        FROM badge_detections d
        JOIN scan_images i ON i.id = d.scan_image_id
        JOIN badges b ON b.badge_id = d.badge_id
        WHERE i.scan_id = ?
        GROUP BY d.badge_id
        ORDER BY b.name
        "#,
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| DetectionTotal {
            badge_id: row.get("badge_id"),
            badge_name: row.get("badge_name"),
            total_quantity: row.get("total_quantity"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{catalog, init_pool, scans};
    use crate::models::CatalogEntry;

    fn badge_match(badge_id: &str, name: &str) -> BadgeMatch {
        BadgeMatch {
            badge_id: badge_id.to_string(),
            matched_name: name.to_string(),
            detected_name: name.to_lowercase(),
            match_score: 95.0,
            confidence_score: 0.9,
            matched: true,
            category: Some("Test".to_string()),
        }
    }

    async fn seed(pool: &SqlitePool) -> (i64, i64, i64) {
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
        let img1 = scans::add_scan_image(pool, scan_id, "/tmp/a.jpg").await.unwrap();
        let img2 = scans::add_scan_image(pool, scan_id, "/tmp/b.jpg").await.unwrap();
        (scan_id, img1, img2)
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let pool = init_pool(":memory:").await.unwrap();
        let (scan_id, img1, img2) = seed(&pool).await;

        insert_detection(&pool, img1, &badge_match("b1", "Bushcraft"), 2)
            .await
            .unwrap();
        insert_detection(&pool, img2, &badge_match("b2", "Milestone 1"), 1)
            .await
            .unwrap();

        let detections = list_detections_for_scan(&pool, scan_id).await.unwrap();
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].badge_id, "b1");
        assert_eq!(detections[0].quantity, 2);
        assert_eq!(detections[1].scan_image_id, img2);
    }

    #[tokio::test]
    async fn test_aggregation_sums_across_images() {
        let pool = init_pool(":memory:").await.unwrap();
        let (scan_id, img1, img2) = seed(&pool).await;

        // Same badge in three detections across two images: 2 + 3 + 1 = 6
        insert_detection(&pool, img1, &badge_match("b1", "Bushcraft"), 2)
            .await
            .unwrap();
        insert_detection(&pool, img1, &badge_match("b1", "Bushcraft"), 3)
            .await
            .unwrap();
        insert_detection(&pool, img2, &badge_match("b1", "Bushcraft"), 1)
            .await
            .unwrap();
        insert_detection(&pool, img2, &badge_match("b2", "Milestone 1"), 4)
            .await
            .unwrap();

        let totals = aggregate_detections(&pool, scan_id).await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].badge_id, "b1");
        assert_eq!(totals[0].total_quantity, 6);
        assert_eq!(totals[1].badge_id, "b2");
        assert_eq!(totals[1].total_quantity, 4);
    }

    #[tokio::test]
    async fn test_aggregation_scoped_to_scan() {
        let pool = init_pool(":memory:").await.unwrap();
        let (_, img1, _) = seed(&pool).await;

        let other_scan = scans::create_scan(&pool).await.unwrap();
        let other_img = scans::add_scan_image(&pool, other_scan, "/tmp/c.jpg")
            .await
            .unwrap();

        insert_detection(&pool, img1, &badge_match("b1", "Bushcraft"), 2)
            .await
            .unwrap();
        insert_detection(&pool, other_img, &badge_match("b1", "Bushcraft"), 9)
            .await
            .unwrap();

        let totals = aggregate_detections(&pool, other_scan).await.unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].total_quantity, 9);
    }
}
