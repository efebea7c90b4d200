//! Background scan processing
//!
//! Drives one scan through the pipeline: for each uploaded image, ask the
//! vision model for detections, parse its response, match each detected
//! name against the catalog, and store the matched detections.
//!
//! Per-image failure isolation: one bad image marks only that image failed
//! and the run continues. The scan itself fails only when every image
//! failed (which includes a scan with no images at all).

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::config::MatcherConfig;
use crate::db::{catalog, detections, scans};
use crate::error::Result;
use crate::models::{ScanImage, ScanStatus};
use crate::services::matcher::BadgeMatcher;
use crate::services::parser::parse_response;
use crate::services::vision::VisionClient;

/// Longest error text surfaced in a scan's progress message
const MAX_ERROR_MESSAGE_LEN: usize = 100;

/// Processes claimed scans in the background
pub struct ScanProcessor {
    db: SqlitePool,
    vision: Arc<dyn VisionClient>,
    matcher_config: MatcherConfig,
}

impl ScanProcessor {
    pub fn new(db: SqlitePool, vision: Arc<dyn VisionClient>, matcher_config: MatcherConfig) -> Self {
        Self {
            db,
            vision,
            matcher_config,
        }
    }

    /// Process one claimed scan to a terminal state.
    ///
    /// Never returns an error: any failure that escapes the per-image
    /// isolation marks the whole scan failed with a diagnostic message.
    pub async fn process_scan(&self, scan_id: i64) {
        if let Err(e) = self.run(scan_id).await {
            error!(scan_id, error = %e, "Scan processing aborted");
            let message = format!("Processing failed: {}", truncate(&e.to_string()));
            if let Err(e) = scans::update_scan_status(
                &self.db,
                scan_id,
                ScanStatus::Failed,
                Some(&message),
            )
            .await
            {
                error!(scan_id, error = %e, "Failed to record scan failure");
            }
        }
    }

    async fn run(&self, scan_id: i64) -> Result<()> {
        let images = scans::list_scan_images(&self.db, scan_id).await?;
        let total = images.len();

        if total == 0 {
            scans::update_scan_status(
                &self.db,
                scan_id,
                ScanStatus::Failed,
                Some("Scan has no images"),
            )
            .await?;
            return Ok(());
        }

        // One catalog snapshot for the whole run; a mid-run catalog edit
        // doesn't change matching behavior between images
        let snapshot = catalog::load_catalog(&self.db).await?;
        let known_names = snapshot.names();
        let matcher = BadgeMatcher::new(snapshot, self.matcher_config.clone());

        info!(scan_id, total_images = total, "Starting scan processing");

        let mut failed_images = 0usize;
        let mut total_detections = 0usize;

        for (idx, image) in images.iter().enumerate() {
            let position = idx + 1;
            scans::update_scan_progress(
                &self.db,
                scan_id,
                idx as i64,
                &format!("Processing image {} of {}", position, total),
            )
            .await?;
            scans::update_image_status(&self.db, image.id, ScanStatus::Processing).await?;

            let message = match self.process_image(image, &matcher, &known_names).await {
                Ok(stored) => {
                    total_detections += stored;
                    scans::update_image_status(&self.db, image.id, ScanStatus::Completed).await?;
                    format!(
                        "Completed image {} of {} ({} badges detected so far)",
                        position, total, total_detections
                    )
                }
                Err(e) => {
                    failed_images += 1;
                    warn!(
                        scan_id,
                        image_id = image.id,
                        image_path = %image.image_path,
                        error = %e,
                        "Image processing failed, continuing with remaining images"
                    );
                    scans::update_image_status(&self.db, image.id, ScanStatus::Failed).await?;
                    format!(
                        "Image {} of {} failed: {}",
                        position,
                        total,
                        truncate(&e.to_string())
                    )
                }
            };

            scans::update_scan_progress(&self.db, scan_id, position as i64, &message).await?;
        }

        if failed_images == total {
            scans::update_scan_status(
                &self.db,
                scan_id,
                ScanStatus::Failed,
                Some(&format!("All {} images failed to process", total)),
            )
            .await?;
            info!(scan_id, "Scan failed: no image processed successfully");
        } else {
            let mut message = format!(
                "Processed {} images, {} badge detections",
                total, total_detections
            );
            if failed_images > 0 {
                message.push_str(&format!(" ({} images failed)", failed_images));
            }
            scans::update_scan_status(&self.db, scan_id, ScanStatus::Completed, Some(&message))
                .await?;
            info!(
                scan_id,
                total_detections, failed_images, "Scan processing completed"
            );
        }

        Ok(())
    }

    /// Analyze one image and store its matched detections.
    ///
    /// Returns how many detections were stored; unmatched names are dropped.
    async fn process_image(
        &self,
        image: &ScanImage,
        matcher: &BadgeMatcher,
        known_names: &[String],
    ) -> Result<usize> {
        let response = self
            .vision
            .analyze_image(&image.image_path, known_names)
            .await?;

        let raw_detections = parse_response(&response);
        debug!(
            image_id = image.id,
            raw_detections = raw_detections.len(),
            "Parsed vision response"
        );

        let mut stored = 0usize;
        for raw in &raw_detections {
            let badge_match = matcher.match_name(&raw.detected_name, raw.confidence_score, None);
            if badge_match.matched {
                detections::insert_detection(&self.db, image.id, &badge_match, raw.count as i64)
                    .await?;
                stored += 1;
            } else {
                debug!(
                    image_id = image.id,
                    detected = %raw.detected_name,
                    score = badge_match.match_score,
                    "Dropping unmatched detection"
                );
            }
        }

        Ok(stored)
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        s.to_string()
    } else {
        s.chars().take(MAX_ERROR_MESSAGE_LEN).collect()
    }
}
