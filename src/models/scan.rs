//! Scan state machine
//!
//! A scan is one batch-upload-and-process session spanning one or more
//! images. Both the scan and its images progress through
//! pending → processing → {completed, failed}; a scan reaches `completed`
//! as long as at least one image succeeds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Processing status for scans and scan images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// Registered, not yet started
    Pending,
    /// Currently being processed
    Processing,
    /// Finished (possibly with per-image failures)
    Completed,
    /// Every image failed, or processing aborted before any image
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "pending",
            ScanStatus::Processing => "processing",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ScanStatus::Pending),
            "processing" => Ok(ScanStatus::Processing),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(Error::Internal(format!("Unknown scan status: {}", other))),
        }
    }

    /// Whether this status is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanStatus::Completed | ScanStatus::Failed)
    }
}

/// One batch-upload-and-process session
#[derive(Debug, Clone, Serialize)]
pub struct Scan {
    pub id: i64,
    pub status: ScanStatus,
    pub total_images: i64,
    pub processed_images: i64,
    pub progress_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Scan {
    /// Processing progress as a percentage (0-100)
    pub fn progress_percentage(&self) -> f64 {
        if self.total_images > 0 {
            (self.processed_images as f64 / self.total_images as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Estimate seconds remaining from the average time per processed image.
    ///
    /// Undefined until at least one image has been processed.
    pub fn estimated_time_remaining(&self, elapsed_seconds: f64) -> Option<f64> {
        if self.processed_images == 0 {
            return None;
        }
        let avg = elapsed_seconds / self.processed_images as f64;
        let remaining = (self.total_images - self.processed_images).max(0) as f64;
        Some(avg * remaining)
    }
}

/// One uploaded image within a scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanImage {
    pub id: i64,
    pub scan_id: i64,
    pub image_path: String,
    pub status: ScanStatus,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}
