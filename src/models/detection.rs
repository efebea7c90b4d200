//! Detection and match result types
//!
//! `RawDetection` is what the response parser extracts from one line of
//! vision-model output; `BadgeMatch` is the matcher's verdict for one raw
//! detection; `StoredDetection` is the persisted, catalog-linked record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence level reported by the vision model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
    /// Anything the model reported that we don't recognize
    Other,
}

impl ConfidenceLabel {
    /// Parse a label from vision output (case-insensitive)
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "high" => ConfidenceLabel::High,
            "medium" => ConfidenceLabel::Medium,
            "low" => ConfidenceLabel::Low,
            _ => ConfidenceLabel::Other,
        }
    }

    /// Fixed numeric score for this label
    pub fn score(&self) -> f64 {
        match self {
            ConfidenceLabel::High => 0.9,
            ConfidenceLabel::Medium => 0.75,
            ConfidenceLabel::Low => 0.5,
            ConfidenceLabel::Other => 0.6,
        }
    }
}

/// One (name, count, confidence) triple parsed from vision-model output.
///
/// Ephemeral: consumed immediately by the matcher, never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    pub detected_name: String,
    pub count: u32,
    pub confidence_label: ConfidenceLabel,
    pub confidence_score: f64,
}

/// Result of matching one detected name against the catalog
#[derive(Debug, Clone, Serialize)]
pub struct BadgeMatch {
    /// Catalog badge id; empty if unmatched
    pub badge_id: String,
    /// Canonical badge name; empty if unmatched
    pub matched_name: String,
    /// Original detected name
    pub detected_name: String,
    /// Blended fuzzy match score (0-100)
    pub match_score: f64,
    /// Combined confidence (0.0-1.0), weighted toward match quality
    pub confidence_score: f64,
    /// Whether the score met the matching threshold
    pub matched: bool,
    /// Category of the matched badge, if any
    pub category: Option<String>,
}

impl BadgeMatch {
    pub fn is_high_confidence(&self) -> bool {
        self.confidence_score >= 0.9
    }

    pub fn is_low_confidence(&self) -> bool {
        self.confidence_score < 0.8
    }
}

/// Persisted detection, linked to a scan image and a catalog badge
#[derive(Debug, Clone, Serialize)]
pub struct StoredDetection {
    pub id: i64,
    pub scan_image_id: i64,
    pub badge_id: String,
    pub badge_name: String,
    pub detected_name: String,
    pub quantity: i64,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}
