//! Service configuration
//!
//! Defaults live in code; a TOML file (path from `BADGE_INVENTORY_CONFIG`,
//! falling back to `badge-inventory.toml` in the working directory) and a
//! small set of environment variables can override them.
//!
//! The matching weights are deliberately configuration rather than literals:
//! they are tuned heuristics, and recalibrating them must not require a code
//! change.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Error, Result};

/// Fuzzy matching tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum blended score (0-100) for a detection to count as matched
    pub min_match_score: f64,
    /// Additive boost when the category hint matches the entry category
    pub category_boost: f64,
    /// Blend weight for the token-order-sensitive ratio
    pub token_sort_weight: f64,
    /// Blend weight for the token-set (order-insensitive) ratio
    pub token_set_weight: f64,
    /// Blend weight for the partial/substring ratio
    pub partial_weight: f64,
    /// Weight of the vision model's self-reported confidence in the combined score
    pub vision_confidence_weight: f64,
    /// Weight of the textual match quality in the combined score
    pub match_score_weight: f64,
    /// Multiplier applied to vision confidence on an abbreviation fast-path hit
    pub abbreviation_confidence_boost: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_match_score: 80.0,
            category_boost: 5.0,
            token_sort_weight: 0.5,
            token_set_weight: 0.3,
            partial_weight: 0.2,
            vision_confidence_weight: 0.4,
            match_score_weight: 0.6,
            abbreviation_confidence_boost: 1.1,
        }
    }
}

/// Vision collaborator (Ollama) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Ollama endpoint base URL
    pub endpoint: String,
    /// Vision model name
    pub model: String,
    /// Maximum detection attempts per image
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles per attempt)
    pub retry_delay_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            model: "llava:7b".to_string(),
            max_retries: 3,
            retry_delay_ms: 1000,
            timeout_secs: 120,
        }
    }
}

/// Top-level service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP bind address
    pub bind_addr: String,
    /// SQLite database path
    pub database_path: String,
    pub matcher: MatcherConfig,
    pub vision: VisionConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8780".to_string(),
            database_path: "badge-inventory.db".to_string(),
            matcher: MatcherConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration: TOML file if present, then environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BADGE_INVENTORY_CONFIG")
            .unwrap_or_else(|_| "badge-inventory.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| Error::Config(format!("Failed to read {}: {}", path, e)))?;
            let config: ServiceConfig = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path, e)))?;
            info!(path = %path, "Loaded configuration from TOML");
            config
        } else {
            ServiceConfig::default()
        };

        // Environment overrides for deployment-level settings
        if let Ok(addr) = std::env::var("BADGE_INVENTORY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(db) = std::env::var("BADGE_INVENTORY_DB") {
            config.database_path = db;
        }
        if let Ok(endpoint) = std::env::var("BADGE_INVENTORY_OLLAMA_ENDPOINT") {
            config.vision.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("BADGE_INVENTORY_VISION_MODEL") {
            config.vision.model = model;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let m = &self.matcher;
        if !(0.0..=100.0).contains(&m.min_match_score) {
            return Err(Error::Config(format!(
                "min_match_score must be in 0-100, got {}",
                m.min_match_score
            )));
        }
        let blend = m.token_sort_weight + m.token_set_weight + m.partial_weight;
        if (blend - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "ratio blend weights must sum to 1.0, got {}",
                blend
            )));
        }
        let combined = m.vision_confidence_weight + m.match_score_weight;
        if (combined - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "confidence weights must sum to 1.0, got {}",
                combined
            )));
        }
        if self.vision.max_retries == 0 {
            return Err(Error::Config(
                "vision.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
