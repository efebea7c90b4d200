//! Badge inventory service library
//!
//! Turns photos of physical badge stock into audited inventory updates:
//! an external vision model detects badges in uploaded photos, detected
//! names are fuzzy-matched against the badge catalog, and a completed scan
//! can then be reconciled into the inventory with a full audit trail.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::services::vision::VisionClient;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Loaded service configuration
    pub config: Arc<ServiceConfig>,
    /// Vision model client used by background scan processing
    pub vision: Arc<dyn VisionClient>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: ServiceConfig, vision: Arc<dyn VisionClient>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            vision,
            startup_time: Utc::now(),
        }
    }
}

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::badge_routes())
        .merge(api::scan_routes())
        .merge(api::inventory_routes())
        .with_state(state)
}
