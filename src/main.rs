//! badge-inventory - badge stock tracking service
//!
//! HTTP service that ingests photos of badge stock, runs them through an
//! external vision model, matches detections against the badge catalog,
//! and maintains an audited inventory.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use badge_inventory::config::ServiceConfig;
use badge_inventory::services::vision::OllamaVisionClient;
use badge_inventory::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting badge-inventory service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()?;
    info!("Database: {}", config.database_path);
    info!(
        "Vision model: {} at {}",
        config.vision.model, config.vision.endpoint
    );

    let db = badge_inventory::db::init_pool(&config.database_path).await?;
    info!("Database connection established");

    let vision = Arc::new(OllamaVisionClient::new(config.vision.clone())?);
    let bind_addr = config.bind_addr.clone();

    let state = AppState::new(db, config, vision);
    let app = badge_inventory::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
