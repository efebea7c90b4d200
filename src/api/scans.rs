//! Scan API handlers
//!
//! Scan processing is asynchronous: POST /scans/{id}/process claims the
//! scan, spawns the background processor, and returns 202 immediately.
//! Clients poll GET /scans/{id}/status for progress.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::db::detections::DetectionTotal;
use crate::db::{detections, scans};
use crate::error::{ApiError, ApiResult};
use crate::models::{ScanStatus, StoredDetection};
use crate::services::scan_processor::ScanProcessor;
use crate::AppState;

/// POST /scans request
#[derive(Debug, Deserialize)]
pub struct CreateScanRequest {
    /// Paths of the uploaded photos, in processing order
    pub image_paths: Vec<String>,
}

/// POST /scans response
#[derive(Debug, Serialize)]
pub struct CreateScanResponse {
    pub scan_id: i64,
    pub status: ScanStatus,
    pub total_images: i64,
}

/// POST /scans/{id}/process response
#[derive(Debug, Serialize)]
pub struct ProcessScanResponse {
    pub scan_id: i64,
    pub status: ScanStatus,
}

/// GET /scans/{id}/status response
#[derive(Debug, Serialize)]
pub struct ScanStatusResponse {
    pub scan_id: i64,
    pub status: ScanStatus,
    pub total_images: i64,
    pub processed_images: i64,
    pub progress_percentage: f64,
    pub progress_message: Option<String>,
    pub estimated_seconds_remaining: Option<f64>,
    /// Per-image state so far
    pub images: Vec<ImageStatus>,
    pub total_detections: i64,
}

/// One image's state within a status response
#[derive(Debug, Serialize)]
pub struct ImageStatus {
    pub image_id: i64,
    pub image_path: String,
    pub status: ScanStatus,
    pub processed_at: Option<chrono::DateTime<Utc>>,
}

/// GET /scans/{id}/results response
#[derive(Debug, Serialize)]
pub struct ScanResultsResponse {
    pub scan_id: i64,
    pub status: ScanStatus,
    pub images: Vec<ImageResult>,
    pub totals: Vec<DetectionTotal>,
    pub summary: ScanSummary,
}

/// One image's detections within a results response
#[derive(Debug, Serialize)]
pub struct ImageResult {
    pub image_id: i64,
    pub image_path: String,
    pub status: ScanStatus,
    pub detections: Vec<StoredDetection>,
}

/// Aggregate counts for a whole scan
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub total_images: i64,
    pub successful_images: i64,
    pub failed_images: i64,
    pub total_detections: i64,
}

/// POST /scans
///
/// Register a new scan with its uploaded images. Returns 201.
pub async fn create_scan(
    State(state): State<AppState>,
    Json(request): Json<CreateScanRequest>,
) -> ApiResult<(StatusCode, Json<CreateScanResponse>)> {
    if request.image_paths.is_empty() {
        return Err(ApiError::BadRequest(
            "A scan needs at least one image".to_string(),
        ));
    }
    if request.image_paths.iter().any(|p| p.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "Image paths must not be empty".to_string(),
        ));
    }

    let scan_id = scans::create_scan(&state.db).await?;
    for path in &request.image_paths {
        scans::add_scan_image(&state.db, scan_id, path).await?;
    }

    tracing::info!(scan_id, images = request.image_paths.len(), "Scan created");

    Ok((
        StatusCode::CREATED,
        Json(CreateScanResponse {
            scan_id,
            status: ScanStatus::Pending,
            total_images: request.image_paths.len() as i64,
        }),
    ))
}

/// POST /scans/{id}/process
///
/// Claim a pending scan and start background processing. Returns 202;
/// a scan that is already processing or finished gets 409.
pub async fn process_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<i64>,
) -> ApiResult<(StatusCode, Json<ProcessScanResponse>)> {
    let scan = scans::get_scan(&state.db, scan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scan {} not found", scan_id)))?;

    if !scans::try_claim_scan(&state.db, scan_id).await? {
        return Err(ApiError::Conflict(format!(
            "Scan {} is {}, only pending scans can be processed",
            scan_id,
            scan.status.as_str()
        )));
    }

    let processor = ScanProcessor::new(
        state.db.clone(),
        state.vision.clone(),
        state.config.matcher.clone(),
    );
    tokio::spawn(async move {
        processor.process_scan(scan_id).await;
    });

    tracing::info!(scan_id, "Scan processing started");

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessScanResponse {
            scan_id,
            status: ScanStatus::Processing,
        }),
    ))
}

/// GET /scans/{id}/status
pub async fn scan_status(
    State(state): State<AppState>,
    Path(scan_id): Path<i64>,
) -> ApiResult<Json<ScanStatusResponse>> {
    let scan = scans::get_scan(&state.db, scan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scan {} not found", scan_id)))?;

    let elapsed = Utc::now()
        .signed_duration_since(scan.created_at)
        .num_milliseconds() as f64
        / 1000.0;
    let estimated_seconds_remaining = if scan.status == ScanStatus::Processing {
        scan.estimated_time_remaining(elapsed.max(0.0))
    } else {
        None
    };

    let images = scans::list_scan_images(&state.db, scan_id)
        .await?
        .into_iter()
        .map(|image| ImageStatus {
            image_id: image.id,
            image_path: image.image_path,
            status: image.status,
            processed_at: image.processed_at,
        })
        .collect();
    let total_detections =
        detections::list_detections_for_scan(&state.db, scan_id).await?.len() as i64;

    Ok(Json(ScanStatusResponse {
        scan_id: scan.id,
        status: scan.status,
        total_images: scan.total_images,
        processed_images: scan.processed_images,
        progress_percentage: scan.progress_percentage(),
        progress_message: scan.progress_message,
        estimated_seconds_remaining,
        images,
        total_detections,
    }))
}

/// GET /scans/{id}/results
///
/// Stored detections plus per-badge totals. Available for any scan, but
/// only meaningful once the scan reaches a terminal state.
pub async fn scan_results(
    State(state): State<AppState>,
    Path(scan_id): Path<i64>,
) -> ApiResult<Json<ScanResultsResponse>> {
    let scan = scans::get_scan(&state.db, scan_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Scan {} not found", scan_id)))?;

    let stored = detections::list_detections_for_scan(&state.db, scan_id).await?;
    let totals = detections::aggregate_detections(&state.db, scan_id).await?;
    let scan_images = scans::list_scan_images(&state.db, scan_id).await?;

    let total_detections = stored.len() as i64;
    let successful_images = scan_images
        .iter()
        .filter(|i| i.status == ScanStatus::Completed)
        .count() as i64;
    let failed_images = scan_images
        .iter()
        .filter(|i| i.status == ScanStatus::Failed)
        .count() as i64;

    let mut by_image: std::collections::HashMap<i64, Vec<StoredDetection>> =
        std::collections::HashMap::new();
    for detection in stored {
        by_image
            .entry(detection.scan_image_id)
            .or_default()
            .push(detection);
    }

    let images = scan_images
        .into_iter()
        .map(|image| ImageResult {
            detections: by_image.remove(&image.id).unwrap_or_default(),
            image_id: image.id,
            image_path: image.image_path,
            status: image.status,
        })
        .collect();

    Ok(Json(ScanResultsResponse {
        scan_id: scan.id,
        status: scan.status,
        images,
        totals,
        summary: ScanSummary {
            total_images: scan.total_images,
            successful_images,
            failed_images,
            total_detections,
        },
    }))
}

/// Build scan routes
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scans", post(create_scan))
        .route("/scans/:id/process", post(process_scan))
        .route("/scans/:id/status", get(scan_status))
        .route("/scans/:id/results", get(scan_results))
}
