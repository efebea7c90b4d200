//! Inventory API handlers
//!
//! All quantity mutations flow through the audited adjustment path in
//! `db::inventory`; there is no unaudited write route.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::inventory;
use crate::error::{ApiError, ApiResult};
use crate::models::{AdjustmentRecord, InventoryRecord, QuantityChange};
use crate::services::reconciler::{self, ReconciliationReport};
use crate::AppState;

/// PUT /inventory/{badge_id} request
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// POST /inventory/adjust request
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub badge_id: String,
    pub adjustment: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Response for quantity mutations
#[derive(Debug, Serialize)]
pub struct QuantityChangeResponse {
    pub badge_id: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
    pub adjustment: i64,
}

impl QuantityChangeResponse {
    fn new(badge_id: String, change: QuantityChange) -> Self {
        Self {
            badge_id,
            old_quantity: change.old_quantity,
            new_quantity: change.new_quantity,
            adjustment: change.adjustment,
        }
    }
}

/// Query parameters for GET /inventory/adjustments
#[derive(Debug, Deserialize)]
pub struct AdjustmentListParams {
    pub badge_id: Option<String>,
    pub limit: Option<i64>,
}

/// Query parameters for POST /inventory/update-from-scan/{scan_id}
#[derive(Debug, Deserialize)]
pub struct UpdateFromScanParams {
    /// When false, report the changes without applying them
    #[serde(default = "default_apply")]
    pub apply_adjustments: bool,
}

fn default_apply() -> bool {
    true
}

/// Query parameters for GET /inventory
#[derive(Debug, Deserialize)]
pub struct InventoryListParams {
    pub category: Option<String>,
    /// Case-insensitive substring match on badge name
    pub search: Option<String>,
    #[serde(default)]
    pub low_stock_only: bool,
}

/// GET /inventory/stats response
#[derive(Debug, Serialize)]
pub struct InventoryStats {
    pub total_badge_types: i64,
    pub total_quantity: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
    /// Per-category badge type and quantity counts, keyed by category name
    pub by_category: BTreeMap<String, CategoryStats>,
    /// Most recent inventory write, if any stock has ever been touched
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize)]
pub struct CategoryStats {
    pub badge_types: i64,
    pub total_quantity: i64,
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// GET /inventory/{badge_id} response
#[derive(Debug, Serialize)]
pub struct InventoryDetailResponse {
    #[serde(flatten)]
    pub record: InventoryRecord,
    /// Most recent audit records for this badge, newest first
    pub recent_adjustments: Vec<AdjustmentRecord>,
}

/// GET /inventory
pub async fn list_inventory(
    State(state): State<AppState>,
    Query(params): Query<InventoryListParams>,
) -> ApiResult<Json<Vec<InventoryRecord>>> {
    let records = inventory::list_inventory(&state.db).await?;

    let search = params.search.map(|s| s.to_lowercase());
    let category = params.category.map(|c| c.to_lowercase());
    let filtered = records
        .into_iter()
        .filter(|r| {
            category
                .as_deref()
                .map_or(true, |c| r.category.to_lowercase() == c)
        })
        .filter(|r| {
            search
                .as_deref()
                .map_or(true, |s| r.name.to_lowercase().contains(s))
        })
        .filter(|r| !params.low_stock_only || r.is_low_stock)
        .collect();

    Ok(Json(filtered))
}

/// GET /inventory/stats
pub async fn inventory_stats(State(state): State<AppState>) -> ApiResult<Json<InventoryStats>> {
    let records = inventory::list_inventory(&state.db).await?;

    let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
    for record in &records {
        let entry = by_category.entry(record.category.clone()).or_default();
        entry.badge_types += 1;
        entry.total_quantity += record.quantity;
        if record.is_low_stock {
            entry.low_stock_count += 1;
        }
        if record.quantity == 0 {
            entry.out_of_stock_count += 1;
        }
    }

    Ok(Json(InventoryStats {
        total_badge_types: records.len() as i64,
        total_quantity: records.iter().map(|r| r.quantity).sum(),
        low_stock_count: records.iter().filter(|r| r.is_low_stock).count() as i64,
        out_of_stock_count: records.iter().filter(|r| r.quantity == 0).count() as i64,
        by_category,
        last_updated: records.iter().map(|r| r.last_updated).max(),
    }))
}

/// GET /inventory/{badge_id}
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(badge_id): Path<String>,
) -> ApiResult<Json<InventoryDetailResponse>> {
    let record = inventory::get_inventory(&state.db, &badge_id).await?;
    let recent_adjustments =
        inventory::list_adjustments(&state.db, Some(&badge_id), 10).await?;
    Ok(Json(InventoryDetailResponse {
        record,
        recent_adjustments,
    }))
}

/// PUT /inventory/{badge_id}
///
/// Set an absolute quantity; audited as the equivalent delta.
pub async fn set_quantity(
    State(state): State<AppState>,
    Path(badge_id): Path<String>,
    Json(request): Json<SetQuantityRequest>,
) -> ApiResult<Json<QuantityChangeResponse>> {
    let reason = request.reason.as_deref().unwrap_or("Manual quantity set");
    let change = inventory::set_quantity(&state.db, &badge_id, request.quantity, reason).await?;
    Ok(Json(QuantityChangeResponse::new(badge_id, change)))
}

/// POST /inventory/adjust
///
/// Apply a signed quantity delta. An adjustment that would make the
/// quantity negative is rejected with 400 and nothing is written.
pub async fn adjust_inventory(
    State(state): State<AppState>,
    Json(request): Json<AdjustRequest>,
) -> ApiResult<Json<QuantityChangeResponse>> {
    if request.adjustment == 0 {
        return Err(ApiError::BadRequest(
            "Adjustment must be non-zero".to_string(),
        ));
    }

    let reason = request.reason.as_deref().unwrap_or("Manual adjustment");
    let change = inventory::apply_adjustment(
        &state.db,
        &request.badge_id,
        request.adjustment,
        reason,
        None,
    )
    .await?;

    Ok(Json(QuantityChangeResponse::new(request.badge_id, change)))
}

/// POST /inventory/update-from-scan/{scan_id}
///
/// Apply a completed scan's aggregated detections as inventory additions.
/// `?apply_adjustments=false` reports the changes without writing.
pub async fn update_from_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<i64>,
    Query(params): Query<UpdateFromScanParams>,
) -> ApiResult<Json<ReconciliationReport>> {
    let preview = !params.apply_adjustments;
    let report = reconciler::update_from_scan(&state.db, scan_id, preview).await?;
    Ok(Json(report))
}

/// GET /inventory/adjustments
///
/// Recent audit records, newest first.
pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(params): Query<AdjustmentListParams>,
) -> ApiResult<Json<Vec<AdjustmentRecord>>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let records =
        inventory::list_adjustments(&state.db, params.badge_id.as_deref(), limit).await?;
    Ok(Json(records))
}

/// Build inventory routes
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_inventory))
        .route("/inventory/stats", get(inventory_stats))
        .route("/inventory/adjust", post(adjust_inventory))
        .route("/inventory/adjustments", get(list_adjustments))
        .route("/inventory/update-from-scan/:scan_id", post(update_from_scan))
        .route("/inventory/:badge_id", get(get_inventory).put(set_quantity))
}
