//! Badge catalog API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::catalog;
use crate::error::{ApiError, ApiResult};
use crate::models::CatalogEntry;
use crate::services::matcher::{BadgeMatcher, Suggestion};
use crate::AppState;

/// Query parameters for GET /badges/suggest
#[derive(Debug, Deserialize)]
pub struct SuggestParams {
    /// Partial badge name to complete
    pub q: String,
    pub limit: Option<usize>,
}

/// GET /badges
pub async fn list_badges(State(state): State<AppState>) -> ApiResult<Json<Vec<CatalogEntry>>> {
    let snapshot = catalog::load_catalog(&state.db).await?;
    Ok(Json(snapshot.entries().to_vec()))
}

/// POST /badges
///
/// Insert or update a catalog entry; new badges start with zero stock.
pub async fn save_badge(
    State(state): State<AppState>,
    Json(entry): Json<CatalogEntry>,
) -> ApiResult<(StatusCode, Json<CatalogEntry>)> {
    if entry.badge_id.trim().is_empty() || entry.name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "badge_id and name are required".to_string(),
        ));
    }

    catalog::save_badge(&state.db, &entry).await?;
    tracing::info!(badge_id = %entry.badge_id, name = %entry.name, "Catalog entry saved");
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /badges/suggest?q=...
///
/// Fuzzy-ranked catalog names for typeahead.
pub async fn suggest_badges(
    State(state): State<AppState>,
    Query(params): Query<SuggestParams>,
) -> ApiResult<Json<Vec<Suggestion>>> {
    if params.q.trim().is_empty() {
        return Err(ApiError::BadRequest("Query must not be empty".to_string()));
    }
    let limit = params.limit.unwrap_or(10).clamp(1, 50);

    let snapshot = catalog::load_catalog(&state.db).await?;
    let matcher = BadgeMatcher::new(snapshot, state.config.matcher.clone());
    Ok(Json(matcher.suggestions(&params.q, limit)))
}

/// Build badge catalog routes
pub fn badge_routes() -> Router<AppState> {
    Router::new()
        .route("/badges", get(list_badges).post(save_badge))
        .route("/badges/suggest", get(suggest_badges))
}
