//! HTTP API integration tests
//!
//! Exercise the router end to end against an in-memory database, with a
//! scripted vision client standing in for the external model.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use badge_inventory::config::ServiceConfig;
use badge_inventory::error::Result;
use badge_inventory::services::vision::VisionClient;
use badge_inventory::{build_router, AppState};

/// Vision client that always returns the same canned response
struct CannedVision {
    response: String,
}

#[async_trait::async_trait]
impl VisionClient for CannedVision {
    async fn analyze_image(&self, _image_path: &str, _known_badges: &[String]) -> Result<String> {
        Ok(self.response.clone())
    }
}

async fn test_app() -> Router {
    test_app_with_vision("OAS Bushcraft | 2 | high").await
}

async fn test_app_with_vision(response: &str) -> Router {
    let db = badge_inventory::db::init_pool(":memory:").await.unwrap();
    let vision = Arc::new(CannedVision {
        response: response.to_string(),
    });
    let state = AppState::new(db, ServiceConfig::default(), vision);
    build_router(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn put_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(
        app,
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
}

async fn seed_badge(app: &Router, badge_id: &str, name: &str, category: &str) {
    let (status, _) = post_json(
        app,
        "/badges",
        json!({"badge_id": badge_id, "name": name, "category": category}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_file_backed_database_initializes() {
    // init_pool creates missing parent directories and the database file
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("nested").join("badges.db");
    let pool = badge_inventory::db::init_pool(db_path.to_str().unwrap())
        .await
        .unwrap();

    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM badges")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.0, 0);
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;
    let (status, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "badge-inventory");
    assert!(body["uptime_seconds"].as_u64().is_some());
}

#[tokio::test]
async fn test_badge_crud_seeds_inventory() {
    let app = test_app().await;
    seed_badge(&app, "oas-bushcraft", "OAS Bushcraft", "Outdoor Adventure Skills").await;

    let (status, body) = get(&app, "/badges").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "OAS Bushcraft");

    // New badge starts at zero stock
    let (status, body) = get(&app, "/inventory/oas-bushcraft").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 0);
    assert_eq!(body["is_low_stock"], true);
}

#[tokio::test]
async fn test_badge_validation() {
    let app = test_app().await;
    let (status, body) = post_json(
        &app,
        "/badges",
        json!({"badge_id": "", "name": "x", "category": ""}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_suggest_endpoint() {
    let app = test_app().await;
    seed_badge(&app, "oas-bushcraft", "OAS Bushcraft", "OAS").await;
    seed_badge(&app, "milestone-1", "Milestone 1", "Milestone").await;

    let (status, body) = get(&app, "/badges/suggest?q=bushcraft&limit=1").await;
    assert_eq!(status, StatusCode::OK);
    let suggestions = body.as_array().unwrap();
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0]["badge_id"], "oas-bushcraft");

    let (status, _) = get(&app, "/badges/suggest?q=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_scan() {
    let app = test_app().await;
    let (status, body) = post_json(
        &app,
        "/scans",
        json!({"image_paths": ["/photos/a.jpg", "/photos/b.jpg"]}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["total_images"], 2);

    let scan_id = body["scan_id"].as_i64().unwrap();
    let (status, body) = get(&app, &format!("/scans/{}/status", scan_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["progress_percentage"], 0.0);
    assert!(body["estimated_seconds_remaining"].is_null());
}

#[tokio::test]
async fn test_create_scan_requires_images() {
    let app = test_app().await;
    let (status, body) = post_json(&app, "/scans", json!({"image_paths": []})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_scan_status_unknown_scan() {
    let app = test_app().await;
    let (status, body) = get(&app, "/scans/999/status").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_process_scan_is_one_shot() {
    let app = test_app().await;
    seed_badge(&app, "oas-bushcraft", "OAS Bushcraft", "OAS").await;

    let (_, body) = post_json(&app, "/scans", json!({"image_paths": ["/photos/a.jpg"]})).await;
    let scan_id = body["scan_id"].as_i64().unwrap();

    let (status, body) = post_json(&app, &format!("/scans/{}/process", scan_id), json!({})).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "processing");

    // The scan is no longer pending; a second request must not start
    // a duplicate run
    let (status, body) = post_json(&app, &format!("/scans/{}/process", scan_id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = post_json(&app, "/scans/999/process", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inventory_adjust_and_audit() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "Test").await;

    let (status, body) = post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "b1", "adjustment": 5, "reason": "delivery"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["old_quantity"], 0);
    assert_eq!(body["new_quantity"], 5);

    let (status, body) = post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "b1", "adjustment": -2}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_quantity"], 3);

    let (status, body) = get(&app, "/inventory/adjustments?badge_id=b1").await;
    assert_eq!(status, StatusCode::OK);
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 2);
    // Newest first
    assert_eq!(records[0]["adjustment"], -2);
    assert_eq!(records[1]["reason"], "delivery");
}

#[tokio::test]
async fn test_inventory_never_goes_negative() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "Test").await;

    post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "b1", "adjustment": 3}),
    )
    .await;

    let (status, body) = post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "b1", "adjustment": -5}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Quantity unchanged after the rejected adjustment
    let (_, body) = get(&app, "/inventory/b1").await;
    assert_eq!(body["quantity"], 3);
}

#[tokio::test]
async fn test_zero_adjustment_rejected() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "Test").await;

    let (status, _) = post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "b1", "adjustment": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_quantity() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "Test").await;

    let (status, body) = put_json(
        &app,
        "/inventory/b1",
        json!({"quantity": 12, "reason": "stocktake"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_quantity"], 12);
    assert_eq!(body["adjustment"], 12);

    let (status, _) = put_json(&app, "/inventory/b1", json!({"quantity": -1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inventory_detail_includes_recent_adjustments() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "Test").await;

    for delta in [5, -1, 2] {
        post_json(
            &app,
            "/inventory/adjust",
            json!({"badge_id": "b1", "adjustment": delta}),
        )
        .await;
    }

    let (status, body) = get(&app, "/inventory/b1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 6);
    let recent = body["recent_adjustments"].as_array().unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0]["adjustment"], 2);
}

#[tokio::test]
async fn test_inventory_filters_and_stats() {
    let app = test_app().await;
    seed_badge(&app, "b1", "Bushcraft", "OAS").await;
    seed_badge(&app, "m1", "Milestone 1", "Milestone").await;
    // Lift one badge above the default reorder threshold of 5
    put_json(&app, "/inventory/b1", json!({"quantity": 20})).await;

    let (_, body) = get(&app, "/inventory?category=oas").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["badge_id"], "b1");

    let (_, body) = get(&app, "/inventory?search=mile").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["badge_id"], "m1");

    let (_, body) = get(&app, "/inventory?low_stock_only=true").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["badge_id"], "m1");

    let (status, stats) = get(&app, "/inventory/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_badge_types"], 2);
    assert_eq!(stats["total_quantity"], 20);
    assert_eq!(stats["low_stock_count"], 1);
    assert_eq!(stats["out_of_stock_count"], 1);
    assert_eq!(stats["by_category"]["OAS"]["badge_types"], 1);
    assert_eq!(stats["by_category"]["OAS"]["total_quantity"], 20);
    assert_eq!(stats["by_category"]["OAS"]["low_stock_count"], 0);
    assert_eq!(stats["by_category"]["Milestone"]["total_quantity"], 0);
    assert_eq!(stats["by_category"]["Milestone"]["out_of_stock_count"], 1);
    assert!(stats["last_updated"].is_string());
}

#[tokio::test]
async fn test_adjust_unknown_badge() {
    let app = test_app().await;
    let (status, body) = post_json(
        &app,
        "/inventory/adjust",
        json!({"badge_id": "nope", "adjustment": 1}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_update_from_scan_requires_completed_scan() {
    let app = test_app().await;
    let (_, body) = post_json(&app, "/scans", json!({"image_paths": ["/photos/a.jpg"]})).await;
    let scan_id = body["scan_id"].as_i64().unwrap();

    // Scan is still pending
    let (status, body) =
        post_json(&app, &format!("/inventory/update-from-scan/{}", scan_id), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = post_json(&app, "/inventory/update-from-scan/999", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
