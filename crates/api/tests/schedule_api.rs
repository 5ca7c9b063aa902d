//! Integration tests for schedule CRUD.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete, get, post_json, put_json};
use sqlx::PgPool;

fn vehicle_schedule() -> serde_json::Value {
    serde_json::json!({
        "type": "vehicles",
        "frequency": "12h",
        "isFullImport": false,
        "startTime": "02:00",
        "days": ["monday", "tuesday", "wednesday", "thursday", "friday"]
    })
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn created_schedule_appears_in_list(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/import/schedules", vehicle_schedule()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["data"]["kind"], "vehicles");
    assert_eq!(created["data"]["active"], true);
    // next_run is seeded at creation so the stats panel can show it.
    assert!(created["data"]["nextRun"].is_string());

    let json = body_json(get(app, "/api/v1/import/schedules").await).await;
    let schedules = json["data"].as_array().unwrap();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0]["frequency"], "12h");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_kind_is_a_conflict(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(app.clone(), "/api/v1/import/schedules", vehicle_schedule()).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = post_json(app, "/api/v1/import/schedules", vehicle_schedule()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("vehicles"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn invalid_tokens_are_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/import/schedules",
        serde_json::json!({ "type": "vehicles", "frequency": "2h" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app.clone(),
        "/api/v1/import/schedules",
        serde_json::json!({ "type": "vehicles", "frequency": "12h", "startTime": "25:00" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        app,
        "/api/v1/import/schedules",
        serde_json::json!({ "type": "vehicles", "frequency": "12h", "days": ["someday"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Updates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn toggle_active_keeps_other_fields(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = body_json(
        post_json(app.clone(), "/api/v1/import/schedules", vehicle_schedule()).await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = put_json(
        app,
        &format!("/api/v1/import/schedules/{id}"),
        serde_json::json!({ "active": false }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["active"], false);
    assert_eq!(json["data"]["frequency"], "12h");
    assert_eq!(json["data"]["startTime"], "02:00");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn changing_frequency_recomputes_next_run(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = body_json(
        post_json(app.clone(), "/api/v1/import/schedules", vehicle_schedule()).await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();
    let old_next_run = created["data"]["nextRun"].as_str().unwrap().to_string();

    // Move both the frequency and the anchor so the recomputed fire time is
    // guaranteed to land somewhere else, whatever the wall clock says.
    let response = put_json(
        app,
        &format!("/api/v1/import/schedules/{id}"),
        serde_json::json!({ "frequency": "24h", "startTime": "03:30" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["frequency"], "24h");
    let new_next_run = json["data"]["nextRun"].as_str().unwrap();
    assert_ne!(new_next_run, old_next_run);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_of_missing_schedule_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);

    let response = put_json(
        app,
        "/api/v1/import/schedules/41",
        serde_json::json!({ "active": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn deleted_schedule_is_gone(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = body_json(
        post_json(app.clone(), "/api/v1/import/schedules", vehicle_schedule()).await,
    )
    .await;
    let id = created["data"]["id"].as_i64().unwrap();

    let response = delete(app.clone(), &format!("/api/v1/import/schedules/{id}")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(app, &format!("/api/v1/import/schedules/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
