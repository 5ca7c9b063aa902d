//! Behavioural tests for the console against a counting stub server.
//!
//! The stub mimics the admin API closely enough to observe the properties
//! that matter: when the busy flags flip, which calls actually reach the
//! network, and what survives a failed mutation.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use partsync_console::client::{ApiClient, ImportConfig};
use partsync_console::console::TriggerError;
use partsync_console::{Console, Poller, PollerIntervals, View};
use partsync_core::import::{ControlAction, ImportKind, ImportMode};
use partsync_core::ops::OpKey;

// ---------------------------------------------------------------------------
// Stub server
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Stub {
    start_calls: AtomicUsize,
    history_calls: AtomicUsize,
    schedule_calls: AtomicUsize,
    stats_calls: AtomicUsize,
    start_delay_ms: AtomicU64,
    fail_start: AtomicBool,
    fail_schedule_create: AtomicBool,
    fail_raw_parts: AtomicBool,
    next_schedule_id: AtomicI64,
    schedules: Mutex<Vec<serde_json::Value>>,
    history: Mutex<serde_json::Value>,
}

impl Stub {
    fn new() -> Arc<Self> {
        let stub = Self::default();
        stub.next_schedule_id.store(1, Ordering::SeqCst);
        *stub.history.lock().unwrap() = serde_json::json!([]);
        Arc::new(stub)
    }

    fn set_history(&self, rows: serde_json::Value) {
        *self.history.lock().unwrap() = rows;
    }
}

async fn start_import(State(stub): State<Arc<Stub>>) -> impl IntoResponse {
    stub.start_calls.fetch_add(1, Ordering::SeqCst);
    let delay = stub.start_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if stub.fail_start.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "import engine exploded" })),
        );
    }
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "data": { "runId": 1 } })),
    )
}

async fn history(State(stub): State<Arc<Stub>>) -> impl IntoResponse {
    stub.history_calls.fetch_add(1, Ordering::SeqCst);
    let rows = stub.history.lock().unwrap().clone();
    Json(serde_json::json!({ "data": rows }))
}

async fn pause_run(Path(_id): Path<i64>) -> impl IntoResponse {
    (
        StatusCode::CONFLICT,
        Json(serde_json::json!({ "error": "cannot pause an import run in status 'completed'" })),
    )
}

async fn stats(State(stub): State<Arc<Stub>>) -> impl IntoResponse {
    stub.stats_calls.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "data": { "totalImports": 0, "successRate": 0 } }))
}

async fn list_schedules(State(stub): State<Arc<Stub>>) -> impl IntoResponse {
    stub.schedule_calls.fetch_add(1, Ordering::SeqCst);
    let list = stub.schedules.lock().unwrap().clone();
    Json(serde_json::json!({ "data": list }))
}

async fn create_schedule(
    State(stub): State<Arc<Stub>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    if stub.fail_schedule_create.load(Ordering::SeqCst) {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "a schedule for 'vehicles' already exists" })),
        );
    }
    let id = stub.next_schedule_id.fetch_add(1, Ordering::SeqCst);
    let record = serde_json::json!({
        "id": id,
        "kind": body["type"],
        "frequency": body["frequency"],
        "active": body["active"],
        "isFullImport": body["isFullImport"],
        "startTime": body["startTime"],
        "days": body["days"],
    });
    stub.schedules.lock().unwrap().push(record.clone());
    (StatusCode::CREATED, Json(serde_json::json!({ "data": record })))
}

async fn update_schedule(
    State(stub): State<Arc<Stub>>,
    Path(id): Path<i64>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    let mut schedules = stub.schedules.lock().unwrap();
    let Some(record) = schedules.iter_mut().find(|s| s["id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "schedule not found" })),
        );
    };
    for key in ["frequency", "active", "isFullImport", "startTime", "days"] {
        if !body[key].is_null() {
            record[key] = body[key].clone();
        }
    }
    (StatusCode::OK, Json(serde_json::json!({ "data": record })))
}

async fn diagnostic() -> impl IntoResponse {
    Json(serde_json::json!({ "data": { "dbHealthy": true, "schedulerRunning": true } }))
}

async fn raw_vehicles() -> impl IntoResponse {
    Json(serde_json::json!({ "data": [] }))
}

async fn raw_parts(State(stub): State<Arc<Stub>>) -> impl IntoResponse {
    if stub.fail_raw_parts.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": "database unreachable" })),
        );
    }
    (StatusCode::OK, Json(serde_json::json!({ "data": [] })))
}

async fn spawn_stub() -> (String, Arc<Stub>) {
    let stub = Stub::new();

    let app = Router::new()
        .route("/api/v1/import/start", post(start_import))
        .route("/api/v1/import/history", get(history))
        .route("/api/v1/import/runs/{id}/pause", post(pause_run))
        .route("/api/v1/import/stats", get(stats))
        .route(
            "/api/v1/import/schedules",
            get(list_schedules).post(create_schedule),
        )
        .route("/api/v1/import/schedules/{id}", put(update_schedule).delete(delete_schedule))
        .route("/api/v1/diagnostic", get(diagnostic))
        .route("/api/v1/raw/vehicles", get(raw_vehicles))
        .route("/api/v1/raw/parts", get(raw_parts))
        .with_state(Arc::clone(&stub));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), stub)
}

async fn delete_schedule(
    State(stub): State<Arc<Stub>>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    stub.schedules.lock().unwrap().retain(|s| s["id"] != id);
    StatusCode::NO_CONTENT
}

fn console_for(base_url: &str) -> Arc<Console> {
    Arc::new(Console::new(ApiClient::new(base_url, None)))
}

const VEH_INC: OpKey = OpKey::Import(ImportKind::Vehicles, ImportMode::Incremental);

// ---------------------------------------------------------------------------
// Trigger panel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trigger_sets_busy_flag_before_and_clears_after_settle() {
    let (url, stub) = spawn_stub().await;
    stub.start_delay_ms.store(150, Ordering::SeqCst);
    let console = console_for(&url);

    let task = {
        let console = Arc::clone(&console);
        tokio::spawn(async move {
            console
                .trigger_import(ImportKind::Vehicles, ImportMode::Incremental)
                .await
        })
    };

    // While the request is in flight the op and its sibling are blocked.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(console.ops.is_pending(VEH_INC));
    assert!(console
        .ops
        .is_blocked(OpKey::Import(ImportKind::Vehicles, ImportMode::Complete)));

    let run_id = task.await.unwrap().unwrap();
    assert_eq!(run_id, 1);

    // Settled: flag cleared, view switched to the monitor.
    assert!(!console.ops.is_pending(VEH_INC));
    assert_eq!(console.view(), View::Monitor);

    let notes = console.take_notifications();
    assert!(notes.iter().any(|n| n.title == "Import started"));
}

#[tokio::test]
async fn sibling_mode_is_refused_without_touching_the_network() {
    let (url, stub) = spawn_stub().await;
    stub.start_delay_ms.store(150, Ordering::SeqCst);
    let console = console_for(&url);

    let task = {
        let console = Arc::clone(&console);
        tokio::spawn(async move {
            console
                .trigger_import(ImportKind::Vehicles, ImportMode::Incremental)
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    let refused = console
        .trigger_import(ImportKind::Vehicles, ImportMode::Complete)
        .await;
    assert_matches!(refused, Err(TriggerError::Busy(_)));

    task.await.unwrap().unwrap();

    // Only the first trigger reached the server.
    assert_eq!(stub.start_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_trigger_clears_flag_and_surfaces_server_message() {
    let (url, stub) = spawn_stub().await;
    stub.fail_start.store(true, Ordering::SeqCst);
    let console = console_for(&url);

    let result = console
        .trigger_import(ImportKind::Parts, ImportMode::Complete)
        .await;
    assert_matches!(result, Err(TriggerError::Api(_)));

    // No optimistic state left behind.
    assert!(!console
        .ops
        .is_pending(OpKey::Import(ImportKind::Parts, ImportMode::Complete)));

    let notes = console.take_notifications();
    assert!(notes
        .iter()
        .any(|n| n.message.contains("import engine exploded")));
}

// ---------------------------------------------------------------------------
// Schedule manager
// ---------------------------------------------------------------------------

#[tokio::test]
async fn created_schedule_appears_without_manual_refresh() {
    let (url, _stub) = spawn_stub().await;
    let console = console_for(&url);

    console.create_schedule().await.unwrap();

    let schedules = console.schedules_snapshot();
    assert_eq!(schedules.len(), 1);
    assert_eq!(schedules[0].kind, "vehicles");
    assert_eq!(schedules[0].frequency, "12h");
}

#[tokio::test]
async fn failed_creation_keeps_last_known_good_list() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);
    console.refresh_schedules().await.unwrap();
    stub.fail_schedule_create.store(true, Ordering::SeqCst);

    let result = console.create_schedule().await;
    assert!(result.is_err());

    // The list reverts to (stays at) the last server state.
    assert!(console.schedules_snapshot().is_empty());
    let notes = console.take_notifications();
    assert!(notes.iter().any(|n| n.message.contains("already exists")));
}

#[tokio::test]
async fn editing_draft_is_local_until_saved() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);
    console.create_schedule().await.unwrap();
    let id = console.schedules_snapshot()[0].id;

    let calls_before = stub.schedule_calls.load(Ordering::SeqCst);

    assert!(console.begin_edit(id));
    console.with_editing(|draft| draft.frequency = "24h".to_string());
    console.cancel_edit();

    // Cancelling an edit makes no server call and changes nothing.
    assert_eq!(stub.schedule_calls.load(Ordering::SeqCst), calls_before);
    assert_eq!(console.schedules_snapshot()[0].frequency, "12h");
}

#[tokio::test]
async fn saved_edit_updates_the_record() {
    let (url, _stub) = spawn_stub().await;
    let console = console_for(&url);
    console.create_schedule().await.unwrap();
    let id = console.schedules_snapshot()[0].id;

    console.begin_edit(id);
    console.with_editing(|draft| {
        draft.frequency = "24h".to_string();
        draft.active = false;
    });
    console.save_edit().await.unwrap();

    let schedules = console.schedules_snapshot();
    assert_eq!(schedules[0].frequency, "24h");
    assert!(!schedules[0].active);
}

// ---------------------------------------------------------------------------
// Live monitor
// ---------------------------------------------------------------------------

#[tokio::test]
async fn monitor_banner_follows_history_statuses() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);

    stub.set_history(serde_json::json!([
        { "id": 1, "kind": "vehicles", "status": "in_progress" }
    ]));
    console.refresh_history().await.unwrap();
    assert!(console.auto_refresh_active());
    assert_eq!(console.active_runs().len(), 1);

    stub.set_history(serde_json::json!([
        { "id": 1, "kind": "vehicles", "status": "completed" }
    ]));
    console.refresh_history().await.unwrap();
    assert!(!console.auto_refresh_active());
    assert!(console.active_runs().is_empty());
}

#[tokio::test]
async fn control_failure_surfaces_server_message() {
    let (url, _stub) = spawn_stub().await;
    let console = console_for(&url);

    let result = console.control_run(1, ControlAction::Pause).await;
    assert!(result.is_err());

    let notes = console.take_notifications();
    assert!(notes.iter().any(|n| n.message.contains("cannot pause")));
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn disabling_auto_refresh_stops_polling_calls() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);

    let mut poller = Poller::new(
        Arc::clone(&console),
        PollerIntervals {
            history: Duration::from_millis(25),
            schedules: Duration::from_millis(25),
            stats: Duration::from_millis(25),
        },
    );

    poller.set_enabled(true);
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(stub.history_calls.load(Ordering::SeqCst) > 0);
    assert!(stub.stats_calls.load(Ordering::SeqCst) > 0);

    poller.set_enabled(false);
    // Let any in-flight request land before taking the baseline.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let history_baseline = stub.history_calls.load(Ordering::SeqCst);
    let schedule_baseline = stub.schedule_calls.load(Ordering::SeqCst);
    let stats_baseline = stub.stats_calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(stub.history_calls.load(Ordering::SeqCst), history_baseline);
    assert_eq!(stub.schedule_calls.load(Ordering::SeqCst), schedule_baseline);
    assert_eq!(stub.stats_calls.load(Ordering::SeqCst), stats_baseline);
}

// ---------------------------------------------------------------------------
// Diagnostics panel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn diagnostics_reduce_probes_to_booleans() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);

    let report = console.run_diagnostics().await;
    assert!(report.api_connection);
    assert!(report.database_connection);
    assert!(report.scheduler_status);

    stub.fail_raw_parts.store(true, Ordering::SeqCst);
    let report = console.run_diagnostics().await;
    assert!(report.api_connection);
    assert!(!report.database_connection);

    let notes = console.take_notifications();
    assert!(notes.iter().any(|n| n.title == "Problems detected"));
}

// ---------------------------------------------------------------------------
// Import config plumbing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn import_config_travels_with_the_trigger() {
    let (url, stub) = spawn_stub().await;
    let console = console_for(&url);

    console.set_import_config(ImportConfig {
        from_date: chrono::NaiveDate::from_ymd_opt(2025, 3, 1),
        batch_size: 500,
        auto_recovery: false,
    });

    console
        .trigger_import(ImportKind::Vehicles, ImportMode::Incremental)
        .await
        .unwrap();

    assert_eq!(stub.start_calls.load(Ordering::SeqCst), 1);
}
