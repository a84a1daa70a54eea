//! Integration tests for the BPSR Crowd Data API
//!
//! These tests drive the full router (auth, rate limiting, adapters,
//! validation and SQLite storage) one request at a time.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use bpsr_crowd_data::db::SqliteStore;
use bpsr_crowd_data::{init_store, routes, AppState, Config, Store};

// Test configuration constants
const TEST_KEY: &str = "test-key-12345";

// =============================================================================
// Test Helpers
// =============================================================================

/// Create a test configuration
fn test_config() -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: String::new(), // Set per test when needed
        default_api_key: None,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        rate_limit_per_window: 100,
        rate_limit_window_secs: 60,
        disable_rate_limit: false,
        status_cache_seconds: 15,
        environment: "test".to_string(),
    }
}

/// Create a migrated test store with the test key seeded
async fn create_test_store(temp_dir: &TempDir) -> Store {
    let store = SqliteStore::open(temp_dir.path().join("test.db"))
        .await
        .expect("Failed to create test database");
    let store: Store = Arc::new(store);
    store.seed_api_key(TEST_KEY, Some("test")).await.unwrap();
    store
}

/// Create a test app router
fn create_test_app(store: Store, config: Config) -> Router {
    routes::router(AppState::new(store, config))
}

async fn setup(temp_dir: &TempDir) -> (Store, Router) {
    let store = create_test_store(temp_dir).await;
    let app = create_test_app(store.clone(), test_config());
    (store, app)
}

/// Parse response body as JSON
async fn body_to_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Create an ingest request, optionally carrying an API key
fn make_ingest_request(key: Option<&str>, body: String) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/ingest")
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Create a GET request
fn make_get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Ingest a body with the test key and return the new id
async fn ingest_ok(app: &Router, body: Value) -> String {
    let response = app
        .clone()
        .oneshot(make_ingest_request(Some(TEST_KEY), body.to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["ok"], true);
    body["id"].as_str().unwrap().to_string()
}

fn smoke_submission() -> Value {
    json!({
        "source": "manual",
        "category": "boss_event",
        "region": "NA",
        "boss_name": "Shell Smoke",
        "payload": {"note": "shell smoke"}
    })
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check_returns_ok() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    for uri in ["/health", "/.well-known/health"] {
        let response = app.clone().oneshot(make_get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());
    }
}

// =============================================================================
// Ingest Tests
// =============================================================================

#[tokio::test]
async fn test_end_to_end_smoke() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let id = ingest_ok(&app, smoke_submission()).await;

    let response = app
        .oneshot(make_get_request(
            "/v1/submissions/recent?category=boss_event&limit=1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_to_json(response.into_body()).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], id.as_str());
    assert_eq!(records[0]["source"], "manual");
    assert_eq!(records[0]["region"], "NA");
    assert_eq!(records[0]["boss_name"], "Shell Smoke");
    assert_eq!(records[0]["payload"], json!({"note": "shell smoke"}));
    assert!(records[0]["ingested_at"].as_str().is_some());
}

#[tokio::test]
async fn test_missing_api_key_returns_unauthorized() {
    let temp_dir = TempDir::new().unwrap();
    let (store, app) = setup(&temp_dir).await;

    let response = app
        .oneshot(make_ingest_request(None, smoke_submission().to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "missing_api_key");

    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_api_key_returns_unauthorized() {
    let temp_dir = TempDir::new().unwrap();
    let (store, app) = setup(&temp_dir).await;

    let response = app
        .oneshot(make_ingest_request(
            Some("not-a-real-key"),
            smoke_submission().to_string(),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "invalid_api_key");

    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_category_rejected_before_storage() {
    let temp_dir = TempDir::new().unwrap();
    let (store, app) = setup(&temp_dir).await;

    let body = json!({
        "source": "manual",
        "category": "not_a_category",
        "payload": {}
    });
    let response = app
        .oneshot(make_ingest_request(Some(TEST_KEY), body.to_string()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "invalid_enum");
    assert!(body["error"].as_str().unwrap().contains("not_a_category"));

    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_validation_errors_are_distinguished() {
    let temp_dir = TempDir::new().unwrap();
    let (store, app) = setup(&temp_dir).await;

    let cases = [
        ("{\"source\": \"manual\",".to_string(), "malformed_body"),
        (
            json!({"source": "manual", "category": "combat"}).to_string(),
            "missing_field",
        ),
        (
            json!({"source": "manual", "category": "combat", "payload": [1]}).to_string(),
            "wrong_type",
        ),
        (
            json!({"source": "scraper", "category": "combat", "payload": {}}).to_string(),
            "invalid_enum",
        ),
    ];

    for (body, code) in cases {
        let response = app
            .clone()
            .oneshot(make_ingest_request(Some(TEST_KEY), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["code"], code);
    }

    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_oversized_body_checked_after_auth() {
    let temp_dir = TempDir::new().unwrap();
    let (store, app) = setup(&temp_dir).await;

    let oversized = json!({
        "source": "manual",
        "category": "trade",
        "payload": {"blob": "x".repeat(300 * 1024)}
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(make_ingest_request(None, oversized.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "missing_api_key");

    let response = app
        .oneshot(make_ingest_request(Some(TEST_KEY), oversized))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "payload_too_large");

    assert_eq!(store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_every_enum_pair_is_returned_first_by_recent() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    for source in ["bp_timer", "bpsr_logs", "manual", "other"] {
        for category in ["combat", "heal", "boss_event", "trade"] {
            let id = ingest_ok(
                &app,
                json!({"source": source, "category": category, "payload": {}}),
            )
            .await;

            let uri = format!("/v1/submissions/recent?category={}", category);
            let response = app.clone().oneshot(make_get_request(&uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let body = body_to_json(response.into_body()).await;
            assert_eq!(body[0]["id"], id.as_str(), "{} / {}", source, category);
            assert_eq!(body[0]["source"], source);
            assert_eq!(body[0]["category"], category);
        }
    }
}

#[tokio::test]
async fn test_unknown_fields_survive_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let payload = json!({
        "boss": "Frostclaw",
        "event": "boss_spawn",
        "server": "NA",
        "timestamp": "2024-01-01T12:00:00Z",
        "hp_percent": 100.0,
        "party": [{"name": "a", "class": "Stormblade"}],
        "client": {"version": "1.2.3"}
    });
    let id = ingest_ok(&app, json!({"source": "bp_timer", "payload": payload})).await;

    let response = app
        .oneshot(make_get_request(&format!("/v1/submissions/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = body_to_json(response.into_body()).await;
    assert_eq!(record["category"], "boss_event");
    assert_eq!(record["boss_name"], "Frostclaw");
    assert_eq!(record["region"], "NA");

    let stored = &record["payload"];
    assert_eq!(stored["party"], payload["party"]);
    assert_eq!(stored["client"], payload["client"]);
    assert_eq!(stored["hp_percent"], payload["hp_percent"]);
    assert_eq!(stored["metadata"]["timestamp"], "2024-01-01T12:00:00Z");
}

#[tokio::test]
async fn test_bpsr_logs_adapter_via_api() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let id = ingest_ok(
        &app,
        json!({
            "source": "bpsr_logs",
            "category": "boss_event",
            "payload": {"type": "healing", "boss": {"name": "Tempest Ogre"}, "tick": 991, "shard": "SEA"}
        }),
    )
    .await;

    let response = app
        .oneshot(make_get_request(&format!("/v1/submissions/{}", id)))
        .await
        .unwrap();
    let record = body_to_json(response.into_body()).await;

    assert_eq!(record["category"], "heal");
    assert_eq!(record["boss_name"], "Tempest Ogre");
    assert_eq!(record["region"], "SEA");
    assert_eq!(record["payload"]["metadata"]["tick"], 991);
}

// =============================================================================
// Rate Limiting Tests
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_request_over_quota() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir).await;
    let config = Config {
        rate_limit_per_window: 2,
        ..test_config()
    };
    let app = create_test_app(store.clone(), config);

    ingest_ok(&app, smoke_submission()).await;
    ingest_ok(&app, smoke_submission()).await;

    let response = app
        .clone()
        .oneshot(make_ingest_request(
            Some(TEST_KEY),
            smoke_submission().to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["code"], "rate_limit_exceeded");

    // Rejected request did not reach storage
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rate_limit_recovers_after_window() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir).await;
    let config = Config {
        rate_limit_per_window: 1,
        rate_limit_window_secs: 1,
        ..test_config()
    };
    let app = create_test_app(store.clone(), config);

    ingest_ok(&app, smoke_submission()).await;

    let response = app
        .clone()
        .oneshot(make_ingest_request(
            Some(TEST_KEY),
            smoke_submission().to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Let the one-second window elapse
    tokio::time::sleep(Duration::from_millis(1100)).await;

    ingest_ok(&app, smoke_submission()).await;
    assert_eq!(store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_rate_limit_can_be_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_test_store(&temp_dir).await;
    let config = Config {
        rate_limit_per_window: 1,
        disable_rate_limit: true,
        ..test_config()
    };
    let app = create_test_app(store.clone(), config);

    for _ in 0..3 {
        ingest_ok(&app, smoke_submission()).await;
    }
    assert_eq!(store.count().await.unwrap(), 3);
}

// =============================================================================
// Read Endpoint Tests
// =============================================================================

#[tokio::test]
async fn test_recent_rejects_non_positive_limit() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    for limit in ["0", "-1"] {
        let uri = format!("/v1/submissions/recent?limit={}", limit);
        let response = app.clone().oneshot(make_get_request(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["code"], "invalid_limit");
    }

    let response = app
        .oneshot(make_get_request("/v1/submissions/recent?limit=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_empty_query_values_mean_no_filter() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let id = ingest_ok(&app, smoke_submission()).await;

    for uri in [
        "/v1/submissions/recent?category=&limit=",
        "/v1/submissions/search?category=&boss_name=&region=&source=&since=&limit=",
    ] {
        let response = app.clone().oneshot(make_get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", uri);

        let body = body_to_json(response.into_body()).await;
        assert_eq!(body[0]["id"], id.as_str());
    }
}

#[tokio::test]
async fn test_recent_limit_one_returns_at_most_one() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let response = app
        .clone()
        .oneshot(make_get_request("/v1/submissions/recent?limit=1"))
        .await
        .unwrap();
    let body = body_to_json(response.into_body()).await;
    assert!(body.as_array().unwrap().is_empty());

    ingest_ok(&app, smoke_submission()).await;
    let last = ingest_ok(&app, smoke_submission()).await;

    let response = app
        .oneshot(make_get_request("/v1/submissions/recent?limit=1"))
        .await
        .unwrap();
    let body = body_to_json(response.into_body()).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], last.as_str());
}

#[tokio::test]
async fn test_recent_rejects_invalid_category() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let response = app
        .oneshot(make_get_request("/v1/submissions/recent?category=raid"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_search_filters_by_boss_and_category() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let frostclaw = ingest_ok(
        &app,
        json!({"source": "manual", "category": "boss_event", "boss_name": "Frostclaw", "payload": {}}),
    )
    .await;
    ingest_ok(
        &app,
        json!({"source": "manual", "category": "boss_event", "boss_name": "Golem", "payload": {}}),
    )
    .await;
    ingest_ok(
        &app,
        json!({"source": "manual", "category": "combat", "boss_name": "Frostclaw", "payload": {}}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(make_get_request(
            "/v1/submissions/search?category=boss_event&boss_name=Frostclaw",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], frostclaw.as_str());

    let response = app
        .clone()
        .oneshot(make_get_request("/v1/submissions/search?boss_name=Frostclaw"))
        .await
        .unwrap();
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(make_get_request(
            "/v1/submissions/search?since=2000-01-01T00:00:00Z&source=manual",
        ))
        .await
        .unwrap();
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 3);

    let response = app
        .oneshot(make_get_request("/v1/submissions/search?since=yesterday"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_unknown_submission_returns_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let response = app
        .oneshot(make_get_request("/v1/submissions/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_export_streams_json_lines() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    ingest_ok(&app, smoke_submission()).await;
    ingest_ok(
        &app,
        json!({"source": "other", "category": "trade", "payload": {"item": "ore"}}),
    )
    .await;

    let response = app
        .clone()
        .oneshot(make_get_request("/v1/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/jsonlines"
    );

    let text = body_to_string(response.into_body()).await;
    let lines: Vec<Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["category"], "trade");
    assert_eq!(lines[1]["category"], "boss_event");

    let response = app
        .oneshot(make_get_request("/v1/export?category=trade"))
        .await
        .unwrap();
    let text = body_to_string(response.into_body()).await;
    assert_eq!(text.lines().count(), 1);
}

#[tokio::test]
async fn test_get_responses_carry_cache_headers() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    let response = app
        .clone()
        .oneshot(make_get_request("/v1/submissions/recent"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=15"
    );

    let response = app
        .clone()
        .oneshot(make_ingest_request(Some(TEST_KEY), smoke_submission().to_string()))
        .await
        .unwrap();
    assert!(response.headers().get(header::CACHE_CONTROL).is_none());

    // Errors are never cacheable
    for uri in [
        "/v1/submissions/does-not-exist",
        "/v1/submissions/recent?limit=0",
    ] {
        let response = app.clone().oneshot(make_get_request(uri)).await.unwrap();
        assert!(!response.status().is_success());
        assert!(response.headers().get(header::CACHE_CONTROL).is_none(), "{}", uri);
    }
}

// =============================================================================
// Status Page Tests
// =============================================================================

#[tokio::test]
async fn test_status_page_shows_counts() {
    let temp_dir = TempDir::new().unwrap();
    let (_, app) = setup(&temp_dir).await;

    ingest_ok(&app, smoke_submission()).await;

    let response = app.oneshot(make_get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let html = body_to_string(response.into_body()).await;
    assert!(html.contains("<tr><td>boss_event</td><td>1</td></tr>"));
    assert!(html.contains("<tr><td>trade</td><td>0</td></tr>"));
    assert!(html.contains("<tr><th>Total</th><th>1</th></tr>"));
}

// =============================================================================
// Startup Tests
// =============================================================================

#[tokio::test]
async fn test_init_store_seeds_default_key() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config {
        database_url: format!("sqlite://{}", temp_dir.path().join("init.db").display()),
        default_api_key: Some("startup-key-0001".to_string()),
        ..test_config()
    };

    let store = init_store(&config).await.unwrap();
    let app = create_test_app(store.clone(), config.clone());

    let response = app
        .oneshot(make_ingest_request(
            Some("startup-key-0001"),
            smoke_submission().to_string(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Running startup again is harmless
    let store = init_store(&config).await.unwrap();
    let key = store.find_api_key("startup-key-0001").await.unwrap().unwrap();
    assert_eq!(key.label.as_deref(), Some("default"));
    assert_eq!(store.count().await.unwrap(), 1);
}
