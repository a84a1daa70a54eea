use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint
///
/// Liveness only: answers as long as the process is up, without touching
/// the database. Served at `/health` and `/.well-known/health`.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
