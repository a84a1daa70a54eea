pub mod health;
pub mod ingest;
pub mod status;
pub mod submissions;

pub use health::health_check;
pub use ingest::ingest_submission;
pub use status::status_page;
pub use submissions::{export_submissions, get_submission, recent_submissions, search_submissions};

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::constants::MAX_INGEST_BODY_BYTES;
use crate::AppState;

/// Build the CORS layer from the configured allow-list
///
/// Origins that are not valid header values are skipped with a warning.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Add `Cache-Control: public, max-age=N` to successful GET responses that lack one
///
/// Errors (404, 422, 500) are never marked cacheable.
async fn cache_headers(State(max_age): State<u64>, request: Request, next: Next) -> Response {
    let is_get = request.method() == Method::GET;
    let mut response = next.run(request).await;

    if is_get
        && response.status().is_success()
        && !response.headers().contains_key(header::CACHE_CONTROL)
    {
        if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", max_age)) {
            response.headers_mut().insert(header::CACHE_CONTROL, value);
        }
    }

    response
}

/// Assemble the full HTTP surface
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let cache_max_age = state.config.status_cache_seconds;

    Router::new()
        .route("/", get(status_page))
        .route("/health", get(health_check))
        .route("/.well-known/health", get(health_check))
        .route("/v1/ingest", post(ingest_submission))
        .route("/v1/submissions/recent", get(recent_submissions))
        .route("/v1/submissions/search", get(search_submissions))
        .route("/v1/submissions/:id", get(get_submission))
        .route("/v1/export", get(export_submissions))
        .layer(DefaultBodyLimit::max(MAX_INGEST_BODY_BYTES))
        .layer(middleware::from_fn_with_state(cache_max_age, cache_headers))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
