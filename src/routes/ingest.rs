use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::security::{extract_api_key, key_fingerprint};
use crate::validation::{IngestRequest, ValidationError};
use crate::AppState;

const INGEST_PATH: &str = "/v1/ingest";

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub id: String,
}

/// Ingest one submission
///
/// # Pipeline
/// 1. API key: the `X-API-Key` header must name a row in `api_keys` (401)
/// 2. Rate limit: fixed quota per window per key (429)
/// 3. Adapter + validation: body parsed, enums checked, source adapter
///    applied (422)
/// 4. Storage: single-row insert; the id is only returned once the write
///    is confirmed (500 on failure)
///
/// The body is only inspected after steps 1 and 2, so an oversized or
/// unreadable body from an unauthenticated caller is still a 401.
/// Steps 1-3 never write to storage.
pub async fn ingest_submission(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Json<IngestResponse>> {
    // 1. Authenticate
    let key = match extract_api_key(&headers) {
        Ok(key) => key,
        Err(err) => {
            tracing::info!(path = INGEST_PATH, status = 401, "Missing API key");
            return Err(err);
        }
    };
    let fingerprint = key_fingerprint(key);

    let api_key = match state.store.find_api_key(key).await? {
        Some(api_key) => api_key,
        None => {
            tracing::warn!(path = INGEST_PATH, status = 401, key = %fingerprint, "Invalid API key");
            return Err(AppError::InvalidApiKey);
        }
    };

    // 2. Rate limit
    if !state.limiter.allow(&fingerprint) {
        tracing::info!(path = INGEST_PATH, status = 429, key = %fingerprint, "Rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    // 3. Adapt and validate
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            tracing::info!(path = INGEST_PATH, status = 413, key = %fingerprint, "Body too large");
            return Err(AppError::PayloadTooLarge);
        }
        Err(rejection) => return Err(ValidationError::MalformedBody(rejection.body_text()).into()),
    };
    let record = IngestRequest::from_slice(&body)?.into_canonical()?;

    // 4. Persist
    let submission = state.store.insert(&record).await?;

    tracing::info!(
        path = INGEST_PATH,
        status = 200,
        key = %fingerprint,
        label = api_key.label.as_deref().unwrap_or("-"),
        id = %submission.id,
        source = %submission.source,
        category = %submission.category,
        "Submission ingested"
    );

    Ok(Json(IngestResponse {
        ok: true,
        id: submission.id,
    }))
}
