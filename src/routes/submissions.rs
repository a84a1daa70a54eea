use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::constants::DEFAULT_RECENT_LIMIT;
use crate::db::SearchFilters;
use crate::error::{AppError, Result, StoreError};
use crate::models::{Category, Submission};
use crate::validation::{parse_category, parse_source, Limit, ValidationError};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    pub category: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub category: Option<String>,
    pub boss_name: Option<String>,
    pub region: Option<String>,
    pub source: Option<String>,
    pub since: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    pub category: Option<String>,
    pub since: Option<String>,
}

/// Unwrap query parameters, reporting bad ones as a validation error
fn query_params<T>(params: std::result::Result<Query<T>, QueryRejection>) -> Result<T> {
    params
        .map(|Query(inner)| inner)
        .map_err(|rejection| ValidationError::InvalidQuery(rejection.body_text()).into())
}

/// Empty query values (`?category=`) mean "no filter"
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parse `limit`, treating an empty value as absent
fn limit_param(value: Option<String>) -> Result<Option<i64>> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };

    raw.trim().parse().map(Some).map_err(|_| {
        ValidationError::InvalidQuery(format!("limit must be an integer, got '{}'", raw)).into()
    })
}

fn category_filter(value: Option<String>) -> Result<Option<Category>> {
    Ok(non_empty(value).map(|v| parse_category(&v)).transpose()?)
}

/// Accept RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC
fn parse_since(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = non_empty(value) else {
        return Ok(None);
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| {
            ValidationError::InvalidQuery(format!("since must be an ISO 8601 timestamp, got '{}'", raw))
                .into()
        })
}

/// Most recent submissions, newest first
///
/// GET /v1/submissions/recent?category=<enum>&limit=<int>
///
/// `limit` defaults to 50 and is capped at 200; zero or negative is a 422.
pub async fn recent_submissions(
    State(state): State<AppState>,
    params: std::result::Result<Query<RecentParams>, QueryRejection>,
) -> Result<Json<Vec<Submission>>> {
    let params = query_params(params)?;
    let category = category_filter(params.category)?;
    let limit = Limit::new(limit_param(params.limit)?.unwrap_or(DEFAULT_RECENT_LIMIT))?;

    let submissions = state.store.list_recent(category, limit).await?;
    Ok(Json(submissions))
}

/// Filtered search, newest first
///
/// GET /v1/submissions/search?category=&boss_name=&region=&source=&since=&limit=
pub async fn search_submissions(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Submission>>> {
    let params = query_params(params)?;

    let filters = SearchFilters {
        category: category_filter(params.category)?,
        source: non_empty(params.source)
            .map(|v| parse_source(&v))
            .transpose()?,
        boss_name: non_empty(params.boss_name),
        region: non_empty(params.region),
        since: parse_since(params.since)?,
        limit: Some(match limit_param(params.limit)? {
            Some(limit) => Limit::new(limit)?,
            None => Limit::MAX,
        }),
    };

    let submissions = state.store.search(&filters).await?;
    Ok(Json(submissions))
}

/// Single submission by id
///
/// GET /v1/submissions/:id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Submission>> {
    match state.store.get(&id).await? {
        Some(submission) => Ok(Json(submission)),
        None => {
            tracing::info!(path = "/v1/submissions/:id", status = 404, id = %id, "Submission not found");
            Err(AppError::NotFound)
        }
    }
}

/// Every matching submission as JSON Lines, newest first
///
/// GET /v1/export?category=&since=
pub async fn export_submissions(
    State(state): State<AppState>,
    params: std::result::Result<Query<ExportParams>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let params = query_params(params)?;

    let filters = SearchFilters {
        category: category_filter(params.category)?,
        since: parse_since(params.since)?,
        ..SearchFilters::default()
    };

    let submissions = state.store.search(&filters).await?;

    let mut body = String::new();
    for submission in &submissions {
        body.push_str(&serde_json::to_string(submission).map_err(StoreError::from)?);
        body.push('\n');
    }

    tracing::info!(path = "/v1/export", status = 200, rows = submissions.len(), "Export served");

    Ok(([(header::CONTENT_TYPE, "application/jsonlines")], body))
}
