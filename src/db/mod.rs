//! Storage accessor
//!
//! [`SubmissionStore`] is the single storage interface the API layer talks
//! to. Postgres and SQLite implementations differ only in column types,
//! timestamp functions and where enum constraints are enforced; callers
//! never branch on the dialect.

pub mod pool;
pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::models::{ApiKey, CanonicalRecord, Category, Source, Submission};
use crate::validation::Limit;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

/// Filters accepted by [`SubmissionStore::search`]; `None` means "any"
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    pub category: Option<Category>,
    pub source: Option<Source>,
    pub boss_name: Option<String>,
    pub region: Option<String>,
    pub since: Option<DateTime<Utc>>,
    /// `None` returns every match (used by export)
    pub limit: Option<Limit>,
}

/// Persistence operations for submissions and API keys
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Dialect name for logs
    fn dialect(&self) -> &'static str;

    /// Apply the embedded migrations for this dialect
    async fn migrate(&self) -> StoreResult<()>;

    /// Round-trip a trivial query
    async fn ping(&self) -> StoreResult<()>;

    /// Insert one record in a single statement and return it as stored
    async fn insert(&self, record: &CanonicalRecord) -> StoreResult<Submission>;

    async fn get(&self, id: &str) -> StoreResult<Option<Submission>>;

    /// Newest first, tie-broken by insertion order
    async fn search(&self, filters: &SearchFilters) -> StoreResult<Vec<Submission>>;

    async fn list_recent(
        &self,
        category: Option<Category>,
        limit: Limit,
    ) -> StoreResult<Vec<Submission>> {
        self.search(&SearchFilters {
            category,
            limit: Some(limit),
            ..SearchFilters::default()
        })
        .await
    }

    /// Total number of stored submissions
    async fn count(&self) -> StoreResult<i64>;

    /// Per-category counts of submissions ingested at or after `since`
    async fn category_counts_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<(Category, i64)>>;

    async fn find_api_key(&self, key: &str) -> StoreResult<Option<ApiKey>>;

    /// Insert a key unless it already exists; returns whether a row was added
    async fn seed_api_key(&self, key: &str, label: Option<&str>) -> StoreResult<bool>;
}

/// Shared handle used by the API layer
pub type Store = Arc<dyn SubmissionStore>;

/// Open a store for `database_url`, choosing the dialect from its scheme
pub async fn connect(database_url: &str) -> StoreResult<Store> {
    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        let pool = pool::create_pg_pool(database_url).await?;
        Ok(Arc::new(PgStore::new(pool)))
    } else if database_url.starts_with("sqlite:") {
        let pool = pool::create_sqlite_pool(database_url).await?;
        Ok(Arc::new(SqliteStore::new(pool)))
    } else {
        // Only the scheme is reported so credentials never reach the logs
        let scheme = database_url.split(':').next().unwrap_or_default();
        Err(StoreError::UnsupportedUrl(scheme.to_string()))
    }
}

/// Fresh opaque identifier for a submission
pub(crate) fn new_submission_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn stored_source(value: &str) -> StoreResult<Source> {
    value
        .parse()
        .map_err(|_| StoreError::CorruptRow(format!("unknown source '{}'", value)))
}

pub(crate) fn stored_category(value: &str) -> StoreResult<Category> {
    value
        .parse()
        .map_err(|_| StoreError::CorruptRow(format!("unknown category '{}'", value)))
}
