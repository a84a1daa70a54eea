use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::path::Path;

use super::{new_submission_id, stored_category, stored_source, SearchFilters, SubmissionStore};
use crate::error::StoreResult;
use crate::models::{ApiKey, CanonicalRecord, Category, Submission};

const SELECT_SUBMISSIONS: &str =
    "SELECT id, source, category, region, boss_name, payload, ingested_at FROM submissions";

/// Layout of `datetime('now')`, used to compare against stored timestamps
const SQLITE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite-backed store: payloads as JSON text, `datetime('now')` timestamps
///
/// The schema carries no `CHECK` constraints; enum validity relies on the
/// validation layer rejecting bad values before they reach storage.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) a database file and apply migrations
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let pool = super::pool::create_sqlite_pool_at(path).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_sqlite_datetime(value: DateTime<Utc>) -> String {
    value.naive_utc().format(SQLITE_DATETIME_FORMAT).to_string()
}

fn submission_from_row(row: &SqliteRow) -> StoreResult<Submission> {
    let source: String = row.try_get("source")?;
    let category: String = row.try_get("category")?;
    let payload: String = row.try_get("payload")?;
    let ingested_at: NaiveDateTime = row.try_get("ingested_at")?;

    Ok(Submission {
        id: row.try_get("id")?,
        source: stored_source(&source)?,
        category: stored_category(&category)?,
        region: row.try_get("region")?,
        boss_name: row.try_get("boss_name")?,
        payload: serde_json::from_str(&payload)?,
        ingested_at: ingested_at.and_utc(),
    })
}

#[async_trait]
impl SubmissionStore for SqliteStore {
    fn dialect(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, record: &CanonicalRecord) -> StoreResult<Submission> {
        let id = new_submission_id();
        let payload = serde_json::to_string(&record.payload)?;

        // The id is only handed out once the row is committed and visible to
        // every pooled connection
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO submissions (id, source, category, region, boss_name, payload) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(record.source.as_str())
        .bind(record.category.as_str())
        .bind(&record.region)
        .bind(&record.boss_name)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        let ingested_at: NaiveDateTime =
            sqlx::query_scalar("SELECT ingested_at FROM submissions WHERE id = ?")
                .bind(&id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(Submission {
            id,
            source: record.source,
            category: record.category,
            region: record.region.clone(),
            boss_name: record.boss_name.clone(),
            payload: Value::Object(record.payload.clone()),
            ingested_at: ingested_at.and_utc(),
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Submission>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_SUBMISSIONS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(submission_from_row).transpose()
    }

    async fn search(&self, filters: &SearchFilters) -> StoreResult<Vec<Submission>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_SUBMISSIONS);
        query.push(" WHERE 1 = 1");

        if let Some(category) = filters.category {
            query.push(" AND category = ").push_bind(category.as_str());
        }
        if let Some(source) = filters.source {
            query.push(" AND source = ").push_bind(source.as_str());
        }
        if let Some(boss_name) = &filters.boss_name {
            query.push(" AND boss_name = ").push_bind(boss_name.clone());
        }
        if let Some(region) = &filters.region {
            query.push(" AND region = ").push_bind(region.clone());
        }
        if let Some(since) = filters.since {
            query
                .push(" AND ingested_at >= ")
                .push_bind(to_sqlite_datetime(since));
        }

        // Second-resolution timestamps tie often; rowid preserves insertion order
        query.push(" ORDER BY ingested_at DESC, rowid DESC");

        if let Some(limit) = filters.limit {
            query.push(" LIMIT ").push_bind(limit.get());
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(submission_from_row).collect()
    }

    async fn count(&self) -> StoreResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn category_counts_since(&self, since: DateTime<Utc>) -> StoreResult<Vec<(Category, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM submissions \
             WHERE ingested_at >= ? GROUP BY category",
        )
        .bind(to_sqlite_datetime(since))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(category, count)| Ok((stored_category(&category)?, count)))
            .collect()
    }

    async fn find_api_key(&self, key: &str) -> StoreResult<Option<ApiKey>> {
        let row: Option<(String, Option<String>, NaiveDateTime)> =
            sqlx::query_as("SELECT key, label, created_at FROM api_keys WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(key, label, created_at)| ApiKey {
            key,
            label,
            created_at: created_at.and_utc(),
        }))
    }

    async fn seed_api_key(&self, key: &str, label: Option<&str>) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO api_keys (key, label) VALUES (?, ?) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(label)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
