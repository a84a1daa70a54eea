use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{postgres::PgRow, types::Json, PgPool, Postgres, QueryBuilder, Row};

use super::{new_submission_id, stored_category, stored_source, SearchFilters, SubmissionStore};
use crate::error::StoreResult;
use crate::models::{ApiKey, CanonicalRecord, Category, Submission};

const SELECT_SUBMISSIONS: &str =
    "SELECT id, source, category, region, boss_name, payload, ingested_at FROM submissions";

/// Postgres-backed store: JSONB payloads, `NOW()` timestamps, enum `CHECK`s
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn submission_from_row(row: &PgRow) -> StoreResult<Submission> {
    let source: String = row.try_get("source")?;
    let category: String = row.try_get("category")?;
    let Json(payload): Json<Value> = row.try_get("payload")?;

    Ok(Submission {
        id: row.try_get("id")?,
        source: stored_source(&source)?,
        category: stored_category(&category)?,
        region: row.try_get("region")?,
        boss_name: row.try_get("boss_name")?,
        payload,
        ingested_at: row.try_get("ingested_at")?,
    })
}

#[async_trait]
impl SubmissionStore for PgStore {
    fn dialect(&self) -> &'static str {
        "postgres"
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert(&self, record: &CanonicalRecord) -> StoreResult<Submission> {
        let id = new_submission_id();

        let ingested_at: DateTime<Utc> = sqlx::query_scalar(
            "INSERT INTO submissions (id, source, category, region, boss_name, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING ingested_at",
        )
        .bind(&id)
        .bind(record.source.as_str())
        .bind(record.category.as_str())
        .bind(&record.region)
        .bind(&record.boss_name)
        .bind(Json(&record.payload))
        .fetch_one(&self.pool)
        .await?;

        Ok(Submission {
            id,
            source: record.source,
            category: record.category,
            region: record.region.clone(),
            boss_name: record.boss_name.clone(),
            payload: Value::Object(record.payload.clone()),
            ingested_at,
        })
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Submission>> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_SUBMISSIONS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(submission_from_row).transpose()
    }

    async fn search(&self, filters: &SearchFilters) -> StoreResult<Vec<Submission>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(SELECT_SUBMISSIONS);
        query.push(" WHERE TRUE");

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
            query.push(" AND ingested_at >= ").push_bind(since);
        }

        query.push(" ORDER BY ingested_at DESC, seq DESC");

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
             WHERE ingested_at >= $1 GROUP BY category",
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(category, count)| Ok((stored_category(&category)?, count)))
            .collect()
    }

    async fn find_api_key(&self, key: &str) -> StoreResult<Option<ApiKey>> {
        let row: Option<(String, Option<String>, DateTime<Utc>)> =
            sqlx::query_as("SELECT key, label, created_at FROM api_keys WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(key, label, created_at)| ApiKey {
            key,
            label,
            created_at,
        }))
    }

    async fn seed_api_key(&self, key: &str, label: Option<&str>) -> StoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO api_keys (key, label) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
        )
        .bind(key)
        .bind(label)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
