use sqlx::{
    postgres::PgPoolOptions,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    PgPool, SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Create a PostgreSQL connection pool
pub async fn create_pg_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Creating PostgreSQL connection pool...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

fn sqlite_options(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        // Avoid transient "database is locked" errors between pooled connections
        .busy_timeout(Duration::from_secs(5))
}

async fn connect_sqlite(options: SqliteConnectOptions) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(sqlite_options(options))
        .await?;

    tracing::info!("Database connection pool created successfully");

    Ok(pool)
}

/// Create a SQLite connection pool from a `sqlite:` URL
pub async fn create_sqlite_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Creating SQLite connection pool...");
    connect_sqlite(SqliteConnectOptions::from_str(database_url)?).await
}

/// Create a SQLite connection pool for a database file
pub async fn create_sqlite_pool_at(path: impl AsRef<Path>) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!("Opening SQLite database at: {:?}", path.as_ref());
    connect_sqlite(SqliteConnectOptions::new().filename(path)).await
}
