//! BPSR Crowd Data Library
//!
//! Community ingestion API for Blue Protocol: Star Resonance events.
//! Submissions are authenticated by API key, rate limited, normalized by
//! source adapter, validated and stored in Postgres or SQLite.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod security;
pub mod validation;

pub use config::Config;
pub use db::{Store, SubmissionStore};
pub use error::{AppError, Result, StoreError};

use std::sync::Arc;

use models::{FixedWindowLimiter, RateLimiter, Unlimited};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub limiter: Arc<dyn RateLimiter>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState, building the rate limiter from configuration
    pub fn new(store: Store, config: Config) -> Self {
        let limiter: Arc<dyn RateLimiter> = if config.disable_rate_limit {
            tracing::warn!("Rate limiting disabled by BPSR_DISABLE_RATELIMIT");
            Arc::new(Unlimited)
        } else {
            Arc::new(FixedWindowLimiter::new(
                config.rate_limit_per_window,
                config.rate_limit_window(),
            ))
        };

        Self {
            store,
            limiter,
            config,
        }
    }
}

/// Connect to the configured database, apply migrations and seed the default key
pub async fn init_store(config: &Config) -> std::result::Result<Store, StoreError> {
    let store = db::connect(&config.database_url).await?;

    tracing::info!("Running {} migrations...", store.dialect());
    store.migrate().await?;
    tracing::info!("Migrations complete");

    if let Some(key) = &config.default_api_key {
        if store.seed_api_key(key, Some("default")).await? {
            tracing::info!(key = %security::key_fingerprint(key), "Seeded default API key");
        }
    }

    Ok(store)
}
