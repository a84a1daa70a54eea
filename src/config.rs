use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Origins allowed when `API_ALLOWED_ORIGINS` is not set
const DEFAULT_ALLOWED_ORIGINS: [&str; 6] = [
    "http://localhost",
    "http://127.0.0.1",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub default_api_key: Option<String>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_per_window: u32,
    pub rate_limit_window_secs: u64,
    pub disable_rate_limit: bool,
    pub status_cache_seconds: u64,
    pub environment: String,
}

fn parse_var<T: FromStr>(value: Option<String>, name: &str, default: T) -> Result<T, String> {
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {}: '{}'", name, raw)),
        None => Ok(default),
    }
}

fn parse_flag(value: Option<String>) -> bool {
    value
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        // Empty values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let server_host = get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let server_port = match get("PORT") {
            Some(port) => parse_var(Some(port), "PORT", 8000)?,
            None => parse_var(get("SERVER_PORT"), "SERVER_PORT", 8000)?,
        };

        let database_url = get("DATABASE_URL").unwrap_or_else(|| "sqlite://dev.db".to_string());

        let default_api_key = get("DEFAULT_API_KEY");

        let allowed_origins: Vec<String> = get("API_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let allowed_origins = if allowed_origins.is_empty() {
            DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
        } else {
            allowed_origins
        };

        let rate_limit_per_window: u32 =
            parse_var(get("RATE_LIMIT_PER_MINUTE"), "RATE_LIMIT_PER_MINUTE", 60)?;
        let rate_limit_window_secs: u64 =
            parse_var(get("RATE_LIMIT_WINDOW_SECS"), "RATE_LIMIT_WINDOW_SECS", 60)?;

        let disable_rate_limit = parse_flag(get("BPSR_DISABLE_RATELIMIT"));

        let status_cache_seconds =
            parse_var(get("STATUS_CACHE_SECONDS"), "STATUS_CACHE_SECONDS", 15)?;

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            database_url,
            default_api_key,
            allowed_origins,
            rate_limit_per_window: rate_limit_per_window.max(1),
            rate_limit_window_secs: rate_limit_window_secs.max(1),
            disable_rate_limit,
            status_cache_seconds,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}
