/// Default number of records returned by `/v1/submissions/recent`
pub const DEFAULT_RECENT_LIMIT: i64 = 50;

/// Hard ceiling on any list or search result
pub const MAX_RESULT_LIMIT: i64 = 200;

/// Maximum accepted ingest body (256 KiB)
pub const MAX_INGEST_BODY_BYTES: usize = 262_144;

/// Maximum length of the `region` column
pub const MAX_REGION_LEN: usize = 32;

/// Maximum length of the `boss_name` column
pub const MAX_BOSS_NAME_LEN: usize = 120;

/// Status page reports records ingested within this many hours
pub const STATUS_WINDOW_HOURS: i64 = 24;

/// API key length bounds accepted by `seed-key`
pub const MIN_API_KEY_LEN: usize = 8;
pub const MAX_API_KEY_LEN: usize = 256;

/// Number of hex characters of the SHA-256 key digest shown in logs
pub const KEY_FINGERPRINT_LEN: usize = 12;

/// Header carrying the client's API key
pub const API_KEY_HEADER: &str = "x-api-key";

// =============================================================================
// Error Messages
// =============================================================================

/// Error message for a request without an API key
pub const ERR_MISSING_API_KEY: &str = "Missing X-API-Key header";

/// Error message for an unknown API key
pub const ERR_INVALID_API_KEY: &str = "Invalid API key";

/// Error message for an exhausted rate limit window
pub const ERR_RATE_LIMITED: &str = "Rate limit exceeded - too many requests";

/// Generic message returned for storage failures
pub const ERR_INTERNAL: &str = "Internal server error";

/// Error message for an ingest body over the size limit
pub const ERR_BODY_TOO_LARGE: &str = "Request body exceeds 256 KiB";
