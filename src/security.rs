use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

use crate::constants::{API_KEY_HEADER, KEY_FINGERPRINT_LEN};
use crate::error::AppError;

/// Short, non-reversible identifier for an API key
///
/// Logs and rate-limit identities use this instead of the key itself.
///
/// # Algorithm
/// `fingerprint = hex(SHA256(key))[..12]`
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(KEY_FINGERPRINT_LEN);
    encoded
}

/// Extract the `X-API-Key` header value
///
/// Missing, empty or non-UTF-8 headers are all treated as a missing key.
pub fn extract_api_key(headers: &HeaderMap) -> Result<&str, AppError> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or(AppError::MissingApiKey)
}
