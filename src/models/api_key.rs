use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{MAX_API_KEY_LEN, MIN_API_KEY_LEN};

/// A row of the `api_keys` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiKey {
    /// The shared secret itself (primary key)
    #[serde(skip_serializing)]
    pub key: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApiKey {
    /// Validate a key before seeding: bounded length, no whitespace
    pub fn validate_format(key: &str) -> bool {
        let len = key.chars().count();
        (MIN_API_KEY_LEN..=MAX_API_KEY_LEN).contains(&len)
            && !key.chars().any(char::is_whitespace)
    }

    /// Short form safe to print, e.g. `abcdefgh...wxyz`
    pub fn preview(key: &str) -> String {
        let chars: Vec<char> = key.chars().collect();
        if chars.len() <= 12 {
            return key.to_string();
        }
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    }
}
