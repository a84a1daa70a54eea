//! Per-source payload adapters
//!
//! Each adapter maps a raw payload into the canonical fields (category,
//! boss name, region) plus free-form metadata. Adapters are pure: the same
//! payload always yields the same output or the same error. The raw payload
//! itself is never modified here; unknown fields survive untouched.

pub mod bp_timer;
pub mod bpsr_logs;

use serde_json::{Map, Value};

use crate::models::{Category, Source};
use crate::validation::ValidationError;

/// Canonical fields extracted from a raw payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdapterOutput {
    pub category: Option<Category>,
    pub boss_name: Option<String>,
    pub region: Option<String>,
    /// Merged into `payload.metadata` before storage
    pub metadata: Map<String, Value>,
}

/// Run the adapter for `source`; `manual` and `other` pass through
pub fn apply_adapter(
    source: Source,
    payload: &Map<String, Value>,
) -> Result<AdapterOutput, ValidationError> {
    match source {
        Source::BpTimer => bp_timer::normalize(payload),
        Source::BpsrLogs => bpsr_logs::normalize(payload),
        Source::Manual | Source::Other => Ok(AdapterOutput::default()),
    }
}

/// Merge adapter metadata into `payload.metadata`
///
/// A missing `metadata` key is created. A `metadata` value that is not an
/// object is left as-is and nothing is merged.
pub fn merge_metadata(payload: &mut Map<String, Value>, metadata: Map<String, Value>) {
    if metadata.is_empty() {
        return;
    }

    let slot = payload
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));

    if let Value::Object(existing) = slot {
        existing.extend(metadata);
    }
}

/// JSON truthiness: null, false, 0, "" and empty containers are absent
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// First truthy value among `keys`, in order
pub(crate) fn first_present<'a>(payload: &'a Map<String, Value>, keys: &[&str]) -> Option<(&'a str, &'a Value)> {
    keys.iter().find_map(|key| {
        payload
            .get_key_value(*key)
            .filter(|(_, value)| is_truthy(value))
            .map(|(k, v)| (k.as_str(), v))
    })
}

/// Coerce a payload value to text: strings as-is, numbers rendered
pub(crate) fn coerce_text(field: &str, value: &Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        _ => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string or number",
        }),
    }
}

/// First truthy text value among `keys`
pub(crate) fn first_text(
    payload: &Map<String, Value>,
    keys: &[&str],
) -> Result<Option<String>, ValidationError> {
    match first_present(payload, keys) {
        Some((key, value)) => coerce_text(&format!("payload.{}", key), value),
        None => Ok(None),
    }
}
