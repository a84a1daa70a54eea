//! Request validation and canonicalization
//!
//! Ingest bodies are parsed by hand from a `serde_json::Value` so each kind
//! of client mistake (malformed body, missing field, wrong type, value outside
//! an enumeration) surfaces as its own error.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::adapters::{apply_adapter, merge_metadata};
use crate::constants::{MAX_BOSS_NAME_LEN, MAX_REGION_LEN, MAX_RESULT_LIMIT};
use crate::models::{CanonicalRecord, Category, Source};

/// Client-side mistakes, always reported with a 4xx status
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Malformed JSON body: {0}")]
    MalformedBody(String),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' must be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },

    #[error("Invalid {field} '{value}': expected one of {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("Field '{field}' exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("limit must be a positive integer, got {0}")]
    InvalidLimit(i64),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl ValidationError {
    /// Stable machine-readable code included in error responses
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MalformedBody(_) => "malformed_body",
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::WrongType { .. } => "wrong_type",
            ValidationError::InvalidEnum { .. } => "invalid_enum",
            ValidationError::FieldTooLong { .. } => "field_too_long",
            ValidationError::InvalidLimit(_) => "invalid_limit",
            ValidationError::InvalidQuery(_) => "invalid_query",
        }
    }
}

/// A positive result bound, capped at [`MAX_RESULT_LIMIT`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(i64);

impl Limit {
    pub const MAX: Limit = Limit(MAX_RESULT_LIMIT);

    pub fn new(requested: i64) -> Result<Self, ValidationError> {
        if requested <= 0 {
            return Err(ValidationError::InvalidLimit(requested));
        }
        Ok(Limit(requested.min(MAX_RESULT_LIMIT)))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

fn allowed<T: Copy>(variants: &[T], name: impl Fn(T) -> &'static str) -> String {
    variants.iter().map(|v| name(*v)).collect::<Vec<_>>().join(", ")
}

/// Parse `source` from a query string or body value
pub fn parse_source(value: &str) -> Result<Source, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidEnum {
        field: "source",
        value: value.to_string(),
        allowed: allowed(&Source::ALL, Source::as_str),
    })
}

/// Parse `category` from a query string or body value
pub fn parse_category(value: &str) -> Result<Category, ValidationError> {
    value.parse().map_err(|_| ValidationError::InvalidEnum {
        field: "category",
        value: value.to_string(),
        allowed: allowed(&Category::ALL, Category::as_str),
    })
}

fn required_str<'a>(body: &'a Map<String, Value>, field: &str) -> Result<&'a str, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field.to_string())),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn optional_str(body: &Map<String, Value>, field: &str) -> Result<Option<String>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
        }),
    }
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::FieldTooLong { field, max }),
        _ => Ok(()),
    }
}

/// A syntactically valid `POST /v1/ingest` body
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRequest {
    pub source: Source,
    pub category: Option<Category>,
    pub region: Option<String>,
    pub boss_name: Option<String>,
    pub payload: Map<String, Value>,
}

impl IngestRequest {
    /// Parse raw request bytes
    pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Object(mut body) = value else {
            return Err(ValidationError::MalformedBody(
                "expected a JSON object".to_string(),
            ));
        };

        let source = parse_source(required_str(&body, "source")?)?;

        let category = match body.get("category") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(parse_category(s)?),
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: "category".to_string(),
                    expected: "a string",
                })
            }
        };

        let region = optional_str(&body, "region")?;
        let boss_name = optional_str(&body, "boss_name")?;

        let payload = match body.remove("payload") {
            None | Some(Value::Null) => {
                return Err(ValidationError::MissingField("payload".to_string()))
            }
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(ValidationError::WrongType {
                    field: "payload".to_string(),
                    expected: "a JSON object",
                })
            }
        };

        Ok(IngestRequest {
            source,
            category,
            region,
            boss_name,
            payload,
        })
    }

    /// Run the source adapter and produce the storage-ready record
    ///
    /// Adapter-derived fields take precedence over the top-level ones.
    pub fn into_canonical(self) -> Result<CanonicalRecord, ValidationError> {
        let adapted = apply_adapter(self.source, &self.payload)?;

        let category = adapted
            .category
            .or(self.category)
            .ok_or_else(|| ValidationError::MissingField("category".to_string()))?;
        let region = adapted.region.or(self.region);
        let boss_name = adapted.boss_name.or(self.boss_name);

        check_len("region", region.as_deref(), MAX_REGION_LEN)?;
        check_len("boss_name", boss_name.as_deref(), MAX_BOSS_NAME_LEN)?;

        let mut payload = self.payload;
        merge_metadata(&mut payload, adapted.metadata);

        Ok(CanonicalRecord {
            source: self.source,
            category,
            region,
            boss_name,
            payload,
        })
    }
}
