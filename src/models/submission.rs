use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Declared origin of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    BpTimer,
    BpsrLogs,
    Manual,
    Other,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::BpTimer,
        Source::BpsrLogs,
        Source::Manual,
        Source::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Source::BpTimer => "bp_timer",
            Source::BpsrLogs => "bpsr_logs",
            Source::Manual => "manual",
            Source::Other => "other",
        }
    }
}

/// Kind of in-game event a submission describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BossEvent,
    Combat,
    Heal,
    Trade,
}

impl Category {
    /// Sorted by wire name, the order used on the status page
    pub const ALL: [Category; 4] = [
        Category::BossEvent,
        Category::Combat,
        Category::Heal,
        Category::Trade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::BossEvent => "boss_event",
            Category::Combat => "combat",
            Category::Heal => "heal",
            Category::Trade => "trade",
        }
    }
}

/// Returned when a string is outside one of the closed enumerations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl FromStr for Source {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage-ready form of a submission after adapter processing
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub source: Source,
    pub category: Category,
    pub region: Option<String>,
    pub boss_name: Option<String>,
    /// Raw payload plus adapter metadata; unknown fields kept verbatim
    pub payload: Map<String, Value>,
}

/// A persisted submission as returned by the read endpoints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: String,
    pub source: Source,
    pub category: Category,
    pub region: Option<String>,
    pub boss_name: Option<String>,
    pub payload: Value,
    pub ingested_at: DateTime<Utc>,
}
