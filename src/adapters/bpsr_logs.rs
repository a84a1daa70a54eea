use serde_json::{Map, Value};

use super::{coerce_text, first_present, first_text, AdapterOutput};
use crate::models::Category;
use crate::validation::ValidationError;

/// Map a bpsr_logs `category`/`type` string onto a category
///
/// Anything that is not combat, heal or trade is treated as a boss event.
fn category_for_type(kind: &str) -> Category {
    match kind.to_lowercase().as_str() {
        "combat" | "damage" => Category::Combat,
        "heal" | "healing" => Category::Heal,
        "trade" | "trade_center" => Category::Trade,
        _ => Category::BossEvent,
    }
}

fn boss_name(payload: &Map<String, Value>) -> Result<Option<String>, ValidationError> {
    match payload.get("boss") {
        Some(Value::Object(boss)) => match boss.get("name") {
            Some(name) => coerce_text("payload.boss.name", name),
            None => Ok(None),
        },
        _ => first_text(payload, &["boss_name"]),
    }
}

/// Normalize a bpsr_logs payload
///
/// Reads `boss.name`/`boss_name`, `region`/`shard`, `category`/`type` and
/// `tick`/`timestamp`. The tick is surfaced as `metadata.tick`.
pub fn normalize(payload: &Map<String, Value>) -> Result<AdapterOutput, ValidationError> {
    let boss_name = boss_name(payload)?;
    let region = first_text(payload, &["region", "shard"])?;

    let category = match first_present(payload, &["category", "type"]) {
        Some((_, Value::String(kind))) => Some(category_for_type(kind)),
        Some((key, _)) => {
            return Err(ValidationError::WrongType {
                field: format!("payload.{}", key),
                expected: "a string",
            })
        }
        None => None,
    };

    let mut metadata = Map::new();
    if let Some((_, tick)) = first_present(payload, &["tick", "timestamp"]) {
        metadata.insert("tick".to_string(), tick.clone());
    }

    Ok(AdapterOutput {
        category,
        boss_name,
        region,
        metadata,
    })
}
