use serde_json::{Map, Value};

use super::{first_present, first_text, AdapterOutput};
use crate::models::Category;
use crate::validation::ValidationError;

/// Map a BP Timer `event` to a category; unknown events leave it to the caller
fn category_for_event(event: &str) -> Option<Category> {
    match event.to_lowercase().as_str() {
        "damage" => Some(Category::Combat),
        "heal" => Some(Category::Heal),
        "boss_spawn" | "boss_defeat" => Some(Category::BossEvent),
        _ => None,
    }
}

/// Normalize a BP Timer payload
///
/// Reads `boss`/`boss_name`, `region`/`server`, `event` and
/// `timestamp`/`time`. The timestamp is surfaced as `metadata.timestamp`.
pub fn normalize(payload: &Map<String, Value>) -> Result<AdapterOutput, ValidationError> {
    let boss_name = first_text(payload, &["boss", "boss_name"])?;
    let region = first_text(payload, &["region", "server"])?;

    let category = match payload.get("event") {
        Some(Value::String(event)) => category_for_event(event),
        _ => None,
    };

    let mut metadata = Map::new();
    if let Some((_, timestamp)) = first_present(payload, &["timestamp", "time"]) {
        metadata.insert("timestamp".to_string(), timestamp.clone());
    }

    Ok(AdapterOutput {
        category,
        boss_name,
        region,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize_json(value: Value) -> Result<AdapterOutput, ValidationError> {
        match value {
            Value::Object(map) => normalize(&map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_full_payload() {
        let output = normalize_json(json!({
            "boss": "Frostclaw",
            "event": "boss_spawn",
            "timestamp": "2024-01-01T12:00:00Z",
            "server": "NA",
            "hp_percent": 100.0
        }))
        .unwrap();

        assert_eq!(output.boss_name.as_deref(), Some("Frostclaw"));
        assert_eq!(output.region.as_deref(), Some("NA"));
        assert_eq!(output.category, Some(Category::BossEvent));
        assert_eq!(output.metadata["timestamp"], "2024-01-01T12:00:00Z");
        assert_eq!(output.metadata.len(), 1);
    }

    #[test]
    fn test_event_mapping() {
        let cases = [
            ("damage", Some(Category::Combat)),
            ("HEAL", Some(Category::Heal)),
            ("boss_defeat", Some(Category::BossEvent)),
            ("emote", None),
        ];
        for (event, expected) in cases {
            let output = normalize_json(json!({ "event": event })).unwrap();
            assert_eq!(output.category, expected, "event {}", event);
        }
    }

    #[test]
    fn test_region_preferred_over_server() {
        let output = normalize_json(json!({"region": "EU", "server": "NA"})).unwrap();
        assert_eq!(output.region.as_deref(), Some("EU"));
    }

    #[test]
    fn test_time_fallback() {
        let output = normalize_json(json!({"time": 1704110400})).unwrap();
        assert_eq!(output.metadata["timestamp"], 1704110400);
    }

    #[test]
    fn test_empty_payload() {
        let output = normalize_json(json!({})).unwrap();
        assert_eq!(output, AdapterOutput::default());
    }

    #[test]
    fn test_deterministic() {
        let payload = json!({"boss": "Frostclaw", "event": "damage", "time": 5});
        assert_eq!(
            normalize_json(payload.clone()).unwrap(),
            normalize_json(payload).unwrap()
        );
    }

    #[test]
    fn test_object_boss_rejected() {
        let err = normalize_json(json!({"boss": {"name": "Frostclaw"}})).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { ref field, .. } if field == "payload.boss"));
    }
}
