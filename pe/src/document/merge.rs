//! Non-destructive section merge
//!
//! The merge is intentionally additive: shallow at the document top level
//! (only the target section subtree is touched) and shallow within the
//! section's data (new keys added, matching keys overwritten, absent keys
//! retained). An incomplete answer in one turn can never erase data gathered
//! in an earlier turn.

use serde_json::{Map, Value};
use tracing::debug;

use super::{DATA_FIELD, THREAD_FIELD};

/// Fold a payload into one section's data, leaving everything else untouched
///
/// Returns the new document content. Non-object payloads are ignored (the
/// merge is defined over object keys) and the content comes back unchanged.
pub fn merge_section(content: &Value, section_key: &str, payload: &Value) -> Value {
    let Some(payload_map) = payload.as_object() else {
        debug!(%section_key, "merge_section: non-object payload, skipping merge");
        return content.clone();
    };

    let mut root = content.as_object().cloned().unwrap_or_default();

    let mut section = root
        .get(section_key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut data = section
        .get(DATA_FIELD)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    for (key, value) in payload_map {
        data.insert(key.clone(), value.clone());
    }

    section.insert(DATA_FIELD.to_string(), Value::Object(data));
    root.insert(section_key.to_string(), Value::Object(section));
    Value::Object(root)
}

/// The structured data for a section, or an empty object
pub fn section_data(content: &Value, section_key: &str) -> Value {
    content
        .get(section_key)
        .and_then(|s| s.get(DATA_FIELD))
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()))
}

/// The stored conversation handle for a section, if one exists
pub fn section_handle<'a>(content: &'a Value, section_key: &str) -> Option<&'a str> {
    content
        .get(section_key)
        .and_then(|s| s.get(THREAD_FIELD))
        .and_then(Value::as_str)
}

/// Store a conversation handle on a section, preserving existing data
pub fn set_section_handle(content: &Value, section_key: &str, handle: &str) -> Value {
    let mut root = content.as_object().cloned().unwrap_or_default();

    let mut section = root
        .get(section_key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    section.insert(THREAD_FIELD.to_string(), Value::String(handle.to_string()));
    root.insert(section_key.to_string(), Value::Object(section));
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_into_empty_document() {
        let content = json!({});
        let payload = json!({"long_term_vision": "simplify bookkeeping"});

        let merged = merge_section(&content, "vision", &payload);
        assert_eq!(
            merged["vision"][DATA_FIELD]["long_term_vision"],
            "simplify bookkeeping"
        );
    }

    #[test]
    fn test_merge_retains_existing_keys() {
        let content = json!({
            "vision": { "data": { "long_term_vision": "simplify bookkeeping" } }
        });
        let payload = json!({"year_one_goals": ["open second location"]});

        let merged = merge_section(&content, "vision", &payload);
        let data = &merged["vision"][DATA_FIELD];
        assert_eq!(data["long_term_vision"], "simplify bookkeeping");
        assert_eq!(data["year_one_goals"], json!(["open second location"]));
    }

    #[test]
    fn test_merge_overwrites_matching_keys() {
        let content = json!({
            "vision": { "data": { "long_term_vision": "old" } }
        });
        let payload = json!({"long_term_vision": "new"});

        let merged = merge_section(&content, "vision", &payload);
        assert_eq!(merged["vision"][DATA_FIELD]["long_term_vision"], "new");
    }

    #[test]
    fn test_merge_leaves_sibling_sections_untouched() {
        let content = json!({
            "vision": { "thread": "thread_1", "data": { "long_term_vision": "grow" } },
            "market": { "thread": "thread_2", "data": { "target_market": "retailers" } }
        });
        let payload = json!({"competitors": ["BooksCo"]});

        let merged = merge_section(&content, "market", &payload);
        assert_eq!(merged["vision"], content["vision"]);
        assert_eq!(merged["market"][THREAD_FIELD], "thread_2");
        assert_eq!(merged["market"][DATA_FIELD]["target_market"], "retailers");
        assert_eq!(merged["market"][DATA_FIELD]["competitors"], json!(["BooksCo"]));
    }

    #[test]
    fn test_merge_preserves_thread_field() {
        let content = json!({
            "vision": { "thread": "thread_1", "data": {} }
        });
        let payload = json!({"long_term_vision": "grow"});

        let merged = merge_section(&content, "vision", &payload);
        assert_eq!(merged["vision"][THREAD_FIELD], "thread_1");
    }

    #[test]
    fn test_empty_payload_is_identity() {
        let content = json!({
            "vision": { "thread": "t", "data": { "a": 1 } },
            "market": { "data": { "b": 2 } }
        });

        let merged = merge_section(&content, "vision", &json!({}));
        assert_eq!(merged, content);
    }

    #[test]
    fn test_non_object_payload_ignored() {
        let content = json!({"vision": {"data": {"a": 1}}});
        let merged = merge_section(&content, "vision", &json!([1, 2, 3]));
        assert_eq!(merged, content);
    }

    #[test]
    fn test_handle_roundtrip() {
        let content = json!({});
        let with_handle = set_section_handle(&content, "vision", "thread_9");
        assert_eq!(section_handle(&with_handle, "vision"), Some("thread_9"));
        assert_eq!(section_handle(&with_handle, "market"), None);
    }

    #[test]
    fn test_set_handle_preserves_data() {
        let content = json!({"vision": {"data": {"a": 1}}});
        let updated = set_section_handle(&content, "vision", "thread_9");
        assert_eq!(updated["vision"][DATA_FIELD]["a"], 1);
    }

    #[test]
    fn test_section_data_missing_section() {
        let content = json!({});
        assert_eq!(section_data(&content, "vision"), json!({}));
    }
}
