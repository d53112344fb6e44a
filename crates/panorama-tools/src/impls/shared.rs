use panorama_traits::{Document, ID_FIELD, ToolOutput, document_id};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::selectors::clamp_text;

/// Default clamp for free-text fields handed to the model.
pub(crate) const TEXT_CLAMP: usize = 300;

/// Deserialize tool input, turning failures into a handled error output.
pub(crate) fn parse_input<T: DeserializeOwned>(
    input: Value,
    hint: &str,
) -> std::result::Result<T, ToolOutput> {
    serde_json::from_value(input)
        .map_err(|e| ToolOutput::error(format!("Invalid input: {}. {}", e, hint)))
}

/// Trim an optional string argument, treating blanks as absent.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read a string field, empty when absent.
pub(crate) fn text(doc: &Document, field: &str) -> String {
    doc.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn clamped(doc: &Document, field: &str) -> String {
    clamp_text(&text(doc, field), TEXT_CLAMP)
}

/// Field value or `null`.
pub(crate) fn field_or_null(doc: &Document, field: &str) -> Value {
    doc.get(field).cloned().unwrap_or(Value::Null)
}

pub(crate) fn flag(doc: &Document, field: &str) -> bool {
    doc.get(field).and_then(Value::as_bool).unwrap_or(false)
}

pub(crate) fn id_value(doc: &Document) -> Value {
    document_id(doc).map(Value::String).unwrap_or(Value::Null)
}

/// Limit from a number or numeric string, clamped to `[1, max]`.
pub(crate) fn clamp_limit(raw: Option<&Value>, default: usize, max: usize) -> usize {
    let requested = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite() && *n >= 1.0)
    .map(|n| n as usize)
    .unwrap_or(default);
    requested.clamp(1, max)
}

fn is_id_key(key: &str) -> bool {
    key == "id" || key == ID_FIELD || key.ends_with("Id")
}

/// Drop identifier keys so the projection can go into `memory.lists`.
pub(crate) fn without_id(item: &Value) -> Value {
    match item {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| !is_id_key(key))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

pub(crate) fn human_fields(items: &[Value]) -> Vec<Value> {
    items.iter().map(without_id).collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 8, 50), 8);
        assert_eq!(clamp_limit(Some(&json!(500)), 8, 50), 50);
        assert_eq!(clamp_limit(Some(&json!("3")), 8, 50), 3);
        assert_eq!(clamp_limit(Some(&json!(0)), 8, 50), 8);
    }

    #[test]
    fn test_without_id() {
        let item = json!({"id": "t1", "projectId": "p1", "title": "Ship"});
        assert_eq!(without_id(&item), json!({"title": "Ship"}));
    }
}
