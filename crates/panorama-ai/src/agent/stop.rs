//! Early-termination check over declared stop-when artifacts.
//!
//! Artifact grammar:
//! - `lists.*` any non-empty list, `lists.<key>` that list non-empty
//! - `entities.*` any truthy entity, `entities.<key>` that entity truthy
//! - `ids.*` any non-empty id, `ids.<key>` that id non-empty
//! - any other dot path: the looked-up value is truthy

use panorama_traits::WorkingMemory;
use serde_json::Value;

/// True iff `stop_when` is non-empty and every artifact is present.
pub fn should_stop(stop_when: &[String], memory: &WorkingMemory) -> bool {
    !stop_when.is_empty()
        && stop_when
            .iter()
            .all(|artifact| artifact_satisfied(artifact, memory))
}

pub fn artifact_satisfied(artifact: &str, memory: &WorkingMemory) -> bool {
    let artifact = artifact.trim();
    match artifact.split_once('.') {
        Some(("lists", "*")) => memory.lists.values().any(|items| !items.is_empty()),
        Some(("lists", key)) => memory.list(key).is_some_and(|items| !items.is_empty()),
        Some(("entities", "*")) => memory.entities.values().any(is_truthy),
        Some(("entities", key)) => memory.entity(key).is_some_and(is_truthy),
        Some(("ids", "*")) => memory.ids.values().any(|id| !id.is_empty()),
        Some(("ids", key)) => memory.id(key).is_some(),
        _ => memory.lookup(artifact).as_ref().is_some_and(is_truthy),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}
