//! Request-scoped working memory shared between plan steps.
//!
//! Tools write resolved identifiers, named entities and compact list
//! projections here; the executor reads them back to bind arguments of later
//! steps. One instance lives for exactly one `ask` call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Failure recorded while executing a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryError {
    pub tool: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    pub ids: BTreeMap<String, String>,
    pub entities: BTreeMap<String, Value>,
    pub lists: BTreeMap<String, Vec<Value>>,
    pub params: BTreeMap<String, Value>,
    pub errors: Vec<MemoryError>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_id(&mut self, key: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(key.into(), id.into());
    }

    pub fn id(&self, key: &str) -> Option<&str> {
        self.ids
            .get(key)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn set_entity(&mut self, key: impl Into<String>, entity: Value) {
        self.entities.insert(key.into(), entity);
    }

    pub fn entity(&self, key: &str) -> Option<&Value> {
        self.entities.get(key)
    }

    pub fn set_list(&mut self, key: impl Into<String>, items: Vec<Value>) {
        self.lists.insert(key.into(), items);
    }

    pub fn list(&self, key: &str) -> Option<&[Value]> {
        self.lists.get(key).map(Vec::as_slice)
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: Value) {
        self.params.insert(key.into(), value);
    }

    pub fn record_error(&mut self, tool: impl Into<String>, message: impl Into<String>) {
        self.errors.push(MemoryError {
            tool: tool.into(),
            message: message.into(),
        });
    }

    /// Resolve a dot path such as `ids.projectId`, `entities.project.name`
    /// or `lists.tasks.0.title`. A bare key falls back to `ids`.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        let path = path.trim();
        let mut segments = path.split('.').filter(|s| !s.is_empty());
        let head = segments.next()?;

        let root = match head {
            "ids" => {
                let key = segments.next()?;
                return self
                    .id(key)
                    .map(|id| Value::String(id.to_string()))
                    .filter(|_| segments.next().is_none());
            }
            "entities" => self.entities.get(segments.next()?)?.clone(),
            "lists" => Value::Array(self.lists.get(segments.next()?)?.clone()),
            "params" => self.params.get(segments.next()?)?.clone(),
            "errors" => serde_json::to_value(&self.errors).ok()?,
            other => return self.id(other).map(|id| Value::String(id.to_string())),
        };

        segments.try_fold(root, |current, segment| match current {
            Value::Object(mut map) => map.remove(segment),
            Value::Array(mut items) => {
                let index: usize = segment.parse().ok()?;
                (index < items.len()).then(|| items.swap_remove(index))
            }
            _ => None,
        })
    }

    /// Compact view handed to the re-planner: ids, entity labels, list sizes
    /// and the most recent errors.
    pub fn snapshot(&self) -> Value {
        let entities: Map<String, Value> = self
            .entities
            .iter()
            .map(|(key, entity)| {
                let label = ["name", "title"]
                    .iter()
                    .find_map(|field| entity.get(*field).cloned())
                    .unwrap_or_else(|| entity.clone());
                (key.clone(), label)
            })
            .collect();
        let lists: Map<String, Value> = self
            .lists
            .iter()
            .map(|(key, items)| (key.clone(), json!(items.len())))
            .collect();
        let recent_errors: Vec<&MemoryError> = self.errors.iter().rev().take(3).collect();

        json!({
            "ids": self.ids,
            "entities": entities,
            "lists": lists,
            "params": self.params,
            "errors": recent_errors,
        })
    }
}
