//! Plan model and the JSON schema the planner is constrained to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::config::MAX_PLAN_STEPS;

/// One tool invocation of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub tool: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    Value::Object(Map::new())
}

impl PlanStep {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args: if args.is_object() { args } else { empty_args() },
        }
    }
}

/// Ordered tool steps plus the memory artifacts that make further steps
/// unnecessary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
    pub stop_when: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlan {
    #[serde(default)]
    steps: Vec<Value>,
    #[serde(default)]
    stop_when: Option<Value>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self {
            steps,
            stop_when: Vec::new(),
        }
    }

    pub fn with_stop_when(mut self, artifacts: &[&str]) -> Self {
        self.stop_when = artifacts.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Parse the planner's JSON answer. Steps without a tool name are dropped
    /// and the result is cut to [`MAX_PLAN_STEPS`].
    pub fn parse(text: &str) -> Option<Plan> {
        let value: Value = serde_json::from_str(strip_fences(text)).ok()?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Option<Plan> {
        let raw: RawPlan = serde_json::from_value(value).ok()?;
        let steps = raw
            .steps
            .into_iter()
            .filter_map(|step| {
                let tool = step.get("tool")?.as_str()?.trim();
                if tool.is_empty() {
                    return None;
                }
                let args = step.get("args").cloned().unwrap_or(Value::Null);
                Some(PlanStep::new(tool, args))
            })
            .take(MAX_PLAN_STEPS)
            .collect();

        Some(Plan {
            steps,
            stop_when: raw.stop_when.map(stop_artifacts).unwrap_or_default(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn truncate(&mut self, budget: usize) {
        self.steps.truncate(budget);
    }
}

/// `stopWhen` arrives as `{"have": [...]}`; a bare array is accepted too.
fn stop_artifacts(value: Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("have") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
        .collect()
}

fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Response schema for the planner call; `tool` is enumerated over the
/// registered names.
pub fn plan_schema(tool_names: &[&str]) -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "steps": {
                "type": "array",
                "maxItems": MAX_PLAN_STEPS,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "tool": { "type": "string", "enum": tool_names },
                        "args": {
                            "type": "object",
                            "properties": {
                                "dueBefore": { "type": "string" },
                                "projectId": { "type": "string" },
                                "status": { "type": "string" },
                                "now": { "type": "string" },
                                "tag": { "type": "string" },
                                "name": { "type": "string" },
                                "noteId": { "type": "string" },
                                "sessionId": { "type": "string" },
                                "enabled": { "type": "boolean" },
                                "important": { "type": "boolean" },
                                "urgent": { "type": "boolean" },
                                "query": { "type": "string" },
                                "limit": { "type": "number" },
                                "lastDays": { "type": "number" },
                                "collection": { "type": "string" },
                                "where": { "type": "object" },
                                "select": { "type": "array", "items": { "type": "string" } },
                                "sort": { "type": "object" }
                            }
                        }
                    },
                    "required": ["tool", "args"]
                }
            },
            "stopWhen": {
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "have": { "type": "array", "maxItems": MAX_PLAN_STEPS, "items": { "type": "string" } }
                }
            }
        },
        "required": ["steps"]
    })
}
