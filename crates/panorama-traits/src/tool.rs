//! Tool trait and types for data-access tools.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::Result;
use crate::memory::WorkingMemory;

/// JSON Schema for tool parameters, as presented to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema object
}

/// Argument contract the executor validates before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolContract {
    pub required: Vec<String>,
    pub read_only: bool,
}

impl ToolContract {
    pub fn read_only(required: &[&str]) -> Self {
        Self {
            required: required.iter().map(|s| s.to_string()).collect(),
            read_only: true,
        }
    }

    /// Required arguments absent (or blank) in `args`.
    pub fn missing_in(&self, args: &Value) -> Vec<String> {
        self.required
            .iter()
            .filter(|name| !has_value(args.get(name.as_str())))
            .cloned()
            .collect()
    }
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Result of tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub result: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    /// Create a successful tool output.
    pub fn success(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    /// Create a handled error output. Handled errors are not retried.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(message.into()),
        }
    }

    /// Serialized payload handed to the synthesizer. Always valid JSON.
    pub fn to_json_string(&self) -> String {
        let payload = if self.success {
            self.result.clone()
        } else {
            json!({ "error": self.error.clone().unwrap_or_else(|| "Unknown error".to_string()) })
        };
        serde_json::to_string(&payload).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize tool payload");
            r#"{"error":"unserializable tool payload"}"#.to_string()
        })
    }
}

/// Core trait for read-only data tools.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name (used in plans and LLM function calls).
    fn name(&self) -> &str;

    /// Human-readable description for LLM context.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn parameters_schema(&self) -> Value;

    /// Required arguments and read-only flag.
    fn contract(&self) -> ToolContract;

    /// Run the query. Implementations write compact projections into `memory`
    /// and must never touch the underlying store except to read.
    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> Result<ToolOutput>;

    /// Build complete schema for LLM.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_treats_blank_strings_as_missing() {
        let contract = ToolContract::read_only(&["projectId", "name"]);
        let missing = contract.missing_in(&json!({"projectId": "  ", "name": "Alpha"}));
        assert_eq!(missing, vec!["projectId".to_string()]);
    }

    #[test]
    fn error_output_serializes_as_error_object() {
        let output = ToolOutput::error("boom");
        let parsed: Value = serde_json::from_str(&output.to_json_string()).unwrap();
        assert_eq!(parsed, json!({"error": "boom"}));
    }
}
