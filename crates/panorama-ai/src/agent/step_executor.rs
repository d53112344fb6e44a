//! Executes a single plan step: bind arguments from memory, resolve and
//! validate required arguments, then invoke the tool with bounded retries.

use panorama_traits::{ToolError, ToolOutput, ToolRegistry, WorkingMemory};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio_util::sync::CancellationToken;

use super::config::AgentConfig;
use super::plan::PlanStep;
use super::resolver::ResolverSet;
use super::status::{StatusEvent, StatusSink};
use crate::error::{AiError, Result};

/// Normalized outcome of one executed (or skipped) step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub tool_call_id: String,
    pub tool: String,
    pub args: Value,
    /// JSON payload returned to the synthesizer; `{"error": ...}` on failure.
    pub output: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl StepResult {
    fn skipped(tool_call_id: &str, step: &PlanStep, reason: &str) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            tool: step.tool.clone(),
            args: step.args.clone(),
            output: json!({ "skipped": true, "reason": reason }).to_string(),
            skipped: true,
        }
    }

    pub fn is_error(&self) -> bool {
        serde_json::from_str::<Value>(&self.output)
            .ok()
            .is_some_and(|v| v.get("error").is_some())
    }
}

pub struct StepExecutor<'a> {
    registry: &'a ToolRegistry,
    resolvers: &'a ResolverSet,
    config: &'a AgentConfig,
    status: &'a dyn StatusSink,
    cancel: &'a CancellationToken,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        registry: &'a ToolRegistry,
        resolvers: &'a ResolverSet,
        config: &'a AgentConfig,
        status: &'a dyn StatusSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            registry,
            resolvers,
            config,
            status,
            cancel,
        }
    }

    /// Run one step.
    ///
    /// Errors are limited to [`AiError::MissingArguments`], which is never
    /// retried, and [`AiError::Cancelled`]. Tool failures, and resolver
    /// lookups that keep failing, end up in the returned output as an
    /// `{"error": ...}` payload.
    pub async fn execute_step(
        &self,
        step: &PlanStep,
        memory: &mut WorkingMemory,
        call_id: &str,
    ) -> Result<StepResult> {
        if self.cancel.is_cancelled() {
            return Err(AiError::Cancelled);
        }

        let Some(contract) = self.registry.contract(&step.tool) else {
            let message = format!("Tool not found: {}", step.tool);
            tracing::warn!(tool = %step.tool, "Plan references unknown tool");
            memory.record_error(&step.tool, &message);
            return Ok(self.finish(call_id, step, step.args.clone(), error_payload(&message)));
        };

        let mut args = bind_args(&step.args, memory);
        for name in &contract.required {
            if !is_present(args.get(name))
                && let Some(id) = memory.id(name)
            {
                args.insert(name.clone(), Value::String(id.to_string()));
            }
        }

        let mut missing = contract.missing_in(&Value::Object(args.clone()));
        if !missing.is_empty() {
            for name in &missing {
                if let Some(message) = self.resolve_with_retry(name, &mut args, memory).await? {
                    memory.record_error(&step.tool, &message);
                    let payload = error_payload(&message);
                    return Ok(self.finish(call_id, step, Value::Object(args), payload));
                }
            }
            missing = contract.missing_in(&Value::Object(args.clone()));
        }
        if !missing.is_empty() {
            let error = AiError::MissingArguments {
                tool: step.tool.clone(),
                missing,
            };
            tracing::info!(tool = %step.tool, error = %error, "Step is missing arguments");
            memory.record_error(&step.tool, error.to_string());
            return Err(error);
        }

        for (key, value) in &args {
            memory.set_param(key.clone(), value.clone());
        }

        let args = Value::Object(args);
        self.status.emit(StatusEvent::ToolStarted {
            tool: step.tool.clone(),
        });
        let output = self.invoke_with_retry(&step.tool, &args, memory).await?;
        self.status.emit(StatusEvent::ToolFinished {
            tool: step.tool.clone(),
            ok: output.success,
        });

        if let Some(message) = output.error.as_deref().filter(|_| !output.success) {
            memory.record_error(&step.tool, message);
        }
        Ok(self.finish(call_id, step, args, output.to_json_string()))
    }

    /// Record a step that cannot run because its arguments stay unresolved.
    pub fn skip_step(&self, step: &PlanStep, call_id: &str, reason: &str) -> StepResult {
        tracing::info!(tool = %step.tool, reason, "Skipping step");
        StepResult::skipped(call_id, step, reason)
    }

    fn finish(&self, call_id: &str, step: &PlanStep, args: Value, output: String) -> StepResult {
        StepResult {
            tool_call_id: call_id.to_string(),
            tool: step.tool.clone(),
            args,
            output,
            skipped: false,
        }
    }

    /// Run the resolver for `name`. Transient store failures are retried with
    /// the tool backoff; the last error message is returned when they persist.
    async fn resolve_with_retry(
        &self,
        name: &str,
        args: &mut Map<String, Value>,
        memory: &mut WorkingMemory,
    ) -> Result<Option<String>> {
        let attempts = self.config.tool_retries.max(1);
        let mut attempt = 1;

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AiError::Cancelled),
                outcome = tokio::time::timeout(
                    self.config.tool_timeout,
                    self.resolvers.ensure_arg(name, args, memory),
                ) => outcome,
            };

            let (error, transient) = match outcome {
                Ok(Ok(_)) => return Ok(None),
                Ok(Err(e)) => (e.to_string(), e.is_transient()),
                Err(_) => (
                    format!(
                        "Resolving {} timed out after {}s",
                        name,
                        self.config.tool_timeout.as_secs()
                    ),
                    true,
                ),
            };
            if !transient || attempt >= attempts {
                tracing::error!(arg = name, attempt, error = %error, "Argument resolution failed");
                return Ok(Some(error));
            }

            let delay = self.config.tool_backoff(attempt);
            tracing::warn!(
                arg = name,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Retrying argument resolution"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn invoke_with_retry(
        &self,
        tool: &str,
        args: &Value,
        memory: &mut WorkingMemory,
    ) -> Result<ToolOutput> {
        let attempts = self.config.tool_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AiError::Cancelled),
                outcome = tokio::time::timeout(
                    self.config.tool_timeout,
                    self.registry.invoke(tool, args.clone(), memory),
                ) => outcome,
            };

            let error = match outcome {
                Ok(Ok(output)) => return Ok(output),
                Ok(Err(ToolError::NotFound(name))) => {
                    return Ok(ToolOutput::error(format!("Tool not found: {}", name)));
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!(
                    "{} timed out after {}s",
                    tool,
                    self.config.tool_timeout.as_secs()
                ),
            };
            last_error = error;

            if attempt == attempts {
                break;
            }
            let delay = self.config.tool_backoff(attempt);
            tracing::warn!(
                tool,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Retrying tool"
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(AiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        tracing::error!(tool, attempts, error = %last_error, "Tool failed after retries");
        Ok(ToolOutput::error(last_error))
    }
}

fn error_payload(message: &str) -> String {
    json!({ "error": message }).to_string()
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(_) => true,
    }
}

/// Substitute `{"var": "<path>"}` objects and `"{{memory.<path>}}"` strings
/// from memory. Top-level arguments that bind to nothing are dropped so the
/// contract check sees them as missing.
pub fn bind_args(args: &Value, memory: &WorkingMemory) -> Map<String, Value> {
    let Value::Object(map) = args else {
        return Map::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let bound = bind_value(value, memory);
            (!bound.is_null()).then(|| (key.clone(), bound))
        })
        .collect()
}

fn bind_value(value: &Value, memory: &WorkingMemory) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 && map.contains_key("var") => map
            .get("var")
            .and_then(Value::as_str)
            .and_then(|path| memory.lookup(path))
            .unwrap_or(Value::Null),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), bind_value(v, memory)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| bind_value(v, memory)).collect()),
        Value::String(s) => match template_path(s) {
            Some(path) => memory.lookup(path).unwrap_or(Value::Null),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn template_path(raw: &str) -> Option<&str> {
    let inner = raw.trim().strip_prefix("{{")?.strip_suffix("}}")?.trim();
    Some(inner.strip_prefix("memory.").unwrap_or(inner))
}
