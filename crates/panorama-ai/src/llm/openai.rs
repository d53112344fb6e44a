//! OpenAI-compatible chat completions provider

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, ResponseFormat, Role,
    TokenUsage, ToolCall, ToolChoice,
};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Longest provider error message kept in [`AiError::LlmHttp`].
const MAX_ERROR_MESSAGE: usize = 300;

/// Transport-level retries inside one `complete` call.
///
/// The agent bounds every LLM call with its own timeout, so waits here are
/// capped by `wait_budget`: a `Retry-After` the budget cannot cover ends the
/// call immediately instead of sleeping into the caller's deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub attempts: u32,
    /// First wait; doubles on every further retry.
    pub backoff: Duration,
    /// Total time spent waiting between attempts.
    pub wait_budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(250),
            wait_budget: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before attempt `next` (2-based), or `None` when the call should
    /// give up given the time already `waited`.
    fn wait_before(
        &self,
        next: u32,
        retry_after: Option<u64>,
        waited: Duration,
    ) -> Option<Duration> {
        if next > self.attempts {
            return None;
        }
        let wait = match retry_after {
            Some(seconds) => Duration::from_secs(seconds),
            None => self
                .backoff
                .saturating_mul(2u32.saturating_pow(next.saturating_sub(2))),
        };
        (waited.saturating_add(wait) <= self.wait_budget).then_some(wait)
    }
}

/// OpenAI client
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIMessageToolCall>>,
}

#[derive(Serialize)]
struct OpenAIMessageToolCall {
    id: String,
    r#type: &'static str,
    function: OpenAIMessageFunction,
}

#[derive(Serialize)]
struct OpenAIMessageFunction {
    name: String,
    arguments: String,
}

#[derive(Serialize)]
struct OpenAITool {
    r#type: &'static str,
    function: OpenAIFunction,
}

#[derive(Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCall>>,
}

#[derive(Deserialize)]
struct OpenAIToolCall {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize, Debug)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

fn to_wire_message(m: &Message) -> OpenAIMessage {
    let role = match m.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    let tool_calls = m.tool_calls.as_ref().map(|tcs| {
        tcs.iter()
            .map(|tc| OpenAIMessageToolCall {
                id: tc.id.clone(),
                r#type: "function",
                function: OpenAIMessageFunction {
                    name: tc.name.clone(),
                    arguments: tc.arguments.to_string(),
                },
            })
            .collect()
    });

    // Assistant tool-call turns carry a null content.
    let content = if m.tool_calls.is_some() && m.content.is_empty() {
        None
    } else {
        Some(m.content.clone())
    };

    OpenAIMessage {
        role,
        content,
        tool_call_id: m.tool_call_id.clone(),
        tool_calls,
    }
}

/// Structured outputs only run in strict mode when every object in the schema
/// is closed (`additionalProperties: false`) and lists all its properties as
/// required. Schemas with open objects, such as free-form tool args, are sent
/// non-strict and validated after parsing instead.
fn strict_compatible(schema: &Value) -> bool {
    let Some(node) = schema.as_object() else {
        return schema.as_array().is_none_or(|items| items.iter().all(strict_compatible));
    };
    if node.get("type").and_then(Value::as_str) == Some("object") {
        let Some(properties) = node.get("properties").and_then(Value::as_object) else {
            return false;
        };
        let required: Vec<&str> = node
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if node.get("additionalProperties") != Some(&Value::Bool(false))
            || !properties.keys().all(|k| required.contains(&k.as_str()))
        {
            return false;
        }
    }
    node.iter()
        .filter(|(key, _)| !matches!(key.as_str(), "enum" | "required" | "const"))
        .all(|(_, child)| strict_compatible(child))
}

fn to_wire_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::JsonObject => json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema { name, schema } => json!({
            "type": "json_schema",
            "json_schema": { "name": name, "schema": schema, "strict": strict_compatible(schema) }
        }),
    }
}

fn build_body(model: &str, request: &CompletionRequest) -> OpenAIRequest {
    let tools: Option<Vec<OpenAITool>> = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .iter()
                .map(|t| OpenAITool {
                    r#type: "function",
                    function: OpenAIFunction {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect(),
        )
    };
    let tool_choice = tools.as_ref().and(request.tool_choice.as_ref()).map(|c| match c {
        ToolChoice::Auto => "auto",
        ToolChoice::None => "none",
        ToolChoice::Required => "required",
    });

    OpenAIRequest {
        model: model.to_string(),
        messages: request.messages.iter().map(to_wire_message).collect(),
        tools,
        tool_choice,
        response_format: request.response_format.as_ref().map(to_wire_format),
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn retry_after_secs(response: &Response) -> Option<u64> {
    let raw = response.headers().get("retry-after")?.to_str().ok()?.trim();
    // Fractional values are rounded up so the wait never undershoots.
    raw.parse::<u64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .map(|s| s.ceil() as u64)
    })
}

/// Pull `error.message` out of an OpenAI error body, falling back to the raw
/// text. Either way the result is trimmed and capped.
fn error_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if message.chars().count() <= MAX_ERROR_MESSAGE {
        return message;
    }
    let mut head: String = message.chars().take(MAX_ERROR_MESSAGE).collect();
    head.push('…');
    head
}

async fn error_from_response(response: Response) -> AiError {
    let status = response.status().as_u16();
    let retry_after_secs = retry_after_secs(&response);
    let body = response.text().await.unwrap_or_default();
    AiError::LlmHttp {
        provider: "OpenAI".to_string(),
        status,
        message: error_message(&body),
        retry_after_secs,
    }
}

fn parse_response(data: OpenAIResponse) -> Result<CompletionResponse> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Llm("No response from OpenAI".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            id: tc.id,
            name: tc.function.name,
            arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
        })
        .collect();

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("stop") => FinishReason::Stop,
        Some("tool_calls") => FinishReason::ToolCalls,
        Some("length") => FinishReason::MaxTokens,
        _ => FinishReason::Error,
    };

    let usage = data.usage.map(|u| TokenUsage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        content: choice.message.content,
        tool_calls,
        finish_reason,
        usage,
    })
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_body(&self.model, &request);
        let url = format!("{}/chat/completions", self.base_url);
        let mut waited = Duration::ZERO;
        let mut attempt = 1;

        loop {
            let error = match self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    let data: OpenAIResponse = response.json().await?;
                    return parse_response(data);
                }
                Ok(response) => error_from_response(response).await,
                Err(e) => AiError::Http(e),
            };

            if !error.is_retryable() {
                return Err(error);
            }
            let Some(wait) = self
                .retry
                .wait_before(attempt + 1, error.retry_after(), waited)
            else {
                return Err(error);
            };
            tracing::warn!(
                attempt,
                wait_ms = wait.as_millis() as u64,
                error = %error,
                "Retrying OpenAI request"
            );
            tokio::time::sleep(wait).await;
            waited += wait;
            attempt += 1;
        }
    }
}
