//! Final answer composition from the accumulated tool outputs.

use tokio_util::sync::CancellationToken;

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolCall};

use super::call::complete_bounded;
use super::config::AgentConfig;
use super::prompt::synthesis_instructions;
use super::step_executor::StepResult;

const MAX_TOOL_CALL_ID: usize = 40;

pub const UNAVAILABLE_ANSWER: &str =
    "The assistant is temporarily unavailable. Please try again in a moment.";

/// Synthesized answer text.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub text: String,
    /// The LLM call failed and `text` is the stock unavailable message.
    pub degraded: bool,
}

fn short_id(id: &str) -> String {
    if id.is_empty() {
        return "call_0".to_string();
    }
    id.chars().take(MAX_TOOL_CALL_ID).collect()
}

/// Rebuild the assistant tool-call turn and its tool messages, dropping
/// skipped steps.
pub fn tool_messages(results: &[StepResult]) -> Vec<Message> {
    let executed: Vec<&StepResult> = results.iter().filter(|r| !r.skipped).collect();
    if executed.is_empty() {
        return Vec::new();
    }

    let calls = executed
        .iter()
        .map(|r| ToolCall {
            id: short_id(&r.tool_call_id),
            name: r.tool.clone(),
            arguments: r.args.clone(),
        })
        .collect();
    let mut messages = vec![Message::assistant_with_tool_calls(None, calls)];
    messages.extend(
        executed
            .iter()
            .map(|r| Message::tool_result(short_id(&r.tool_call_id), r.output.clone())),
    );
    messages
}

pub struct Synthesizer<'a> {
    llm: &'a dyn LlmClient,
    config: &'a AgentConfig,
    cancel: &'a CancellationToken,
}

impl<'a> Synthesizer<'a> {
    pub fn new(llm: &'a dyn LlmClient, config: &'a AgentConfig, cancel: &'a CancellationToken) -> Self {
        Self { llm, config, cancel }
    }

    /// Compose the answer. Only cancellation is an error; any other failure
    /// degrades to [`UNAVAILABLE_ANSWER`].
    pub async fn synthesize(
        &self,
        system: &str,
        query: &str,
        history: &[Message],
        results: &[StepResult],
    ) -> Result<Synthesis> {
        let tool_messages = tool_messages(results);
        let mut system = format!("{}\n\n{}", system, synthesis_instructions());
        if tool_messages.is_empty() {
            system.push_str("\n\nNo tool returned data for this question.");
        }

        let mut messages = Vec::with_capacity(history.len() + tool_messages.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(query));
        messages.extend(tool_messages);

        let request = CompletionRequest::new(messages).with_temperature(self.config.temperature);
        match complete_bounded(self.llm, request, self.config, self.cancel).await {
            Ok(response) if response.content.as_deref().is_some_and(|t| !t.trim().is_empty()) => {
                Ok(Synthesis {
                    text: response.content.unwrap_or_default().trim().to_string(),
                    degraded: false,
                })
            }
            Err(AiError::Cancelled) => Err(AiError::Cancelled),
            outcome => {
                match outcome {
                    Ok(_) => tracing::warn!("Synthesis returned an empty answer"),
                    Err(e) => tracing::warn!(error = %e, "Synthesis failed"),
                }
                Ok(Synthesis {
                    text: UNAVAILABLE_ANSWER.to_string(),
                    degraded: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::llm::{MockLlmClient, MockStep, Role};

    fn result(id: &str, skipped: bool) -> StepResult {
        StepResult {
            tool_call_id: id.to_string(),
            tool: "chat_tasks".to_string(),
            args: json!({}),
            output: json!({"tasks": [], "total": 0}).to_string(),
            skipped,
        }
    }

    #[test]
    fn test_tool_messages_drop_skipped_and_shorten_ids() {
        let long_id = "x".repeat(64);
        let messages = tool_messages(&[result(&long_id, false), result("call_2", true)]);
        assert_eq!(messages.len(), 2);
        let calls = messages[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.len(), 40);
        assert_eq!(messages[1].role, Role::Tool);
        assert_eq!(messages[1].tool_call_id.as_deref(), Some(calls[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_synthesis_request_layout() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::text(" You have no tasks. ")]);
        let config = AgentConfig::new();
        let cancel = CancellationToken::new();
        let synthesis = Synthesizer::new(&llm, &config, &cancel)
            .synthesize("SYS", "my tasks?", &[Message::user("hi"), Message::assistant("hello")], &[result("call_1", false)])
            .await
            .unwrap();

        assert_eq!(synthesis.text, "You have no tasks.");
        assert!(!synthesis.degraded);
        let sent = &llm.requests().await[0].messages;
        let roles: Vec<Role> = sent.iter().map(|m| m.role.clone()).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::User, Role::Assistant, Role::Tool]
        );
    }

    #[tokio::test]
    async fn test_failure_degrades() {
        let llm = MockLlmClient::from_steps("mock", vec![MockStep::error("bad gateway")]);
        let config = AgentConfig::new();
        let cancel = CancellationToken::new();
        let synthesis = Synthesizer::new(&llm, &config, &cancel)
            .synthesize("SYS", "q", &[], &[])
            .await
            .unwrap();
        assert!(synthesis.degraded);
        assert_eq!(synthesis.text, UNAVAILABLE_ANSWER);
    }
}
