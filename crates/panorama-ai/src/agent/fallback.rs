//! Single-shot tool calling, used when no plan could be produced.

use panorama_traits::{ToolRegistry, WorkingMemory};
use tokio_util::sync::CancellationToken;

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolChoice};

use super::call::complete_bounded;
use super::config::AgentConfig;
use super::plan::PlanStep;
use super::step_executor::{StepExecutor, StepResult};

/// What the single tool-calling round produced.
#[derive(Debug)]
pub enum FallbackOutcome {
    /// The model answered directly without calling tools.
    Answered(String),
    /// Tool calls were executed; their results still need synthesis.
    Executed(Vec<StepResult>),
}

pub struct SingleShot<'a> {
    llm: &'a dyn LlmClient,
    registry: &'a ToolRegistry,
    config: &'a AgentConfig,
    cancel: &'a CancellationToken,
}

impl<'a> SingleShot<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        registry: &'a ToolRegistry,
        config: &'a AgentConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            llm,
            registry,
            config,
            cancel,
        }
    }

    /// One tool-calling LLM call over the full tool schema. At most
    /// `max_steps` of the returned calls are executed; missing-argument calls
    /// are recorded as skipped.
    pub async fn run(
        &self,
        system: &str,
        query: &str,
        history: &[Message],
        executor: &StepExecutor<'_>,
        memory: &mut WorkingMemory,
    ) -> Result<FallbackOutcome> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(system));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(query));

        let request = CompletionRequest::new(messages)
            .with_tools(self.registry.schemas())
            .with_tool_choice(ToolChoice::Auto)
            .with_temperature(self.config.temperature);
        let response = complete_bounded(self.llm, request, self.config, self.cancel).await?;

        if response.tool_calls.is_empty() {
            let text = response.content.unwrap_or_default().trim().to_string();
            if text.is_empty() {
                return Err(AiError::InvalidFormat(
                    "empty response without tool calls".to_string(),
                ));
            }
            return Ok(FallbackOutcome::Answered(text));
        }

        let total = response.tool_calls.len();
        if total > self.config.max_steps {
            tracing::warn!(
                requested = total,
                budget = self.config.max_steps,
                "Dropping tool calls over budget"
            );
        }

        let mut results = Vec::new();
        for call in response.tool_calls.into_iter().take(self.config.max_steps) {
            let step = PlanStep::new(call.name, call.arguments);
            match executor.execute_step(&step, memory, &call.id).await {
                Ok(result) => results.push(result),
                Err(e @ AiError::MissingArguments { .. }) => {
                    results.push(executor.skip_step(&step, &call.id, &e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(FallbackOutcome::Executed(results))
    }
}
