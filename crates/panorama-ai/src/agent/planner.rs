//! Planner: one schema-constrained LLM call turning the question into a
//! bounded plan.

use tokio_util::sync::CancellationToken;

use crate::llm::{CompletionRequest, LlmClient, Message};

use super::call::complete_bounded;
use super::config::AgentConfig;
use super::plan::{Plan, plan_schema};
use super::prompt::planner_system;

pub struct Planner<'a> {
    llm: &'a dyn LlmClient,
    config: &'a AgentConfig,
    cancel: &'a CancellationToken,
}

impl<'a> Planner<'a> {
    pub fn new(llm: &'a dyn LlmClient, config: &'a AgentConfig, cancel: &'a CancellationToken) -> Self {
        Self { llm, config, cancel }
    }

    /// Plan the tool calls for `query`.
    ///
    /// Transport failures, timeouts and unparseable answers all yield `None`;
    /// the caller then falls back to single-shot tool calling.
    pub async fn plan(&self, system: &str, query: &str, tool_names: &[&str]) -> Option<Plan> {
        let mut plan = self.request_plan(system, query, tool_names).await?;
        plan.truncate(self.config.max_steps);
        tracing::info!(
            steps = plan.len(),
            stop_when = ?plan.stop_when,
            "Plan ready"
        );
        Some(plan)
    }

    pub(crate) async fn request_plan(
        &self,
        system: &str,
        user: &str,
        tool_names: &[&str],
    ) -> Option<Plan> {
        let request = CompletionRequest::new(vec![
            Message::system(planner_system(system, tool_names)),
            Message::user(user),
        ])
        .with_json_schema("plan", plan_schema(tool_names))
        .with_temperature(self.config.temperature);

        let response = match complete_bounded(self.llm, request, self.config, self.cancel).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Planner call failed");
                return None;
            }
        };

        let text = response.content.unwrap_or_default();
        let plan = Plan::parse(&text);
        if plan.is_none() {
            tracing::warn!(answer_len = text.len(), "Planner answer is not a valid plan");
        }
        plan
    }
}
