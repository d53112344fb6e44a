//! Request orchestration.
//!
//! One `ask` runs a sequential pipeline:
//!
//! ```text
//! Planning -> Executing -> [Replanning -> ExecutingRemaining] -> Synthesizing -> Done
//! ```
//!
//! A missing plan switches to single-shot tool calling. Every path shares one
//! step budget and one working memory, both dropped when the request ends.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;
use panorama_traits::{ToolRegistry, WorkingMemory};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AiError, Result};
use crate::llm::{LlmClient, Message, Role};

use super::citations::{Citation, build_citations};
use super::config::AgentConfig;
use super::fallback::{FallbackOutcome, SingleShot};
use super::plan::{Plan, PlanStep};
use super::planner::Planner;
use super::prompt::system_prompt;
use super::replanner::Replanner;
use super::resolver::ResolverSet;
use super::status::{NullStatus, StatusEvent, StatusSink};
use super::step_executor::{StepExecutor, StepResult};
use super::stop::should_stop;
use super::synthesizer::{Synthesizer, UNAVAILABLE_ANSWER};

/// Final answer of one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
    /// Set when an LLM call failed and `text` is a stock message.
    #[serde(default)]
    pub degraded: bool,
}

impl Answer {
    fn unavailable() -> Self {
        Self {
            text: UNAVAILABLE_ANSWER.to_string(),
            citations: Vec::new(),
            degraded: true,
        }
    }
}

#[derive(Debug)]
enum State {
    Executing,
    Replanning { step: PlanStep, error: AiError },
    ExecutingRemaining,
    Done,
}

/// Outcome of running a plan against working memory.
#[derive(Debug, Default)]
pub struct PlanRun {
    pub results: Vec<StepResult>,
    /// Steps that consumed budget, skipped ones included.
    pub steps_run: usize,
    pub replanned: bool,
    /// Stop-when artifacts were satisfied before the plan ran out.
    pub stopped_early: bool,
}

impl PlanRun {
    /// Steps that actually reached a tool.
    pub fn invocations(&self) -> usize {
        self.results.iter().filter(|r| !r.skipped).count()
    }
}

/// Keep the last `max` user/assistant turns; tool turns never carry over.
pub fn trim_history(history: &[Message], max: usize) -> Vec<Message> {
    let kept: Vec<&Message> = history
        .iter()
        .filter(|m| matches!(m.role, Role::User | Role::Assistant) && m.tool_calls.is_none())
        .filter(|m| !m.content.trim().is_empty())
        .collect();
    let start = kept.len().saturating_sub(max);
    kept[start..].iter().map(|m| (*m).clone()).collect()
}

fn next_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Question-answering agent over a read-only tool registry.
pub struct ChatAgent {
    llm: Option<Arc<dyn LlmClient>>,
    registry: Arc<ToolRegistry>,
    resolvers: ResolverSet,
    config: AgentConfig,
    status: Arc<dyn StatusSink>,
}

impl ChatAgent {
    /// `llm` is `None` when no credentials are configured; every `ask` then
    /// fails with [`AiError::NotConfigured`].
    pub fn new(llm: Option<Arc<dyn LlmClient>>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            registry,
            resolvers: ResolverSet::new(),
            config: AgentConfig::default(),
            status: Arc::new(NullStatus),
        }
    }

    pub fn with_resolvers(mut self, resolvers: ResolverSet) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn llm(&self) -> Result<&dyn LlmClient> {
        self.llm.as_deref().ok_or(AiError::NotConfigured)
    }

    fn system_prompt(&self) -> String {
        self.config
            .system_prompt
            .clone()
            .unwrap_or_else(|| system_prompt(Local::now(), self.config.locale.as_deref()))
    }

    /// Answer `query` given the prior conversation.
    pub async fn ask(&self, query: &str, history: &[Message]) -> Result<Answer> {
        self.ask_with_cancel(query, history, CancellationToken::new())
            .await
    }

    /// Like [`ask`](Self::ask), observing `cancel`. Cancellation and LLM
    /// failures degrade the answer; only a missing LLM and an empty query are
    /// errors.
    pub async fn ask_with_cancel(
        &self,
        query: &str,
        history: &[Message],
        cancel: CancellationToken,
    ) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AiError::EmptyQuery);
        }
        let llm = self.llm()?;

        let mut memory = WorkingMemory::new();
        match self.answer(llm, query, history, &mut memory, &cancel).await {
            Ok(answer) => Ok(answer),
            Err(AiError::Cancelled) => {
                tracing::info!("Request cancelled");
                Ok(Answer::unavailable())
            }
            Err(e) => Err(e),
        }
    }

    async fn answer(
        &self,
        llm: &dyn LlmClient,
        query: &str,
        history: &[Message],
        memory: &mut WorkingMemory,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let system = self.system_prompt();
        let history = trim_history(history, self.config.max_history_messages);
        let tool_names = self.registry.list();

        self.status.emit(StatusEvent::Thinking);
        let planner = Planner::new(llm, &self.config, cancel);
        let results = match planner.plan(&system, query, &tool_names).await {
            Some(plan) if !plan.is_empty() => {
                self.status.emit(StatusEvent::Planned { steps: plan.len() });
                let run = self
                    .execute_plan(&planner, &system, query, plan, memory, cancel)
                    .await?;
                run.results
            }
            _ => {
                tracing::info!("No usable plan, falling back to single-shot tool calling");
                let executor = self.executor(cancel);
                let single_shot = SingleShot::new(llm, &self.registry, &self.config, cancel);
                match single_shot
                    .run(&system, query, &history, &executor, memory)
                    .await
                {
                    Ok(FallbackOutcome::Answered(text)) => {
                        return Ok(Answer {
                            text,
                            citations: build_citations(memory),
                            degraded: false,
                        });
                    }
                    Ok(FallbackOutcome::Executed(results)) => results,
                    Err(AiError::Cancelled) => return Err(AiError::Cancelled),
                    Err(e) => {
                        tracing::warn!(error = %e, "Single-shot tool calling failed");
                        return Ok(Answer::unavailable());
                    }
                }
            }
        };

        self.status.emit(StatusEvent::Synthesizing);
        let synthesis = Synthesizer::new(llm, &self.config, cancel)
            .synthesize(&system, query, &history, &results)
            .await?;
        let citations = if synthesis.degraded {
            Vec::new()
        } else {
            build_citations(memory)
        };
        Ok(Answer {
            text: synthesis.text,
            citations,
            degraded: synthesis.degraded,
        })
    }

    fn executor<'a>(&'a self, cancel: &'a CancellationToken) -> StepExecutor<'a> {
        StepExecutor::new(
            &self.registry,
            &self.resolvers,
            &self.config,
            self.status.as_ref(),
            cancel,
        )
    }

    /// Run `plan` against `memory` under the step budget, re-planning once
    /// when a step cannot resolve its required arguments.
    pub async fn run_plan(
        &self,
        query: &str,
        plan: Plan,
        memory: &mut WorkingMemory,
        cancel: &CancellationToken,
    ) -> Result<PlanRun> {
        let llm = self.llm()?;
        let system = self.system_prompt();
        let planner = Planner::new(llm, &self.config, cancel);
        self.execute_plan(&planner, &system, query, plan, memory, cancel)
            .await
    }

    async fn execute_plan(
        &self,
        planner: &Planner<'_>,
        system: &str,
        query: &str,
        plan: Plan,
        memory: &mut WorkingMemory,
        cancel: &CancellationToken,
    ) -> Result<PlanRun> {
        let tool_names = self.registry.list();
        let replanner = Replanner::new(planner, system, &tool_names);
        let executor = self.executor(cancel);
        let budget = self.config.max_steps;

        let mut queue: VecDeque<PlanStep> = plan.steps.into();
        let mut stop_when = plan.stop_when;
        let mut run = PlanRun::default();
        let mut state = State::Executing;

        loop {
            state = match state {
                State::Executing | State::ExecutingRemaining => {
                    let first_pass = matches!(state, State::Executing);
                    let resume = if first_pass {
                        State::Executing
                    } else {
                        State::ExecutingRemaining
                    };
                    if should_stop(&stop_when, memory) {
                        tracing::info!(steps_run = run.steps_run, "Stop condition satisfied");
                        run.stopped_early = true;
                        State::Done
                    } else if run.steps_run >= budget {
                        if !queue.is_empty() {
                            tracing::warn!(dropped = queue.len(), budget, "Step budget exhausted");
                        }
                        State::Done
                    } else if let Some(step) = queue.pop_front() {
                        run.steps_run += 1;
                        let call_id = next_call_id();
                        match executor.execute_step(&step, memory, &call_id).await {
                            Ok(result) => {
                                run.results.push(result);
                                resume
                            }
                            Err(error @ AiError::MissingArguments { .. }) if first_pass => {
                                State::Replanning { step, error }
                            }
                            Err(error @ AiError::MissingArguments { .. }) => {
                                run.results
                                    .push(executor.skip_step(&step, &call_id, &error.to_string()));
                                resume
                            }
                            Err(e) => return Err(e),
                        }
                    } else {
                        State::Done
                    }
                }
                State::Replanning { step, error } => {
                    self.status.emit(StatusEvent::Replanning);
                    run.replanned = true;
                    let remaining = budget.saturating_sub(run.steps_run);
                    let message = error.to_string();
                    let replacement = replanner
                        .replan(query, memory, &step.tool, &message, remaining)
                        .await;
                    if cancel.is_cancelled() {
                        return Err(AiError::Cancelled);
                    }

                    // The failed step never reached its tool.
                    run.results
                        .push(executor.skip_step(&step, &next_call_id(), &message));
                    match replacement {
                        Some(plan) => {
                            queue = plan.steps.into();
                            stop_when = plan.stop_when;
                        }
                        None => {
                            tracing::info!("No replacement plan, continuing with remaining steps");
                        }
                    }
                    State::ExecutingRemaining
                }
                State::Done => break,
            };
        }

        tracing::info!(
            steps_run = run.steps_run,
            invocations = run.invocations(),
            replanned = run.replanned,
            "Plan finished"
        );
        Ok(run)
    }
}
