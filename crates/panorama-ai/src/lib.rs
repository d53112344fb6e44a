//! Panorama Ask - planned, read-only question answering.
//!
//! This crate provides:
//! - [`ChatAgent`], which plans a bounded sequence of read-only tool calls,
//!   executes it against request-scoped working memory and synthesizes a
//!   grounded answer with citations
//! - The LLM client abstraction with an OpenAI-compatible provider and a
//!   scripted mock for tests

pub mod agent;
pub mod error;
mod http_client;
pub mod llm;

pub use agent::{
    AgentConfig, Answer, ArgResolver, ChannelStatus, ChatAgent, Citation, NullStatus, Plan,
    PlanStep, ProjectIdResolver, ResolverSet, StatusEvent, StatusSink, StepResult,
};
pub use error::{AiError, Result};
pub use llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, MockLlmClient,
    MockStep, OpenAIClient, RetryPolicy, Role, ToolCall, ToolChoice,
};
