//! LLM module - chat completion client abstraction

mod client;
mod mock_client;
mod openai;

pub use client::{
    CompletionRequest, CompletionResponse, FinishReason, LlmClient, Message, ResponseFormat, Role,
    TokenUsage, ToolCall, ToolChoice,
};
pub use mock_client::{MockLlmClient, MockStep, MockStepKind};
pub use openai::{DEFAULT_OPENAI_BASE_URL, DEFAULT_OPENAI_MODEL, OpenAIClient, RetryPolicy};
