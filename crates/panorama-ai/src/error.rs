//! Error types for the agent crate

use panorama_traits::ToolError;
use thiserror::Error;

/// Agent error types
#[derive(Error, Debug)]
pub enum AiError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("{provider} API error ({status}): {message}")]
    LlmHttp {
        provider: String,
        status: u16,
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Missing required arguments for {tool}: {}", missing.join(", "))]
    MissingArguments { tool: String, missing: Vec<String> },

    #[error("No LLM credentials configured")]
    NotConfigured,

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AiError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiError::LlmHttp { status, .. } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            AiError::Http(e) => e.is_timeout() || e.is_connect(),
            AiError::Llm(message) => {
                let lower = message.to_lowercase();
                ["rate limit", "timeout", "timed out", "overloaded"]
                    .iter()
                    .any(|needle| lower.contains(needle))
            }
            AiError::Timeout(_) => true,
            _ => false,
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            AiError::LlmHttp {
                retry_after_secs, ..
            } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AiError>;
