//! Error types shared by tools, stores and the registry.

use thiserror::Error;

/// Tool and store error types
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{0}' is not read-only and cannot be registered")]
    NotReadOnly(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Search backend error: {0}")]
    Search(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tool operations
pub type Result<T> = std::result::Result<T, ToolError>;

impl ToolError {
    /// Backend failures that may clear on another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, ToolError::Store(_) | ToolError::Search(_) | ToolError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_failures_are_transient() {
        assert!(ToolError::Store("connection reset".to_string()).is_transient());
        assert!(ToolError::Search("unavailable".to_string()).is_transient());
        assert!(!ToolError::InvalidInput("limit".to_string()).is_transient());
        assert!(!ToolError::NotFound("chat_x".to_string()).is_transient());
    }
}
