use tokio_util::sync::CancellationToken;

use crate::error::{AiError, Result};
use crate::llm::{CompletionRequest, CompletionResponse, LlmClient};

use super::config::AgentConfig;

/// One LLM call bounded by the configured timeout and the request's
/// cancellation token.
pub(crate) async fn complete_bounded(
    llm: &dyn LlmClient,
    request: CompletionRequest,
    config: &AgentConfig,
    cancel: &CancellationToken,
) -> Result<CompletionResponse> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AiError::Cancelled),
        outcome = tokio::time::timeout(config.llm_timeout, llm.complete(request)) => {
            outcome.map_err(|_| AiError::Timeout(config.llm_timeout.as_secs()))?
        }
    }
}
