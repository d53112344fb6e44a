use std::time::Duration;

/// Hard cap on tool-bearing steps per request, re-planning included.
pub const MAX_PLAN_STEPS: usize = 5;

pub const DEFAULT_TOOL_RETRIES: u32 = 3;

pub const DEFAULT_MAX_HISTORY_MESSAGES: usize = 40;

/// Configuration for one question-answering agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Step budget for the whole request (at most [`MAX_PLAN_STEPS`]).
    pub max_steps: usize,
    /// Attempts per tool invocation before the step records an error payload.
    pub tool_retries: u32,
    /// Base delay of the exponential backoff between tool attempts.
    pub backoff_base: Duration,
    /// Timeout for each LLM call (planner, re-planner, synthesizer, fallback).
    pub llm_timeout: Duration,
    /// Timeout for each tool attempt.
    pub tool_timeout: Duration,
    /// Prior conversation messages kept for synthesis.
    pub max_history_messages: usize,
    pub temperature: Option<f32>,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
    /// Language hint appended to the system prompt, e.g. `fr`.
    pub locale: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: MAX_PLAN_STEPS,
            tool_retries: DEFAULT_TOOL_RETRIES,
            backoff_base: Duration::from_secs(1),
            llm_timeout: Duration::from_secs(30),
            tool_timeout: Duration::from_secs(30),
            max_history_messages: DEFAULT_MAX_HISTORY_MESSAGES,
            temperature: None,
            system_prompt: None,
            locale: None,
        }
    }
}

impl AgentConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the step budget; values above [`MAX_PLAN_STEPS`] are clamped.
    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps.clamp(1, MAX_PLAN_STEPS);
        self
    }

    pub fn with_tool_retries(mut self, retries: u32) -> Self {
        self.tool_retries = retries.max(1);
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_max_history_messages(mut self, max: usize) -> Self {
        self.max_history_messages = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set custom system prompt
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    /// Delay before retry number `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn tool_backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base.saturating_mul(factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_steps_clamped() {
        assert_eq!(AgentConfig::new().with_max_steps(12).max_steps, MAX_PLAN_STEPS);
        assert_eq!(AgentConfig::new().with_max_steps(0).max_steps, 1);
        assert_eq!(AgentConfig::new().with_max_steps(3).max_steps, 3);
    }

    #[test]
    fn test_tool_backoff_doubles() {
        let config = AgentConfig::new();
        assert_eq!(config.tool_backoff(1), Duration::from_secs(1));
        assert_eq!(config.tool_backoff(2), Duration::from_secs(2));
        assert_eq!(config.tool_backoff(3), Duration::from_secs(4));
    }
}
