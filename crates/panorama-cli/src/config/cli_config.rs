//! CLI configuration file support
//!
//! Loads configuration from ~/.config/panorama/config.toml

use std::path::PathBuf;
use std::time::Duration;

use panorama_ai::AgentConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default settings
    #[serde(default)]
    pub default: DefaultConfig,
    /// API key settings
    #[serde(default)]
    pub api_keys: ApiKeysConfig,
    /// Semantic search backend
    #[serde(default)]
    pub search: SearchConfig,
    /// Request limits and timeouts
    #[serde(default)]
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Workspace snapshot used when `--snapshot` is not given
    pub snapshot_path: Option<PathBuf>,
    /// Default chat model
    pub model: Option<String>,
    /// OpenAI-compatible endpoint
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    /// OpenAI API key
    pub openai: Option<String>,
}

/// Qdrant settings. Semantic search stays disabled without `qdrant_url`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    pub qdrant_url: Option<String>,
    pub collection: Option<String>,
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    pub max_steps: Option<usize>,
    pub tool_retries: Option<u32>,
    pub llm_timeout_secs: Option<u64>,
    pub tool_timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub locale: Option<String>,
}

impl AgentSettings {
    /// Overlay the configured values on the agent defaults.
    pub fn to_agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new();
        if let Some(steps) = self.max_steps {
            config = config.with_max_steps(steps);
        }
        if let Some(retries) = self.tool_retries {
            config = config.with_tool_retries(retries);
        }
        if let Some(secs) = self.llm_timeout_secs {
            config = config.with_llm_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = self.tool_timeout_secs {
            config = config.with_tool_timeout(Duration::from_secs(secs));
        }
        if let Some(temperature) = self.temperature {
            config = config.with_temperature(temperature);
        }
        if let Some(locale) = &self.locale {
            config = config.with_locale(locale.clone());
        }
        config
    }
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("panorama").join("config.toml"))
    }

    /// Apply API keys to environment variables
    ///
    /// # Safety
    /// This modifies environment variables which can cause issues in multi-threaded contexts.
    /// Should only be called early in main() before spawning threads.
    pub fn apply_api_key_env(&self) {
        if let Some(key) = &self.api_keys.openai
            && std::env::var("OPENAI_API_KEY").is_err()
        {
            // SAFETY: Called early in main() before spawning threads
            unsafe { std::env::set_var("OPENAI_API_KEY", key) };
        }
    }
}
