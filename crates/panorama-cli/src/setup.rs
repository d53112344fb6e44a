//! CLI setup module
//!
//! Builds the data store, semantic index, tool registry and agent from the
//! command line and the config file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use panorama_ai::{AgentConfig, ChatAgent, LlmClient, OpenAIClient, ResolverSet, StatusSink};
use panorama_storage::{OpenAIEmbedding, QdrantIndex, SnapshotStore, VectorConfig};
use panorama_tools::{DataStore, SemanticIndex, ToolRegistry, default_registry};

use crate::cli::Cli;
use crate::config::CliConfig;

const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

fn openai_api_key() -> Option<String> {
    std::env::var(OPENAI_API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Load the workspace snapshot. Without one every tool answers from an empty
/// workspace.
pub async fn prepare_store(cli: &Cli, config: &CliConfig) -> Result<Arc<dyn DataStore>> {
    let path: Option<PathBuf> = cli
        .snapshot
        .clone()
        .or_else(|| config.default.snapshot_path.clone());

    let Some(path) = path else {
        tracing::warn!("No snapshot configured, using an empty workspace");
        return Ok(Arc::new(SnapshotStore::new()));
    };

    let store = SnapshotStore::open(&path)
        .await
        .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), documents = store.len(), "Loaded snapshot");
    Ok(Arc::new(store))
}

/// Connect the Qdrant index when configured. Embeddings need the OpenAI key,
/// so without it search stays disabled.
pub fn prepare_index(config: &CliConfig) -> Result<Option<Arc<dyn SemanticIndex>>> {
    let Some(url) = config.search.qdrant_url.as_deref() else {
        return Ok(None);
    };
    let Some(api_key) = openai_api_key() else {
        tracing::warn!(url, "Qdrant configured without an embedding key, semantic search disabled");
        return Ok(None);
    };

    let mut embedder = OpenAIEmbedding::new(api_key, config.search.embedding_model.clone());
    if let Some(base_url) = &config.default.base_url {
        embedder = embedder.with_base_url(base_url.clone());
    }
    let mut vector = VectorConfig::new(url);
    if let Some(collection) = &config.search.collection {
        vector = vector.with_collection(collection.clone());
    }
    let index = QdrantIndex::connect(vector, Arc::new(embedder))?;
    Ok(Some(Arc::new(index)))
}

pub fn prepare_registry(
    store: Arc<dyn DataStore>,
    index: Option<Arc<dyn SemanticIndex>>,
) -> Result<Arc<ToolRegistry>> {
    let registry = default_registry(store, index).context("Failed to build tool registry")?;
    Ok(Arc::new(registry))
}

fn prepare_llm(cli: &Cli, config: &CliConfig) -> Option<Arc<dyn LlmClient>> {
    let api_key = openai_api_key()?;
    let mut client = OpenAIClient::new(api_key);
    if let Some(model) = cli.model.as_ref().or(config.default.model.as_ref()) {
        client = client.with_model(model.clone());
    }
    if let Some(base_url) = &config.default.base_url {
        client = client.with_base_url(base_url.clone());
    }
    Some(Arc::new(client))
}

/// Build the agent. It is created even without credentials; `ask` then
/// reports the missing key.
pub fn prepare_agent(
    cli: &Cli,
    config: &CliConfig,
    agent_config: AgentConfig,
    store: Arc<dyn DataStore>,
    registry: Arc<ToolRegistry>,
    status: Arc<dyn StatusSink>,
) -> ChatAgent {
    ChatAgent::new(prepare_llm(cli, config), registry)
        .with_resolvers(ResolverSet::for_store(store))
        .with_config(agent_config)
        .with_status(status)
}
