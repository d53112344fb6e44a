//! Qdrant-backed semantic index.
//!
//! Points are written by the indexing side of the workspace with a payload of
//! `{ kind, docId }`, where `docId` is `"<kind>:<id>"`. This module only reads.

use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{SearchHit, SemanticIndex, ToolError, ToolResult};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::SearchPointsBuilder;
use tracing::{debug, info};

use crate::embedding::EmbeddingProvider;

pub const DEFAULT_COLLECTION: &str = "panorama";

#[derive(Debug, Clone)]
pub struct VectorConfig {
    pub url: String,
    pub collection: String,
}

impl VectorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            collection: DEFAULT_COLLECTION.to_string(),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }
}

pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl QdrantIndex {
    pub fn connect(config: VectorConfig, embedder: Arc<dyn EmbeddingProvider>) -> ToolResult<Self> {
        let client = Qdrant::from_url(&config.url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| ToolError::Search(format!("failed to build Qdrant client: {e}")))?;
        info!(url = %config.url, collection = %config.collection, "Using Qdrant semantic index");
        Ok(Self {
            client,
            collection: config.collection,
            embedder,
        })
    }
}

#[async_trait]
impl SemanticIndex for QdrantIndex {
    async fn search(&self, query: &str, limit: usize) -> ToolResult<Vec<SearchHit>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ToolError::Search(format!("embedding failed: {e}")))?;

        let request =
            SearchPointsBuilder::new(self.collection.as_str(), vector, limit as u64).with_payload(true);
        let response = self
            .client
            .search_points(request)
            .await
            .map_err(|e| ToolError::Search(e.to_string()))?;

        let hits: Vec<SearchHit> = response
            .result
            .into_iter()
            .filter_map(|point| {
                let kind = point.payload.get("kind")?.as_str()?.to_string();
                let doc_id = point.payload.get("docId")?.as_str()?.to_string();
                Some(SearchHit {
                    kind,
                    doc_id,
                    score: point.score,
                })
            })
            .collect();
        debug!(hits = hits.len(), "Semantic search completed");
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_config_defaults() {
        let config = VectorConfig::new("http://localhost:6334").with_collection("ws");
        assert_eq!(config.collection, "ws");
        assert_eq!(VectorConfig::new("x").collection, DEFAULT_COLLECTION);
    }
}
