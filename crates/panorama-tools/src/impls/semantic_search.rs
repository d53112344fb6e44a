//! `chat_semanticSearch`: vector search over workspace items, hits resolved to
//! titles and urls through the data store.

use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, SearchHit, SemanticIndex, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{clamp_limit, non_empty, parse_input, text};

const DEFAULT_RESULTS: usize = 8;
const MAX_RESULTS: usize = 50;

#[derive(Debug, Deserialize)]
struct SemanticSearchInput {
    query: Option<String>,
    limit: Option<Value>,
}

struct Preview {
    title: String,
    url: Option<String>,
}

pub struct SemanticSearchTool {
    store: Arc<dyn DataStore>,
    index: Option<Arc<dyn SemanticIndex>>,
}

impl SemanticSearchTool {
    /// `index` is `None` when no vector backend is configured; the tool then
    /// answers with an empty, `disabled` result set.
    pub fn new(store: Arc<dyn DataStore>, index: Option<Arc<dyn SemanticIndex>>) -> Self {
        Self { store, index }
    }

    async fn preview(&self, hit: &SearchHit) -> ToolResult<Preview> {
        let id = hit.doc_id.rsplit(':').next().unwrap_or(&hit.doc_id);
        let (collection, title_field, fallback) = match hit.kind.as_str() {
            "project" => (Collection::Projects, "name", "(project)"),
            "task" => (Collection::Tasks, "title", "(task)"),
            "note" => (Collection::Notes, "title", "(note)"),
            "session" => (Collection::NoteSessions, "name", "(session)"),
            "line" => (Collection::NoteLines, "", "(line)"),
            "alarm" => (Collection::Alarms, "title", "(alarm)"),
            "link" => (Collection::Links, "name", "(link)"),
            _ => {
                return Ok(Preview {
                    title: "(doc)".to_string(),
                    url: None,
                });
            }
        };

        let doc = self.store.find_by_id(collection, id).await?;
        let title = doc
            .as_ref()
            .filter(|_| !title_field.is_empty())
            .map(|d| text(d, title_field))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        let url = doc
            .as_ref()
            .map(|d| text(d, "url"))
            .filter(|u| !u.is_empty());
        Ok(Preview { title, url })
    }
}

#[async_trait]
impl Tool for SemanticSearchTool {
    fn name(&self) -> &str {
        "chat_semanticSearch"
    }

    fn description(&self) -> &str {
        "Semantic search over workspace items (projects, tasks, notes, links). Returns top \
         matches with titles and optional URLs."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "User query for semantic retrieval" },
                "limit": { "type": "number", "description": "Max results (default 8)" }
            },
            "required": ["query"]
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&["query"])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: SemanticSearchInput = match parse_input(
            input,
            "Required fields: query (string), optional: limit (number, max 50).",
        ) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };

        let Some(index) = &self.index else {
            memory.set_list("searchResults", Vec::new());
            return Ok(ToolOutput::success(json!({
                "results": [],
                "total": 0,
                "disabled": true,
            })));
        };

        let Some(query) = non_empty(params.query) else {
            return Ok(ToolOutput::error("query is required"));
        };
        let limit = clamp_limit(params.limit.as_ref(), DEFAULT_RESULTS, MAX_RESULTS);

        let hits = index.search(&query, limit).await?;
        let mut results = Vec::with_capacity(hits.len());
        for hit in &hits {
            let preview = self.preview(hit).await?;
            results.push(json!({
                "kind": hit.kind,
                "id": hit.doc_id,
                "title": preview.title,
                "url": preview.url,
                "score": hit.score,
            }));
        }
        tracing::debug!(query = %query, hits = results.len(), "Semantic search resolved");

        memory.set_list("searchResults", results.clone());
        Ok(ToolOutput::success(json!({
            "results": results,
            "total": results.len(),
        })))
    }
}
