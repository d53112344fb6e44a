use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::shared::{clamp_limit, human_fields};
use crate::selectors::{compile_sort, compile_where, field_allowlist, is_allowed_field};

const DEFAULT_DOCS: usize = 50;
const MAX_DOCS: usize = 200;

#[derive(Debug, Deserialize)]
struct CollectionQueryInput {
    collection: Option<String>,
    #[serde(rename = "where")]
    where_: Option<Value>,
    select: Option<Vec<String>>,
    sort: Option<Map<String, Value>>,
    limit: Option<Value>,
}

/// Generic read-only query with an allow-listed where-DSL.
pub struct CollectionQueryTool {
    store: Arc<dyn DataStore>,
}

impl CollectionQueryTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CollectionQueryTool {
    fn name(&self) -> &str {
        "chat_collectionQuery"
    }

    fn description(&self) -> &str {
        "Generic read-only query across collections with a validated where DSL. Use to filter \
         items by fields. where supports { field: value }, { field: { eq, ne, lt, lte, gt, gte, \
         in, nin } } and { and: [...] } / { or: [...] }."
    }

    fn parameters_schema(&self) -> Value {
        let collections: Vec<&str> = Collection::ALL.iter().map(|c| c.as_str()).collect();
        json!({
            "type": "object",
            "properties": {
                "collection": { "type": "string", "enum": collections },
                "where": { "type": "object" },
                "select": { "type": "array", "items": { "type": "string" } },
                "limit": { "type": "number", "description": "Max documents (default 50, max 200)" },
                "sort": { "type": "object", "description": "{ field: 1 | -1 }" }
            },
            "required": ["collection"]
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&["collection"])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: CollectionQueryInput = match serde_json::from_value(input) {
            Ok(p) => p,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid input: {}", e))),
        };
        let collection = match params.collection.unwrap_or_default().parse::<Collection>() {
            Ok(c) => c,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let filter = params
            .where_
            .as_ref()
            .map(|w| compile_where(collection, w))
            .unwrap_or_default();
        let mut query = Query::new(filter).with_limit(clamp_limit(
            params.limit.as_ref(),
            DEFAULT_DOCS,
            MAX_DOCS,
        ));
        for (field, descending) in compile_sort(collection, &params.sort.unwrap_or_default()) {
            query = query.sort_by(field, descending);
        }

        let select: Vec<&str> = params
            .select
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|f| is_allowed_field(collection, f))
            .collect();
        let fields = if select.is_empty() {
            field_allowlist(collection)
        } else {
            select.as_slice()
        };
        query = query.with_fields(fields);

        let docs = self.store.find(collection, &query).await?;
        let items: Vec<Value> = docs.into_iter().map(Value::Object).collect();
        let key = collection.as_str();
        memory.set_list(key, human_fields(&items));

        tracing::debug!(collection = %collection, total = items.len(), "Collection query");
        let mut payload = Map::new();
        payload.insert("total".to_string(), json!(items.len()));
        payload.insert(key.to_string(), Value::Array(items));
        Ok(ToolOutput::success(Value::Object(payload)))
    }
}
