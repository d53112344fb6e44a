//! In-memory `DataStore` backed by a JSON snapshot of the workspace.
//!
//! The snapshot file is a single object keyed by collection name:
//!
//! ```json
//! { "projects": [{ "_id": "p1", "name": "Website Redesign" }], "tasks": [] }
//! ```
//!
//! Unknown keys are ignored with a warning; documents without an `_id` are
//! dropped because tools could not chain on them.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use panorama_traits::{Collection, DataStore, Document, Query, ToolError, ToolResult, document_id};
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    collections: HashMap<Collection, Vec<Document>>,
}

impl SnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a snapshot file from disk.
    pub async fn open(path: impl AsRef<Path>) -> ToolResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let value: Value = serde_json::from_str(&raw)?;
        let store = Self::from_value(value)?;
        debug!(
            path = %path.display(),
            documents = store.len(),
            "Loaded data snapshot"
        );
        Ok(store)
    }

    /// Build a store from an already-parsed snapshot object.
    pub fn from_value(value: Value) -> ToolResult<Self> {
        let Value::Object(map) = value else {
            return Err(ToolError::Store(
                "snapshot root must be an object keyed by collection".to_string(),
            ));
        };

        let mut store = Self::new();
        for (key, docs) in map {
            let collection = match key.parse::<Collection>() {
                Ok(collection) => collection,
                Err(_) => {
                    warn!(collection = %key, "Ignoring unknown collection in snapshot");
                    continue;
                }
            };
            let Value::Array(items) = docs else {
                return Err(ToolError::Store(format!(
                    "collection '{key}' must be an array of documents"
                )));
            };
            let docs = items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(doc) if document_id(&doc).is_some() => Some(doc),
                    _ => None,
                })
                .collect();
            store.insert_all(collection, docs);
        }
        Ok(store)
    }

    /// Builder-style helper used when seeding fixtures.
    pub fn with_documents(mut self, collection: Collection, docs: Vec<Value>) -> Self {
        let docs = docs
            .into_iter()
            .filter_map(|v| match v {
                Value::Object(doc) => Some(doc),
                _ => None,
            })
            .collect();
        self.insert_all(collection, docs);
        self
    }

    fn insert_all(&mut self, collection: Collection, docs: Vec<Document>) {
        self.collections.entry(collection).or_default().extend(docs);
    }

    /// Total number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, collection: Collection) -> usize {
        self.collections.get(&collection).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DataStore for SnapshotStore {
    async fn find(&self, collection: Collection, query: &Query) -> ToolResult<Vec<Document>> {
        let Some(docs) = self.collections.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(query.apply(docs))
    }
}

#[cfg(test)]
mod tests {
    use panorama_traits::Filter;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_open_snapshot_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(
            &path,
            json!({
                "projects": [{"_id": "p1", "name": "Website Redesign"}],
                "tasks": [
                    {"_id": "t1", "title": "Ship", "projectId": "p1"},
                    {"title": "no id"}
                ],
                "invoices": [{"_id": "i1"}]
            })
            .to_string(),
        )
        .unwrap();

        let store = SnapshotStore::open(&path).await.unwrap();
        assert_eq!(store.count(Collection::Projects), 1);
        assert_eq!(store.count(Collection::Tasks), 1);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let store = SnapshotStore::new().with_documents(
            Collection::Notes,
            vec![
                json!({"_id": "n1", "title": "Kickoff"}),
                json!({"_id": "n2", "title": "Retro"}),
            ],
        );

        let note = store.find_by_id(Collection::Notes, "n2").await.unwrap();
        assert_eq!(note.unwrap()["title"], json!("Retro"));
        assert!(
            store
                .find_by_id(Collection::Notes, "missing")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty() {
        let store = SnapshotStore::new();
        let docs = store
            .find(Collection::Alarms, &Query::new(Filter::All))
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_rejects_non_object_root() {
        let err = SnapshotStore::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, ToolError::Store(_)));
    }
}
