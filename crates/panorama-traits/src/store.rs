//! Read-only storage interfaces consumed by the data tools.
//!
//! Implementations are provided by downstream crates (e.g. `panorama-storage`).

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ToolError};
use crate::filter::{Document, Filter, sort_order};

/// Field holding a document's identifier.
pub const ID_FIELD: &str = "_id";

// ── Collections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Tasks,
    Projects,
    Notes,
    NoteSessions,
    NoteLines,
    Links,
    People,
    Teams,
    Files,
    Alarms,
    UserLogs,
}

impl Collection {
    pub const ALL: [Collection; 11] = [
        Collection::Tasks,
        Collection::Projects,
        Collection::Notes,
        Collection::NoteSessions,
        Collection::NoteLines,
        Collection::Links,
        Collection::People,
        Collection::Teams,
        Collection::Files,
        Collection::Alarms,
        Collection::UserLogs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Projects => "projects",
            Collection::Notes => "notes",
            Collection::NoteSessions => "noteSessions",
            Collection::NoteLines => "noteLines",
            Collection::Links => "links",
            Collection::People => "people",
            Collection::Teams => "teams",
            Collection::Files => "files",
            Collection::Alarms => "alarms",
            Collection::UserLogs => "userLogs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Collection::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ToolError::InvalidInput(format!("Unsupported collection: {s}")))
    }
}

// ── Query ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Vec<SortKey>,
    pub limit: Option<usize>,
    /// Projection; `_id` is always kept.
    pub fields: Option<Vec<String>>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.sort.push(SortKey {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// Evaluate the query against documents held in memory.
    pub fn apply<'a>(&self, docs: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .cloned()
            .collect();

        if !self.sort.is_empty() {
            matched.sort_by(|a, b| {
                self.sort
                    .iter()
                    .map(|key| {
                        let ord = match (a.get(&key.field), b.get(&key.field)) {
                            (Some(x), Some(y)) => sort_order(x, y),
                            (Some(_), None) => Ordering::Less,
                            (None, Some(_)) => Ordering::Greater,
                            (None, None) => Ordering::Equal,
                        };
                        if key.descending { ord.reverse() } else { ord }
                    })
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }

        if let Some(fields) = &self.fields {
            for doc in &mut matched {
                doc.retain(|key, _| key == ID_FIELD || fields.iter().any(|f| f == key));
            }
        }

        matched
    }
}

// ── DataStore ────────────────────────────────────────────────────────

/// Read-only access to the personal data store.
#[async_trait]
pub trait DataStore: Send + Sync {
    async fn find(&self, collection: Collection, query: &Query) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: Collection, query: &Query) -> Result<Option<Document>> {
        let query = query.clone().with_limit(1);
        Ok(self.find(collection, &query).await?.into_iter().next())
    }

    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>> {
        self.find_one(collection, &Query::new(Filter::eq(ID_FIELD, id)))
            .await
    }
}

/// Read a document's id as a string.
pub fn document_id(doc: &Document) -> Option<String> {
    match doc.get(ID_FIELD)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ── SemanticIndex ────────────────────────────────────────────────────

/// A hit returned by the vector backend, before preview resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub kind: String,
    pub doc_id: String,
    pub score: f32,
}

/// Opaque read-only semantic search backend.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn docs() -> Vec<Document> {
        vec![
            json!({"_id": "t1", "title": "B", "deadline": "2026-10-20", "status": "todo"}),
            json!({"_id": "t2", "title": "A", "deadline": "2026-10-18", "status": "done"}),
            json!({"_id": "t3", "title": "C", "status": "doing"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn apply_filters_sorts_limits_and_projects() {
        let query = Query::new(Filter::ne("status", "done"))
            .sort_by("deadline", false)
            .with_limit(5)
            .with_fields(&["title"]);
        let docs = docs();
        let result = query.apply(&docs);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0]["_id"], json!("t1"));
        assert_eq!(result[1]["_id"], json!("t3"));
        assert!(result[0].get("deadline").is_none());
    }

    #[test]
    fn sort_orders_mixed_deadline_formats_chronologically() {
        let docs: Vec<Document> = vec![
            json!({"_id": "late", "deadline": "2026-10-18T00:00:00Z"}),
            json!({"_id": "millis", "deadline": 1_759_968_000_000_i64}),
            json!({"_id": "offset", "deadline": "2026-10-17T23:59:59+02:00"}),
            json!({"_id": "text", "deadline": "someday"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();
        let result = Query::new(Filter::All).sort_by("deadline", false).apply(&docs);
        let ids: Vec<_> = result.iter().map(|d| d["_id"].clone()).collect();
        assert_eq!(ids, vec![json!("millis"), json!("offset"), json!("late"), json!("text")]);
    }

    #[test]
    fn collection_round_trips_names() {
        for collection in Collection::ALL {
            assert_eq!(collection.as_str().parse::<Collection>().unwrap(), collection);
        }
        assert!("secrets".parse::<Collection>().is_err());
    }
}
