//! Flat list tools: items of one collection, optionally scoped by a parent id
//! (project or note session).

use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, Document, Filter, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory, document_id,
};
use serde_json::{Map, Value, json};

use super::shared::{clamped, human_fields, id_value};

/// Static description of a list tool.
pub struct ListSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub collection: Collection,
    /// Parent id argument, matched against the field of the same name.
    pub scope: Option<&'static str>,
    pub fields: &'static [&'static str],
    /// Key under `memory.lists` and in the output payload.
    pub list_key: &'static str,
    pub output_key: &'static str,
    /// `memory.ids` key set when exactly one item comes back.
    pub single_id: Option<&'static str>,
    pub project: fn(&Document) -> Value,
}

fn named(doc: &Document) -> Value {
    json!({ "id": id_value(doc), "name": clamped(doc, "name") })
}

fn titled(doc: &Document) -> Value {
    json!({ "id": id_value(doc), "title": clamped(doc, "title") })
}

fn line(doc: &Document) -> Value {
    json!({ "id": id_value(doc), "content": clamped(doc, "content") })
}

fn link(doc: &Document) -> Value {
    json!({
        "id": id_value(doc),
        "name": clamped(doc, "name"),
        "url": doc.get("url").filter(|u| u.as_str().is_some_and(|s| !s.is_empty())).cloned().unwrap_or(Value::Null),
    })
}

pub static NOTES_BY_PROJECT: ListSpec = ListSpec {
    name: "chat_notesByProject",
    description: "List note titles for a project. Use when the user asks about notes of a project.",
    collection: Collection::Notes,
    scope: Some("projectId"),
    fields: &["title"],
    list_key: "notes",
    output_key: "notes",
    single_id: Some("noteId"),
    project: titled,
};

pub static NOTE_SESSIONS_BY_PROJECT: ListSpec = ListSpec {
    name: "chat_noteSessionsByProject",
    description: "List note-taking sessions for a project.",
    collection: Collection::NoteSessions,
    scope: Some("projectId"),
    fields: &["name"],
    list_key: "noteSessions",
    output_key: "sessions",
    single_id: Some("sessionId"),
    project: named,
};

pub static NOTE_LINES_BY_SESSION: ListSpec = ListSpec {
    name: "chat_noteLinesBySession",
    description: "List the lines captured in a note session.",
    collection: Collection::NoteLines,
    scope: Some("sessionId"),
    fields: &["content"],
    list_key: "noteLines",
    output_key: "lines",
    single_id: None,
    project: line,
};

pub static LINKS_BY_PROJECT: ListSpec = ListSpec {
    name: "chat_linksByProject",
    description: "List saved links (name, url) for a project.",
    collection: Collection::Links,
    scope: Some("projectId"),
    fields: &["name", "url"],
    list_key: "links",
    output_key: "links",
    single_id: None,
    project: link,
};

pub static FILES_BY_PROJECT: ListSpec = ListSpec {
    name: "chat_filesByProject",
    description: "List files attached to a project.",
    collection: Collection::Files,
    scope: Some("projectId"),
    fields: &["name"],
    list_key: "files",
    output_key: "files",
    single_id: None,
    project: named,
};

pub static PEOPLE_LIST: ListSpec = ListSpec {
    name: "chat_peopleList",
    description: "List people in the directory.",
    collection: Collection::People,
    scope: None,
    fields: &["name"],
    list_key: "people",
    output_key: "people",
    single_id: None,
    project: named,
};

pub static TEAMS_LIST: ListSpec = ListSpec {
    name: "chat_teamsList",
    description: "List teams in the directory.",
    collection: Collection::Teams,
    scope: None,
    fields: &["name"],
    list_key: "teams",
    output_key: "teams",
    single_id: None,
    project: named,
};

pub struct ScopedListTool {
    store: Arc<dyn DataStore>,
    spec: &'static ListSpec,
}

impl ScopedListTool {
    pub fn new(store: Arc<dyn DataStore>, spec: &'static ListSpec) -> Self {
        Self { store, spec }
    }

    fn scope_value(&self, input: &Value) -> Option<String> {
        let key = self.spec.scope?;
        match input.get(key)? {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[async_trait]
impl Tool for ScopedListTool {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn description(&self) -> &str {
        self.spec.description
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        if let Some(scope) = self.spec.scope {
            properties.insert(scope.to_string(), json!({ "type": "string" }));
            required.push(json!(scope));
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn contract(&self) -> ToolContract {
        match self.spec.scope {
            Some(scope) => ToolContract::read_only(&[scope]),
            None => ToolContract::read_only(&[]),
        }
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let filter = match (self.spec.scope, self.scope_value(&input)) {
            (None, _) => Filter::All,
            (Some(scope), Some(id)) => Filter::eq(scope, id),
            (Some(scope), None) => return Ok(ToolOutput::error(format!("{scope} is required"))),
        };

        let query = Query::new(filter).with_fields(self.spec.fields);
        let docs = self.store.find(self.spec.collection, &query).await?;
        let items: Vec<Value> = docs.iter().map(self.spec.project).collect();

        if let (Some(key), [only]) = (self.spec.single_id, docs.as_slice()) {
            if let Some(id) = document_id(only) {
                memory.set_id(key, id);
            }
        }
        memory.set_list(self.spec.list_key, human_fields(&items));

        let mut payload = Map::new();
        payload.insert("total".to_string(), json!(items.len()));
        payload.insert(self.spec.output_key.to_string(), Value::Array(items));
        Ok(ToolOutput::success(Value::Object(payload)))
    }
}
