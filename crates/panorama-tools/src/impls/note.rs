use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, Tool, ToolContract, ToolOutput, ToolResult, WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{field_or_null, id_value, non_empty, parse_input, text};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteByIdInput {
    note_id: Option<String>,
}

/// Full content of a single note.
pub struct NoteByIdTool {
    store: Arc<dyn DataStore>,
}

impl NoteByIdTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for NoteByIdTool {
    fn name(&self) -> &str {
        "chat_noteById"
    }

    fn description(&self) -> &str {
        "Fetch one note with its full content. Use after chat_notesByProject or a search hit \
         when the user wants what a note says."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "noteId": { "type": "string" }
            },
            "required": ["noteId"]
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&["noteId"])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: NoteByIdInput = match parse_input(input, "Required fields: noteId (string).") {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let Some(note_id) = non_empty(params.note_id) else {
            return Ok(ToolOutput::error("noteId is required"));
        };

        let Some(doc) = self.store.find_by_id(Collection::Notes, &note_id).await? else {
            return Ok(ToolOutput::success(json!({ "note": null })));
        };

        let note = json!({
            "id": id_value(&doc),
            "title": text(&doc, "title"),
            "content": text(&doc, "content"),
            "projectId": field_or_null(&doc, "projectId"),
            "createdAt": field_or_null(&doc, "createdAt"),
            "updatedAt": field_or_null(&doc, "updatedAt"),
        });
        memory.set_id("noteId", note_id);
        memory.set_entity(
            "note",
            json!({
                "title": text(&doc, "title"),
                "content": text(&doc, "content"),
                "updatedAt": field_or_null(&doc, "updatedAt"),
            }),
        );
        Ok(ToolOutput::success(json!({ "note": note })))
    }
}
