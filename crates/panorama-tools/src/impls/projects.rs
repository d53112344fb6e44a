use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, Document, Filter, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory, document_id,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{clamped, human_fields, id_value, non_empty, parse_input, text};
use crate::selectors::project_name_exact;

fn project_summary(doc: &Document) -> Value {
    json!({
        "id": id_value(doc),
        "name": clamped(doc, "name"),
        "description": clamped(doc, "description"),
    })
}

/// Record a resolved project as `ids.projectId` and `entities.project`.
pub fn remember_project(memory: &mut WorkingMemory, doc: &Document) {
    if let Some(id) = document_id(doc) {
        memory.set_id("projectId", id);
    }
    memory.set_entity(
        "project",
        json!({
            "name": text(doc, "name"),
            "description": text(doc, "description"),
        }),
    );
}

pub struct ProjectsListTool {
    store: Arc<dyn DataStore>,
}

impl ProjectsListTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ProjectsListTool {
    fn name(&self) -> &str {
        "chat_projectsList"
    }

    fn description(&self) -> &str {
        "List projects (name, description). Use for project discovery or selection."
    }

    fn parameters_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, _input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let query = Query::new(Filter::All)
            .sort_by("name", false)
            .with_fields(&["name", "description"]);
        let docs = self.store.find(Collection::Projects, &query).await?;
        let projects: Vec<Value> = docs.iter().map(project_summary).collect();
        memory.set_list("projects", human_fields(&projects));
        Ok(ToolOutput::success(json!({
            "projects": projects,
            "total": projects.len(),
        })))
    }
}

#[derive(Debug, Deserialize)]
struct ByNameInput {
    name: Option<String>,
}

/// Case-insensitive exact lookup of a single project.
pub struct ProjectByNameTool {
    store: Arc<dyn DataStore>,
}

impl ProjectByNameTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ProjectByNameTool {
    fn name(&self) -> &str {
        "chat_projectByName"
    }

    fn description(&self) -> &str {
        "Fetch a single project by its name (case-insensitive). Use when the user names a project."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string", "description": "Project name (case-insensitive match)" }
            },
            "required": ["name"]
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&["name"])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: ByNameInput = match parse_input(input, "Required fields: name (string).") {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let Some(name) = non_empty(params.name) else {
            return Ok(ToolOutput::error("name is required"));
        };

        let query = Query::new(project_name_exact(&name)).with_fields(&["name", "description"]);
        let project = self.store.find_one(Collection::Projects, &query).await?;
        let summary = match &project {
            Some(doc) => {
                remember_project(memory, doc);
                project_summary(doc)
            }
            None => {
                tracing::debug!(name = %name, "No project matched name");
                Value::Null
            }
        };
        Ok(ToolOutput::success(json!({ "project": summary })))
    }
}

#[cfg(test)]
mod tests {
    use panorama_storage::SnapshotStore;

    use super::*;

    fn store() -> Arc<dyn DataStore> {
        Arc::new(SnapshotStore::new().with_documents(
            Collection::Projects,
            vec![
                json!({"_id": "p2", "name": "Website Redesign", "description": "New site"}),
                json!({"_id": "p1", "name": "Garden"}),
            ],
        ))
    }

    #[tokio::test]
    async fn test_project_by_name_sets_memory() {
        let tool = ProjectByNameTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"name": "website redesign"}), &mut memory)
            .await
            .unwrap();

        assert_eq!(output.result["project"]["id"], json!("p2"));
        assert_eq!(memory.id("projectId"), Some("p2"));
        assert_eq!(
            memory.lookup("entities.project.name"),
            Some(json!("Website Redesign"))
        );
    }

    #[tokio::test]
    async fn test_project_by_name_miss_is_not_an_error() {
        let tool = ProjectByNameTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"name": "Nonexistent"}), &mut memory)
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.result["project"], Value::Null);
        assert_eq!(memory.id("projectId"), None);
    }

    #[tokio::test]
    async fn test_projects_list_sorted_by_name() {
        let tool = ProjectsListTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool.execute(json!({}), &mut memory).await.unwrap();
        assert_eq!(output.result["total"], json!(2));
        assert_eq!(output.result["projects"][0]["name"], json!("Garden"));
        assert_eq!(
            memory.list("projects").unwrap()[1],
            json!({"name": "Website Redesign", "description": "New site"})
        );
    }
}
