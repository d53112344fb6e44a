//! Task tools: deadline window, overdue, per-project and attribute filters.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use panorama_traits::{
    Collection, DataStore, Document, Filter, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{
    clamped, field_or_null, flag, human_fields, id_value, non_empty, parse_input, text,
};
use crate::selectors::{
    TaskFilters, by_project_selector, end_of_tomorrow, overdue_selector, parse_flag,
    parse_instant, task_filter_selector, tasks_selector,
};

const TASK_FIELDS: &[&str] = &[
    "title",
    "projectId",
    "status",
    "deadline",
    "isUrgent",
    "isImportant",
    "notes",
];

fn project_task(doc: &Document) -> Value {
    let status = text(doc, "status");
    json!({
        "id": id_value(doc),
        "projectId": field_or_null(doc, "projectId"),
        "title": clamped(doc, "title"),
        "notes": clamped(doc, "notes"),
        "status": if status.is_empty() { "todo".to_string() } else { status },
        "deadline": field_or_null(doc, "deadline"),
        "isUrgent": flag(doc, "isUrgent"),
        "isImportant": flag(doc, "isImportant"),
    })
}

/// Run a task query, publish `lists.tasks` and build the payload.
async fn run_task_query(
    store: &dyn DataStore,
    filter: Filter,
    memory: &mut WorkingMemory,
) -> ToolResult<ToolOutput> {
    let query = Query::new(filter)
        .sort_by("deadline", false)
        .with_fields(TASK_FIELDS);
    let docs = store.find(Collection::Tasks, &query).await?;
    let tasks: Vec<Value> = docs.iter().map(project_task).collect();
    memory.set_list("tasks", human_fields(&tasks));
    Ok(ToolOutput::success(json!({
        "tasks": tasks,
        "total": tasks.len(),
    })))
}

// ── chat_tasks ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksInput {
    due_before: Option<String>,
    project_id: Option<String>,
    status: Option<String>,
}

/// Open tasks due on or before a bound (default: end of tomorrow).
pub struct TasksTool {
    store: Arc<dyn DataStore>,
}

impl TasksTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TasksTool {
    fn name(&self) -> &str {
        "chat_tasks"
    }

    fn description(&self) -> &str {
        "List non-completed tasks filtered by deadline upper bound and/or project. \
         Use for queries like tasks due before a date (e.g., tomorrow). \
         Completed tasks are excluded unless a status is given."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "dueBefore": {
                    "type": "string",
                    "description": "ISO date/time upper bound for deadline (defaults to local tomorrow 23:59:59)"
                },
                "projectId": { "type": "string", "description": "Filter by project id" },
                "status": { "type": "string", "enum": ["todo", "doing", "done"] }
            }
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: TasksInput = match parse_input(
            input,
            "Optional fields: dueBefore (ISO date), projectId (string), status (string).",
        ) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };

        let requested = non_empty(params.due_before);
        let due_before = match requested.as_deref().map(parse_instant) {
            Some(Some(bound)) => bound,
            Some(None) => {
                return Ok(ToolOutput::error(format!(
                    "Invalid dueBefore: expected an ISO date or timestamp, got '{}'",
                    requested.unwrap_or_default()
                )));
            }
            None => match end_of_tomorrow() {
                Some(bound) => bound,
                None => return Ok(ToolOutput::error("Could not compute default deadline bound")),
            },
        };
        memory.set_param("dueBefore", json!(due_before.to_rfc3339()));

        let project_id = non_empty(params.project_id);
        let status = non_empty(params.status);
        let filter = tasks_selector(project_id.as_deref(), status.as_deref(), due_before);
        run_task_query(self.store.as_ref(), filter, memory).await
    }
}

// ── chat_overdue ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct OverdueInput {
    now: Option<String>,
}

pub struct OverdueTool {
    store: Arc<dyn DataStore>,
}

impl OverdueTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OverdueTool {
    fn name(&self) -> &str {
        "chat_overdue"
    }

    fn description(&self) -> &str {
        "Return non-completed tasks with deadline <= now. Use when the user asks for overdue \
         or late items. Defaults to current time if now is not provided."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "now": { "type": "string", "description": "ISO date/time (optional). Defaults to current time." }
            }
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: OverdueInput = match parse_input(input, "Optional fields: now (ISO date).") {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let now = non_empty(params.now)
            .and_then(|raw| parse_instant(&raw))
            .unwrap_or_else(Utc::now);
        run_task_query(self.store.as_ref(), overdue_selector(now), memory).await
    }
}

// ── chat_tasksByProject ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByProjectInput {
    project_id: Option<String>,
}

pub struct TasksByProjectTool {
    store: Arc<dyn DataStore>,
}

impl TasksByProjectTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TasksByProjectTool {
    fn name(&self) -> &str {
        "chat_tasksByProject"
    }

    fn description(&self) -> &str {
        "Return non-completed tasks for a specific project. Use when the user mentions a \
         project or asks for tasks within a project. projectId may be omitted after \
         chat_projectByName; it is bound from the previous result."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "projectId": { "type": "string" },
                "name": { "type": "string", "description": "Project name, used to resolve projectId" }
            },
            "required": ["projectId"]
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&["projectId"])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: ByProjectInput = match parse_input(input, "Required fields: projectId (string).") {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let Some(project_id) = non_empty(params.project_id) else {
            return Ok(ToolOutput::error("projectId is required"));
        };
        run_task_query(self.store.as_ref(), by_project_selector(&project_id), memory).await
    }
}

// ── chat_tasksFilter ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterInput {
    project_id: Option<String>,
    status: Option<String>,
    tag: Option<String>,
    important: Option<Value>,
    urgent: Option<Value>,
}

pub struct TasksFilterTool {
    store: Arc<dyn DataStore>,
}

impl TasksFilterTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TasksFilterTool {
    fn name(&self) -> &str {
        "chat_tasksFilter"
    }

    fn description(&self) -> &str {
        "Return tasks filtered by simple attributes like status, tag, importance, urgency \
         and/or projectId. Use when the user specifies a tag or status filter."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "description": "Task status to filter (e.g., todo, doing, done)" },
                "tag": { "type": "string", "description": "Tag value to filter" },
                "projectId": { "type": "string", "description": "Optional project id to scope the filter" },
                "important": { "type": "boolean" },
                "urgent": { "type": "boolean" }
            }
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: FilterInput = match parse_input(
            input,
            "Optional fields: status, tag, projectId (strings), important, urgent (booleans).",
        ) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let project_id = non_empty(params.project_id);
        let status = non_empty(params.status);
        let tag = non_empty(params.tag);
        let filters = TaskFilters {
            project_id: project_id.as_deref(),
            status: status.as_deref(),
            tag: tag.as_deref(),
            important: params.important.as_ref().and_then(parse_flag),
            urgent: params.urgent.as_ref().and_then(parse_flag),
        };
        run_task_query(self.store.as_ref(), task_filter_selector(&filters), memory).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Days, Local};
    use panorama_storage::SnapshotStore;

    use super::*;

    fn store() -> Arc<dyn DataStore> {
        let tomorrow = Local::now()
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap()
            .format("%Y-%m-%d")
            .to_string();
        Arc::new(SnapshotStore::new().with_documents(
            Collection::Tasks,
            vec![
                json!({"_id": "t1", "title": "Renew passport", "status": "todo", "deadline": tomorrow, "isUrgent": true, "projectId": "p1"}),
                json!({"_id": "t2", "title": "Pay rent", "status": "done", "deadline": tomorrow}),
                json!({"_id": "t3", "title": "Plan offsite", "status": "doing", "deadline": "2099-01-01", "tags": ["work"]}),
                json!({"_id": "t4", "title": "Old chore", "deadline": "2001-01-01", "projectId": "p1"}),
            ],
        ))
    }

    #[tokio::test]
    async fn test_tasks_defaults_to_tomorrow_and_skips_done() {
        let tool = TasksTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool.execute(json!({}), &mut memory).await.unwrap();

        assert!(output.success);
        assert_eq!(output.result["total"], json!(2));
        let titles: Vec<&str> = output.result["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Old chore", "Renew passport"]);
        assert_eq!(output.result["tasks"][0]["status"], json!("todo"));

        let listed = memory.list("tasks").unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].get("id").is_none());
        assert!(listed[0].get("projectId").is_none());
        assert!(memory.params.contains_key("dueBefore"));
    }

    #[tokio::test]
    async fn test_tasks_rejects_unparseable_bound() {
        let tool = TasksTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"dueBefore": "next week"}), &mut memory)
            .await
            .unwrap();
        assert!(!output.success);
        assert!(memory.list("tasks").is_none());
    }

    #[tokio::test]
    async fn test_overdue_uses_explicit_now() {
        let tool = OverdueTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"now": "2010-01-01T00:00:00Z"}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(1));
        assert_eq!(output.result["tasks"][0]["id"], json!("t4"));
    }

    #[tokio::test]
    async fn test_tasks_by_project() {
        let tool = TasksByProjectTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"projectId": "p1"}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(2));
        assert_eq!(tool.contract().required, vec!["projectId".to_string()]);
    }

    #[tokio::test]
    async fn test_tasks_filter_by_tag_and_flag() {
        let tool = TasksFilterTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"tag": "work"}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(1));

        let output = tool
            .execute(json!({"urgent": "true"}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["tasks"][0]["title"], json!("Renew passport"));
    }
}
