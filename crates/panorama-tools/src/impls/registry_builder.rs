//! Tool registry builder.
//!
//! Provides ToolRegistryBuilder for constructing a ToolRegistry over a data
//! store and an optional semantic index.

use std::sync::Arc;

use panorama_traits::{DataStore, SemanticIndex, Tool, ToolRegistry, ToolResult};

use super::scoped_list::{
    FILES_BY_PROJECT, LINKS_BY_PROJECT, NOTE_LINES_BY_SESSION, NOTE_SESSIONS_BY_PROJECT,
    NOTES_BY_PROJECT, PEOPLE_LIST, TEAMS_LIST,
};
use super::{
    AlarmsListTool, CollectionQueryTool, NoteByIdTool, OverdueTool, ProjectByNameTool,
    ProjectsListTool, ScopedListTool, SemanticSearchTool, TasksByProjectTool, TasksFilterTool,
    TasksTool, UserLogsFilterTool,
};

/// Builder for creating a fully configured ToolRegistry.
pub struct ToolRegistryBuilder {
    store: Arc<dyn DataStore>,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self {
            store,
            tools: Vec::new(),
        }
    }

    fn push(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn with_task_tools(self) -> Self {
        let store = self.store.clone();
        self.push(TasksTool::new(store.clone()))
            .push(OverdueTool::new(store.clone()))
            .push(TasksByProjectTool::new(store.clone()))
            .push(TasksFilterTool::new(store))
    }

    pub fn with_project_tools(self) -> Self {
        let store = self.store.clone();
        self.push(ProjectsListTool::new(store.clone()))
            .push(ProjectByNameTool::new(store.clone()))
            .push(ScopedListTool::new(store.clone(), &LINKS_BY_PROJECT))
            .push(ScopedListTool::new(store, &FILES_BY_PROJECT))
    }

    pub fn with_note_tools(self) -> Self {
        let store = self.store.clone();
        self.push(ScopedListTool::new(store.clone(), &NOTES_BY_PROJECT))
            .push(NoteByIdTool::new(store.clone()))
            .push(ScopedListTool::new(store.clone(), &NOTE_SESSIONS_BY_PROJECT))
            .push(ScopedListTool::new(store, &NOTE_LINES_BY_SESSION))
    }

    pub fn with_directory_tools(self) -> Self {
        let store = self.store.clone();
        self.push(ScopedListTool::new(store.clone(), &PEOPLE_LIST))
            .push(ScopedListTool::new(store.clone(), &TEAMS_LIST))
            .push(AlarmsListTool::new(store.clone()))
            .push(UserLogsFilterTool::new(store))
    }

    pub fn with_collection_query(self) -> Self {
        let store = self.store.clone();
        self.push(CollectionQueryTool::new(store))
    }

    /// Register semantic search. Without an index the tool reports itself
    /// disabled instead of failing.
    pub fn with_semantic_search(self, index: Option<Arc<dyn SemanticIndex>>) -> Self {
        let store = self.store.clone();
        self.push(SemanticSearchTool::new(store, index))
    }

    /// Add a custom tool.
    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn build(self) -> ToolResult<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register_arc(tool)?;
        }
        Ok(registry)
    }
}

/// Create a registry with every data tool.
pub fn default_registry(
    store: Arc<dyn DataStore>,
    index: Option<Arc<dyn SemanticIndex>>,
) -> ToolResult<ToolRegistry> {
    ToolRegistryBuilder::new(store)
        .with_task_tools()
        .with_project_tools()
        .with_note_tools()
        .with_directory_tools()
        .with_collection_query()
        .with_semantic_search(index)
        .build()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use panorama_storage::SnapshotStore;
    use panorama_traits::{ToolContract, ToolError, ToolOutput, WorkingMemory};
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn test_default_registry_has_all_tools() {
        let registry = default_registry(Arc::new(SnapshotStore::new()), None).unwrap();
        assert_eq!(registry.len(), 18);
        for name in [
            "chat_tasks",
            "chat_overdue",
            "chat_tasksByProject",
            "chat_tasksFilter",
            "chat_projectsList",
            "chat_projectByName",
            "chat_semanticSearch",
            "chat_notesByProject",
            "chat_noteById",
            "chat_noteSessionsByProject",
            "chat_noteLinesBySession",
            "chat_linksByProject",
            "chat_peopleList",
            "chat_teamsList",
            "chat_filesByProject",
            "chat_alarmsList",
            "chat_collectionQuery",
            "chat_userLogsFilter",
        ] {
            assert!(registry.has(name), "missing {name}");
            assert!(registry.contract(name).unwrap().read_only);
        }
    }

    struct DeleteEverything;

    #[async_trait]
    impl Tool for DeleteEverything {
        fn name(&self) -> &str {
            "chat_deleteEverything"
        }

        fn description(&self) -> &str {
            "Not allowed"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object"})
        }

        fn contract(&self) -> ToolContract {
            ToolContract {
                required: vec![],
                read_only: false,
            }
        }

        async fn execute(&self, _input: Value, _memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
            Ok(ToolOutput::success(Value::Null))
        }
    }

    #[test]
    fn test_builder_rejects_mutating_tool() {
        let result = ToolRegistryBuilder::new(Arc::new(SnapshotStore::new()))
            .with_task_tools()
            .with_tool(Arc::new(DeleteEverything))
            .build();
        assert!(matches!(result, Err(ToolError::NotReadOnly(_))));
    }
}
