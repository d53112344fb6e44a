//! Read-only data tool implementations.

pub mod alarms;
pub mod collection_query;
pub mod note;
pub mod projects;
pub mod registry_builder;
pub mod scoped_list;
pub mod semantic_search;
pub mod tasks;
pub mod user_logs;

mod shared;

pub use alarms::AlarmsListTool;
pub use collection_query::CollectionQueryTool;
pub use note::NoteByIdTool;
pub use projects::{ProjectByNameTool, ProjectsListTool, remember_project};
pub use registry_builder::{ToolRegistryBuilder, default_registry};
pub use scoped_list::{ListSpec, ScopedListTool};
pub use semantic_search::SemanticSearchTool;
pub use tasks::{OverdueTool, TasksByProjectTool, TasksFilterTool, TasksTool};
pub use user_logs::UserLogsFilterTool;
