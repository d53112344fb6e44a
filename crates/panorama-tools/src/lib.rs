//! Read-only data tools for Panorama Ask.
//!
//! This crate provides:
//! - The `chat_*` tool implementations over a [`DataStore`] and optional
//!   [`SemanticIndex`]
//! - Filter builders and the allow-listed where-DSL ([`selectors`])
//! - [`ToolRegistryBuilder`] / [`default_registry`]
//!
//! Core abstractions (Tool trait, ToolRegistry, WorkingMemory) live in
//! `panorama-traits` and are re-exported here for convenience.

pub mod impls;
pub mod selectors;

pub use panorama_traits::{
    DataStore, SemanticIndex, Tool, ToolContract, ToolError, ToolOutput, ToolRegistry,
    ToolResult, ToolSchema, WorkingMemory,
};

pub use impls::{
    AlarmsListTool, CollectionQueryTool, ListSpec, NoteByIdTool, OverdueTool, ProjectByNameTool,
    ProjectsListTool, ScopedListTool, SemanticSearchTool, TasksByProjectTool, TasksFilterTool,
    TasksTool, ToolRegistryBuilder, UserLogsFilterTool, default_registry, remember_project,
};
