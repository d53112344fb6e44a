//! Panorama Traits - Shared trait definitions and core abstractions.
//!
//! This crate provides the shared interfaces used across the workspace:
//! - Tool trait, ToolContract, ToolOutput, ToolRegistry
//! - WorkingMemory, the request-scoped store tools write into
//! - DataStore and SemanticIndex, the read-only backends tools query
//! - The filter DSL those backends evaluate

pub mod error;
pub mod filter;
pub mod memory;
pub mod registry;
pub mod store;
pub mod tool;

pub use error::{Result as ToolResult, ToolError};
pub use filter::{CompareOp, Document, Filter, compare_values, sort_order};
pub use memory::{MemoryError, WorkingMemory};
pub use registry::ToolRegistry;
pub use store::{
    Collection, DataStore, ID_FIELD, Query, SearchHit, SemanticIndex, SortKey, document_id,
};
pub use tool::{Tool, ToolContract, ToolOutput, ToolSchema};
