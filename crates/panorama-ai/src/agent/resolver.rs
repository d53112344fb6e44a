//! Argument resolvers: fill commonly-missing references from memory or by a
//! name lookup, keyed by the argument they produce.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use panorama_tools::remember_project;
use panorama_tools::selectors::{project_name_exact, project_name_fuzzy};
use panorama_traits::{Collection, DataStore, Query, ToolResult, WorkingMemory, document_id};
use serde_json::{Map, Value};

#[async_trait]
pub trait ArgResolver: Send + Sync {
    /// Argument this resolver fills.
    fn arg_name(&self) -> &str;

    /// Produce a value for the argument, or `None` when nothing matches.
    /// Resolvers may write what they found back into `memory`.
    async fn resolve(
        &self,
        args: &Map<String, Value>,
        memory: &mut WorkingMemory,
    ) -> ToolResult<Option<Value>>;
}

/// Resolves `projectId` from a project name.
///
/// The candidate name comes from `args.name`, else from the project entity
/// already in memory. Exact case-insensitive matches win over substring
/// matches.
pub struct ProjectIdResolver {
    store: Arc<dyn DataStore>,
}

impl ProjectIdResolver {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

fn candidate_name(args: &Map<String, Value>, memory: &WorkingMemory) -> Option<String> {
    let from_args = args.get("name").and_then(Value::as_str);
    let from_memory = memory
        .entity("project")
        .and_then(|project| project.get("name"))
        .and_then(Value::as_str);
    [from_args, from_memory]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl ArgResolver for ProjectIdResolver {
    fn arg_name(&self) -> &str {
        "projectId"
    }

    async fn resolve(
        &self,
        args: &Map<String, Value>,
        memory: &mut WorkingMemory,
    ) -> ToolResult<Option<Value>> {
        if let Some(id) = memory.id("projectId") {
            return Ok(Some(Value::String(id.to_string())));
        }
        let Some(name) = candidate_name(args, memory) else {
            return Ok(None);
        };

        let exact = self
            .store
            .find_one(Collection::Projects, &Query::new(project_name_exact(&name)))
            .await?;
        let project = match exact {
            Some(doc) => Some(doc),
            None => {
                let fuzzy = Query::new(project_name_fuzzy(&name)).sort_by("name", false);
                self.store.find_one(Collection::Projects, &fuzzy).await?
            }
        };

        let Some(doc) = project else {
            tracing::debug!(name = %name, "No project matches name");
            return Ok(None);
        };
        remember_project(memory, &doc);
        Ok(document_id(&doc).map(Value::String))
    }
}

/// Resolvers keyed by argument name.
#[derive(Default, Clone)]
pub struct ResolverSet {
    resolvers: HashMap<String, Arc<dyn ArgResolver>>,
}

impl ResolverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock resolvers over a data store.
    pub fn for_store(store: Arc<dyn DataStore>) -> Self {
        Self::new().with(ProjectIdResolver::new(store))
    }

    pub fn with(mut self, resolver: impl ArgResolver + 'static) -> Self {
        self.register(Arc::new(resolver));
        self
    }

    pub fn register(&mut self, resolver: Arc<dyn ArgResolver>) {
        self.resolvers
            .insert(resolver.arg_name().to_string(), resolver);
    }

    pub fn has(&self, arg: &str) -> bool {
        self.resolvers.contains_key(arg)
    }

    /// Fill `arg` in `args` when a resolver can produce it. Returns whether
    /// the argument is now present; store failures are passed through so the
    /// caller can retry them.
    pub async fn ensure_arg(
        &self,
        arg: &str,
        args: &mut Map<String, Value>,
        memory: &mut WorkingMemory,
    ) -> ToolResult<bool> {
        let Some(resolver) = self.resolvers.get(arg) else {
            return Ok(false);
        };
        match resolver.resolve(args, memory).await? {
            Some(value) => {
                tracing::debug!(arg, "Resolved missing argument");
                args.insert(arg.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
