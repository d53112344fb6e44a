//! Re-planner: the single corrective planning call made after a step could
//! not resolve its required arguments.

use panorama_traits::WorkingMemory;

use super::plan::Plan;
use super::planner::Planner;
use super::prompt::replanner_user;

pub struct Replanner<'a> {
    planner: &'a Planner<'a>,
    system: &'a str,
    tool_names: &'a [&'a str],
}

impl<'a> Replanner<'a> {
    pub fn new(planner: &'a Planner<'a>, system: &'a str, tool_names: &'a [&'a str]) -> Self {
        Self {
            planner,
            system,
            tool_names,
        }
    }

    /// Ask for a replacement plan fitting in `remaining` steps. `None` when
    /// the budget is spent or the call fails.
    pub async fn replan(
        &self,
        query: &str,
        memory: &WorkingMemory,
        failed_tool: &str,
        error: &str,
        remaining: usize,
    ) -> Option<Plan> {
        if remaining == 0 {
            return None;
        }
        let user = replanner_user(query, &memory.snapshot(), failed_tool, error, remaining);
        let mut plan = self.planner.request_plan(self.system, &user, self.tool_names).await?;
        plan.truncate(remaining);
        tracing::info!(steps = plan.len(), remaining, "Replacement plan ready");
        Some(plan)
    }
}
