//! Planned question answering: planner, step executor, re-planner,
//! stop conditions, synthesis and citations.

mod call;
pub mod citations;
pub mod config;
pub mod fallback;
pub mod orchestrator;
pub mod plan;
pub mod planner;
pub mod prompt;
pub mod replanner;
pub mod resolver;
pub mod status;
pub mod step_executor;
pub mod stop;
pub mod synthesizer;

pub use citations::{Citation, build_citations};
pub use config::{AgentConfig, DEFAULT_MAX_HISTORY_MESSAGES, DEFAULT_TOOL_RETRIES, MAX_PLAN_STEPS};
pub use fallback::{FallbackOutcome, SingleShot};
pub use orchestrator::{Answer, ChatAgent, PlanRun, trim_history};
pub use plan::{Plan, PlanStep, plan_schema};
pub use planner::Planner;
pub use replanner::Replanner;
pub use resolver::{ArgResolver, ProjectIdResolver, ResolverSet};
pub use status::{ChannelStatus, NullStatus, StatusEvent, StatusSink};
pub use step_executor::{StepExecutor, StepResult, bind_args};
pub use stop::{artifact_satisfied, should_stop};
pub use synthesizer::{Synthesis, Synthesizer, UNAVAILABLE_ANSWER};
