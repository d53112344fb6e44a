//! Prompt text for the planner, re-planner and synthesizer calls.

use chrono::{DateTime, Local};
use serde_json::{Value, json};

const GROUNDING_RULES: &str = "\
DATA RULES:
- Use ONLY the data returned by the tools. Do not use prior knowledge about people, companies or projects.
- Never invent, guess or complete missing information. If something is not in a tool result, say you do not have it.
- Present human-readable fields (titles, names, dates, statuses), never internal ids.
- Be concise.";

const PLANNER_INSTRUCTIONS: &[&str] = &[
    "You will plan the minimal sequence of tool calls to answer the user.",
    "Choose only from the allowed tools and provide precise arguments; always provide each tool's required arguments.",
    "Use chat_overdue for overdue items (deadline <= now).",
    "Use chat_tasks with dueBefore for deadlines (e.g. tomorrow).",
    "Use chat_tasksByProject when a project is named; pass its name as `name` when the id is unknown, the runtime resolves it.",
    "If the user names a project for notes, links or files, call chat_projectByName first, then the project-scoped tool.",
    "Use chat_tasksFilter for status/tag/importance/urgency filters.",
    "Use chat_semanticSearch for finding relevant documents by content.",
    "IMPORTANT: include stopWhen.have to avoid unnecessary steps. Examples: [\"lists.tasks\"] after getting tasks, [\"ids.projectId\"] after finding a project, [\"lists.*\"] when any list is populated.",
    "Leverage variable binding: use {\"var\":\"ids.projectId\"} to reference previously found ids.",
    "Output JSON only that matches the schema. Keep at most 5 steps.",
];

const SYNTHESIS_INSTRUCTIONS: &str = "\
Answer the user's question using ONLY the tool results above.
- Give total counts when listing items.
- Never show internal ids.
- If a tool result contains an \"error\", say that the data could not be retrieved; do not present it as an empty result.
- If the results are empty, say that no matching data was found.";

/// System prompt with temporal context and grounding rules.
pub fn system_prompt(now: DateTime<Local>, locale: Option<&str>) -> String {
    let mut prompt = format!(
        "You are the assistant of Panorama, a personal workspace for projects, tasks and notes.\n\n\
         TIME CONTEXT: today is {} at {} (UTC{}).\n\n\
         You can call read-only tools to look up the user's data.\n\n{}",
        now.format("%A %-d %B %Y"),
        now.format("%H:%M"),
        now.format("%:z"),
        GROUNDING_RULES,
    );
    match locale.map(str::trim).filter(|l| !l.is_empty()) {
        Some(locale) => {
            prompt.push_str(&format!("\n\nAnswer in the language `{}` unless the user writes in another language.", locale));
        }
        None => prompt.push_str("\n\nAnswer in the user's language."),
    }
    prompt
}

/// System message of the planning call.
pub fn planner_system(system: &str, tool_names: &[&str]) -> String {
    format!(
        "{} Allowed tools: {}. {}",
        system,
        tool_names.join(", "),
        PLANNER_INSTRUCTIONS.join(" ")
    )
}

/// User message of the re-planning call: the original question plus what the
/// first attempt learned.
pub fn replanner_user(
    query: &str,
    snapshot: &Value,
    failed_tool: &str,
    error: &str,
    remaining: usize,
) -> String {
    let context = json!({
        "memory": snapshot,
        "failedTool": failed_tool,
        "error": error,
        "remainingSteps": remaining,
    });
    format!(
        "{}\n\nThe previous plan stopped: {}. Current state:\n{}\n\
         Produce a replacement plan of at most {} steps that only uses arguments available above \
         or resolvable by name. Return an empty step list if the question cannot be answered.",
        query, error, context, remaining
    )
}

pub fn synthesis_instructions() -> &'static str {
    SYNTHESIS_INSTRUCTIONS
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_system_prompt_has_date_and_rules() {
        let now = Local.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let prompt = system_prompt(now, Some("fr"));
        assert!(prompt.contains("Friday 16 October 2026 at 09:30"));
        assert!(prompt.contains("never internal ids"));
        assert!(prompt.contains("`fr`"));
    }

    #[test]
    fn test_planner_system_lists_tools() {
        let text = planner_system("SYS", &["chat_tasks", "chat_overdue"]);
        assert!(text.starts_with("SYS Allowed tools: chat_tasks, chat_overdue."));
        assert!(text.contains("stopWhen.have"));
    }

    #[test]
    fn test_replanner_user_carries_budget() {
        let text = replanner_user("q", &json!({"ids": {}}), "chat_tasksByProject", "missing projectId", 3);
        assert!(text.contains("\"remainingSteps\":3"));
        assert!(text.contains("at most 3 steps"));
    }
}
