use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use panorama_ai::{Answer, ChatAgent, Message, StatusEvent, StatusSink};

use crate::output::OutputFormat;
use crate::output::json::print_json;

/// Prints progress to stderr so stdout only carries the answer.
pub struct ProgressStatus;

impl StatusSink for ProgressStatus {
    fn emit(&self, event: StatusEvent) {
        let line = match event {
            StatusEvent::Thinking => "Thinking...".to_string(),
            StatusEvent::Planned { steps } => format!("Planned {steps} step(s)"),
            StatusEvent::ToolStarted { tool } => format!("Running {tool}"),
            StatusEvent::ToolFinished { tool, ok: false } => format!("{tool} failed"),
            StatusEvent::ToolFinished { .. } => return,
            StatusEvent::Replanning => "Re-planning...".to_string(),
            StatusEvent::Synthesizing => "Writing answer...".to_string(),
        };
        eprintln!("{}", line.dimmed());
    }
}

/// Read prior turns from a JSON array of messages.
pub fn load_history(path: &Path) -> Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    let history: Vec<Message> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid history file {}", path.display()))?;
    Ok(history)
}

pub async fn ask(
    agent: &ChatAgent,
    query: &str,
    history: &[Message],
    format: OutputFormat,
) -> Result<()> {
    let answer = agent.ask(query, history).await?;
    if answer.degraded {
        tracing::warn!("Answer degraded");
    }

    if format.is_json() {
        return print_json(&answer);
    }
    print_answer(&answer);
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);

    if !answer.citations.is_empty() {
        println!("\n{}", "Sources:".bold());
        for citation in &answer.citations {
            match &citation.url {
                Some(url) => println!(
                    "  [{}] {} {}",
                    citation.kind,
                    citation.title,
                    url.dimmed()
                ),
                None => println!("  [{}] {}", citation.kind, citation.title),
            }
        }
    }
}
