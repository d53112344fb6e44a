use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "panorama")]
#[command(version, about = "Panorama Ask - grounded answers over your workspace data")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace snapshot (JSON) to answer from
    #[arg(long, global = true, env = "PANORAMA_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Chat model for planning and synthesis
    #[arg(long, global = true, env = "PANORAMA_MODEL")]
    pub model: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question about the workspace
    Ask(AskArgs),

    /// List the registered data tools
    Tools,
}

#[derive(Args)]
pub struct AskArgs {
    /// The question
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Prior conversation as a JSON array of {role, content} messages
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Step budget for this request (1-5)
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Hide progress updates
    #[arg(short, long)]
    pub quiet: bool,
}

impl AskArgs {
    pub fn query_text(&self) -> String {
        self.query.join(" ")
    }
}
