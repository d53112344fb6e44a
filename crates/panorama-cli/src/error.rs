use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = format!("{err:#}").to_lowercase();

    if msg.contains("no llm credentials") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export your API key:");
        eprintln!("  {} export OPENAI_API_KEY=<value>", "$".dimmed());
        eprintln!("  or set `openai` under [api_keys] in ~/.config/panorama/config.toml");
    }

    if msg.contains("snapshot") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Point --snapshot (or PANORAMA_SNAPSHOT) at a workspace JSON export.");
    }

    if msg.contains("query is empty") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  {} panorama ask \"what is due today?\"", "$".dimmed());
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
