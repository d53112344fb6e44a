use anyhow::Result;
use comfy_table::{Cell, Table};
use panorama_tools::ToolRegistry;
use serde_json::json;

use crate::output::OutputFormat;
use crate::output::json::print_json;

const DESCRIPTION_WIDTH: usize = 72;

fn short_description(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_WIDTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(DESCRIPTION_WIDTH - 3).collect();
    format!("{}...", cut.trim_end())
}

pub fn list_tools(registry: &ToolRegistry, format: OutputFormat) -> Result<()> {
    let mut tools: Vec<_> = registry
        .list()
        .into_iter()
        .filter_map(|name| Some((registry.get(name)?, registry.contract(name)?)))
        .collect();
    tools.sort_by(|(a, _), (b, _)| a.name().cmp(b.name()));

    if format.is_json() {
        let items: Vec<_> = tools
            .iter()
            .map(|(tool, contract)| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "required": contract.required,
                    "readOnly": contract.read_only,
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect();
        return print_json(&items);
    }

    let mut table = Table::new();
    table.set_header(vec!["Name", "Required", "Read-only", "Description"]);

    for (tool, contract) in &tools {
        let required = if contract.required.is_empty() {
            "-".to_string()
        } else {
            contract.required.join(", ")
        };
        table.add_row(vec![
            Cell::new(tool.name()),
            Cell::new(required),
            Cell::new(if contract.read_only { "yes" } else { "no" }),
            Cell::new(short_description(tool.description())),
        ]);
    }

    crate::output::table::print_table(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_description() {
        assert_eq!(short_description("List alarms."), "List alarms.");
        let long = "word ".repeat(30);
        let short = short_description(&long);
        assert!(short.ends_with("..."));
        assert!(short.chars().count() <= DESCRIPTION_WIDTH);
    }
}
