use std::sync::Arc;

use async_trait::async_trait;
use panorama_traits::{
    Collection, DataStore, Filter, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{clamped, field_or_null, human_fields, id_value, parse_input};
use crate::selectors::parse_flag;

#[derive(Debug, Deserialize)]
struct AlarmsInput {
    enabled: Option<Value>,
}

pub struct AlarmsListTool {
    store: Arc<dyn DataStore>,
}

impl AlarmsListTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for AlarmsListTool {
    fn name(&self) -> &str {
        "chat_alarmsList"
    }

    fn description(&self) -> &str {
        "List alarms and reminders, optionally only enabled or disabled ones."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "enabled": { "type": "boolean" }
            }
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: AlarmsInput = match parse_input(input, "Optional fields: enabled (boolean).") {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };
        let filter = match params.enabled.as_ref().and_then(parse_flag) {
            Some(enabled) => Filter::eq("enabled", enabled),
            None => Filter::All,
        };

        let query = Query::new(filter)
            .sort_by("when", false)
            .with_fields(&["title", "when", "enabled"]);
        let docs = self.store.find(Collection::Alarms, &query).await?;
        let alarms: Vec<Value> = docs
            .iter()
            .map(|doc| {
                json!({
                    "id": id_value(doc),
                    "title": clamped(doc, "title"),
                    "when": field_or_null(doc, "when"),
                })
            })
            .collect();
        memory.set_list("alarms", human_fields(&alarms));
        Ok(ToolOutput::success(json!({
            "alarms": alarms,
            "total": alarms.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use panorama_storage::SnapshotStore;

    use super::*;

    #[tokio::test]
    async fn test_alarms_filter_enabled() {
        let store: Arc<dyn DataStore> = Arc::new(SnapshotStore::new().with_documents(
            Collection::Alarms,
            vec![
                json!({"_id": "a1", "title": "Standup", "enabled": true, "when": "2026-10-17T09:00:00Z"}),
                json!({"_id": "a2", "title": "Old", "enabled": false}),
            ],
        ));
        let tool = AlarmsListTool::new(store);
        let mut memory = WorkingMemory::new();

        let output = tool
            .execute(json!({"enabled": true}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(1));
        assert_eq!(memory.list("alarms").unwrap()[0]["title"], json!("Standup"));

        let all = tool.execute(json!({}), &mut memory).await.unwrap();
        assert_eq!(all.result["total"], json!(2));
    }
}
