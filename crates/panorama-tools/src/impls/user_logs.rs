use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, SecondsFormat, Utc};
use panorama_traits::{
    Collection, CompareOp, DataStore, Filter, Query, Tool, ToolContract, ToolOutput, ToolResult,
    WorkingMemory,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::shared::{clamp_limit, field_or_null, human_fields, id_value, parse_input, text};
use crate::selectors::clamp_text;

const LOG_CLAMP: usize = 500;
const MAX_LOGS: usize = 1000;
const DEFAULT_LOGS: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserLogsInput {
    last_days: Option<Value>,
    limit: Option<Value>,
}

/// Journal entries, newest first.
pub struct UserLogsFilterTool {
    store: Arc<dyn DataStore>,
}

impl UserLogsFilterTool {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UserLogsFilterTool {
    fn name(&self) -> &str {
        "chat_userLogsFilter"
    }

    fn description(&self) -> &str {
        "Return journal entries (user logs), newest first. Use lastDays to restrict to a \
         recent window; without it the 50 latest entries are returned."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "lastDays": { "type": "number", "description": "Only entries from the last N days" },
                "limit": { "type": "number", "description": "Max entries (default 50, or 1000 with lastDays)" }
            }
        })
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, input: Value, memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let params: UserLogsInput = match parse_input(
            input,
            "Optional fields: lastDays (number), limit (number).",
        ) {
            Ok(p) => p,
            Err(out) => return Ok(out),
        };

        let last_days = params
            .last_days
            .as_ref()
            .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
            .filter(|d| d.is_finite() && *d > 0.0);

        let (filter, default_limit) = match last_days {
            Some(days) => {
                let cutoff = Duration::try_seconds((days * 86_400.0) as i64)
                    .and_then(|span| Utc::now().checked_sub_signed(span));
                let filter = match cutoff {
                    Some(cutoff) => Filter::compare(
                        "createdAt",
                        CompareOp::Gte,
                        cutoff.to_rfc3339_opts(SecondsFormat::Millis, true),
                    ),
                    None => Filter::All,
                };
                (filter, MAX_LOGS)
            }
            None => (Filter::All, DEFAULT_LOGS),
        };
        let limit = clamp_limit(params.limit.as_ref(), default_limit, MAX_LOGS);

        let query = Query::new(filter)
            .sort_by("createdAt", true)
            .with_limit(limit)
            .with_fields(&["content", "createdAt"]);
        let docs = self.store.find(Collection::UserLogs, &query).await?;
        let logs: Vec<Value> = docs
            .iter()
            .map(|doc| {
                json!({
                    "id": id_value(doc),
                    "content": clamp_text(&text(doc, "content"), LOG_CLAMP),
                    "createdAt": field_or_null(doc, "createdAt"),
                })
            })
            .collect();
        memory.set_list("userLogs", human_fields(&logs));
        Ok(ToolOutput::success(json!({
            "userLogs": logs,
            "total": logs.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use panorama_storage::SnapshotStore;

    use super::*;

    fn store() -> Arc<dyn DataStore> {
        let recent = (Utc::now() - Duration::hours(2)).to_rfc3339_opts(SecondsFormat::Millis, true);
        Arc::new(SnapshotStore::new().with_documents(
            Collection::UserLogs,
            vec![
                json!({"_id": "g1", "content": "Old entry", "createdAt": "2020-01-01T00:00:00.000Z"}),
                json!({"_id": "g2", "content": "x".repeat(600), "createdAt": recent}),
            ],
        ))
    }

    #[tokio::test]
    async fn test_last_days_window() {
        let tool = UserLogsFilterTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"lastDays": 7}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(1));
        let content = output.result["userLogs"][0]["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), LOG_CLAMP);
    }

    #[tokio::test]
    async fn test_newest_first_with_limit() {
        let tool = UserLogsFilterTool::new(store());
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"limit": 1}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(1));
        assert_eq!(output.result["userLogs"][0]["id"], json!("g2"));
    }

    #[tokio::test]
    async fn test_last_days_window_accepts_millis_and_offsets() {
        let now = Utc::now();
        let recent_millis = (now - Duration::hours(3)).timestamp_millis();
        let recent_offset = (now - Duration::hours(1))
            .with_timezone(&chrono::FixedOffset::west_opt(5 * 3600).unwrap())
            .to_rfc3339();
        let stale_millis = (now - Duration::days(30)).timestamp_millis();
        let store: Arc<dyn DataStore> = Arc::new(SnapshotStore::new().with_documents(
            Collection::UserLogs,
            vec![
                json!({"_id": "m1", "content": "Millis entry", "createdAt": recent_millis}),
                json!({"_id": "o1", "content": "Offset entry", "createdAt": recent_offset}),
                json!({"_id": "m2", "content": "Stale entry", "createdAt": stale_millis}),
            ],
        ));
        let tool = UserLogsFilterTool::new(store);
        let mut memory = WorkingMemory::new();
        let output = tool
            .execute(json!({"lastDays": 1}), &mut memory)
            .await
            .unwrap();
        assert_eq!(output.result["total"], json!(2));
        let ids: Vec<_> = output.result["userLogs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|log| log["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("o1"), json!("m1")]);
    }
}
