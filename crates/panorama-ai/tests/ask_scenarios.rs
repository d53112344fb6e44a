//! End-to-end agent runs against a snapshot store with a scripted LLM.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, Local, SecondsFormat, TimeZone, Utc};
use panorama_ai::agent::{PlanRun, StatusEvent};
use panorama_ai::llm::{CompletionRequest, Role, ToolChoice};
use panorama_ai::{
    AgentConfig, ChannelStatus, ChatAgent, MockLlmClient, MockStep, Plan, PlanStep, ResolverSet,
    ToolCall,
};
use panorama_storage::SnapshotStore;
use panorama_tools::{
    DataStore, Tool, ToolContract, ToolOutput, ToolRegistryBuilder, ToolResult, WorkingMemory,
    default_registry,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

fn ymd(days_from_today: u64) -> String {
    Local::now()
        .date_naive()
        .checked_add_days(Days::new(days_from_today))
        .unwrap()
        .format("%Y-%m-%d")
        .to_string()
}

fn local_at(days_from_today: u64, hour: u32) -> DateTime<Utc> {
    let day = Local::now()
        .date_naive()
        .checked_add_days(Days::new(days_from_today))
        .unwrap();
    Local
        .from_local_datetime(&day.and_hms_opt(hour, 0, 0).unwrap())
        .earliest()
        .unwrap()
        .with_timezone(&Utc)
}

async fn snapshot_store() -> Arc<dyn DataStore> {
    let snapshot = json!({
        "projects": [
            {"_id": "p1", "name": "Website Redesign", "description": "New marketing site"},
            {"_id": "p2", "name": "Mobile App"}
        ],
        "tasks": [
            {"_id": "t1", "projectId": "p1", "title": "Draft wireframes", "status": "todo",
             "deadline": ymd(0), "isUrgent": true},
            {"_id": "t2", "projectId": "p1", "title": "Ship landing page", "status": "done",
             "deadline": ymd(0), "isUrgent": true},
            {"_id": "t3", "projectId": "p2", "title": "Release beta", "status": "doing",
             "deadline": ymd(10)},
            {"_id": "t4", "projectId": "p1", "title": "Review copy", "status": "doing",
             "deadline": ymd(1)},
            {"_id": "t5", "projectId": "p2", "title": "Call vendor", "status": "todo",
             "deadline": local_at(1, 12).to_rfc3339_opts(SecondsFormat::Secs, true)},
            {"_id": "t6", "projectId": "p2", "title": "Plan launch", "status": "todo",
             "deadline": local_at(0, 9).timestamp_millis()},
            {"_id": "t7", "projectId": "p2", "title": "Book venue", "status": "todo",
             "deadline": local_at(5, 9).to_rfc3339()}
        ]
    });
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    tokio::fs::write(&path, snapshot.to_string()).await.unwrap();
    Arc::new(SnapshotStore::open(&path).await.unwrap())
}

fn test_config() -> AgentConfig {
    AgentConfig::new().with_backoff_base(Duration::from_millis(1))
}

fn agent(llm: &MockLlmClient, store: Arc<dyn DataStore>) -> ChatAgent {
    let registry = default_registry(store.clone(), None).unwrap();
    ChatAgent::new(Some(Arc::new(llm.clone())), Arc::new(registry))
        .with_resolvers(ResolverSet::for_store(store))
        .with_config(test_config())
}

fn tool_payloads(request: &CompletionRequest) -> Vec<Value> {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| serde_json::from_str(&m.content).unwrap())
        .collect()
}

/// Run a single `chat_tasks` step and return the payload handed to synthesis.
async fn due_tasks_payload(args: Value) -> Value {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::json(json!({
                "steps": [{"tool": "chat_tasks", "args": args}],
                "stopWhen": {"have": ["lists.tasks"]}
            })),
            MockStep::text("Here are your open tasks."),
        ],
    );
    let answer = agent(&llm, snapshot_store().await)
        .ask("urgent tasks due before tomorrow", &[])
        .await
        .unwrap();
    assert!(!answer.degraded);
    assert!(answer.citations.is_empty());

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 2);
    let mut payloads = tool_payloads(&requests[1]);
    assert_eq!(payloads.len(), 1);
    payloads.remove(0)
}

fn titles(payload: &Value) -> Vec<&str> {
    payload["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn urgent_tasks_due_before_tomorrow() {
    let payload = due_tasks_payload(json!({"dueBefore": ymd(1)})).await;
    assert_eq!(payload["total"], json!(4));
    assert_eq!(
        titles(&payload),
        vec!["Draft wireframes", "Plan launch", "Review copy", "Call vendor"]
    );
}

#[tokio::test]
async fn due_before_defaults_to_end_of_tomorrow() {
    let payload = due_tasks_payload(json!({})).await;
    assert_eq!(payload["total"], json!(4));
    assert_eq!(
        titles(&payload),
        vec!["Draft wireframes", "Plan launch", "Review copy", "Call vendor"]
    );
}

#[tokio::test]
async fn due_before_timestamp_bounds_by_instant() {
    let bound = local_at(1, 10).to_rfc3339_opts(SecondsFormat::Millis, true);
    let payload = due_tasks_payload(json!({"dueBefore": bound})).await;
    assert_eq!(payload["total"], json!(3));
    assert_eq!(
        titles(&payload),
        vec!["Draft wireframes", "Plan launch", "Review copy"]
    );
}

#[tokio::test]
async fn project_name_resolved_to_id() {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::json(json!({
                "steps": [{"tool": "chat_tasksByProject", "args": {"name": "Website Redesign"}}],
                "stopWhen": {"have": ["lists.tasks"]}
            })),
            MockStep::text("Website Redesign has 2 open tasks."),
        ],
    );
    let answer = agent(&llm, snapshot_store().await)
        .ask("what is left on Website Redesign?", &[])
        .await
        .unwrap();

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 2, "resolver should avoid re-planning");
    let payloads = tool_payloads(&requests[1]);
    assert_eq!(payloads[0]["total"], json!(2));

    let calls = requests[1]
        .messages
        .iter()
        .find_map(|m| m.tool_calls.clone())
        .unwrap();
    assert_eq!(calls[0].arguments["projectId"], json!("p1"));

    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].kind, "project");
    assert_eq!(answer.citations[0].id, "p1");
    assert_eq!(answer.citations[0].title, "Website Redesign");
}

#[tokio::test]
async fn unmatched_project_replans_then_skips() {
    let unresolved = json!({
        "steps": [{"tool": "chat_tasksByProject", "args": {"name": "Quantum Garden"}}]
    });
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::json(unresolved.clone()),
            MockStep::json(unresolved),
            MockStep::text("I found no matching data for Quantum Garden."),
        ],
    );
    let answer = agent(&llm, snapshot_store().await)
        .ask("tasks of Quantum Garden", &[])
        .await
        .unwrap();

    assert_eq!(answer.text, "I found no matching data for Quantum Garden.");
    let requests = llm.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests[1].messages[1].content.contains("\"failedTool\":\"chat_tasksByProject\""));

    let synthesis = &requests[2];
    assert!(tool_payloads(synthesis).is_empty());
    assert!(synthesis.messages[0].content.contains("No tool returned data"));
}

#[tokio::test]
async fn unmatched_project_steps_are_recorded_skipped() {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![MockStep::json(json!({
            "steps": [{"tool": "chat_tasksByProject", "args": {"name": "Quantum Garden"}}]
        }))],
    );
    let agent = agent(&llm, snapshot_store().await);
    let plan = Plan::new(vec![PlanStep::new(
        "chat_tasksByProject",
        json!({"name": "Quantum Garden"}),
    )]);
    let mut memory = WorkingMemory::new();

    let run: PlanRun = agent
        .run_plan("tasks of Quantum Garden", plan, &mut memory, &CancellationToken::new())
        .await
        .unwrap();

    assert!(run.replanned);
    assert_eq!(run.results.len(), 2);
    assert!(run.results.iter().all(|r| r.skipped));
    assert_eq!(run.invocations(), 0);
    assert_eq!(llm.requests().await.len(), 1);
}

#[tokio::test]
async fn semantic_search_disabled_without_backend() {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::json(json!({
                "steps": [{"tool": "chat_semanticSearch", "args": {"query": "design doc"}}]
            })),
            MockStep::text("Search is not available right now."),
        ],
    );
    let answer = agent(&llm, snapshot_store().await)
        .ask("find the design doc", &[])
        .await
        .unwrap();

    assert!(answer.citations.is_empty());
    let requests = llm.requests().await;
    assert_eq!(
        tool_payloads(&requests[1]),
        vec![json!({"results": [], "total": 0, "disabled": true})]
    );
}

struct CountingTool {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Tool for CountingTool {
    fn name(&self) -> &str {
        "chat_count"
    }

    fn description(&self) -> &str {
        "Counts invocations"
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn contract(&self) -> ToolContract {
        ToolContract::read_only(&[])
    }

    async fn execute(&self, _input: Value, _memory: &mut WorkingMemory) -> ToolResult<ToolOutput> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ToolOutput::success(json!({ "count": n })))
    }
}

#[tokio::test]
async fn step_budget_covers_replanning() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = snapshot_store().await;
    let registry = ToolRegistryBuilder::new(store.clone())
        .with_task_tools()
        .with_tool(Arc::new(CountingTool {
            calls: calls.clone(),
        }))
        .build()
        .unwrap();
    let count_steps: Vec<Value> = (0..5)
        .map(|_| json!({"tool": "chat_count", "args": {}}))
        .collect();
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![MockStep::json(json!({ "steps": count_steps }))],
    );
    let agent = ChatAgent::new(Some(Arc::new(llm.clone())), Arc::new(registry))
        .with_resolvers(ResolverSet::for_store(store))
        .with_config(test_config());

    let mut steps = vec![PlanStep::new("chat_tasksByProject", json!({"name": "Nope"}))];
    steps.extend((0..4).map(|_| PlanStep::new("chat_count", json!({}))));
    let mut memory = WorkingMemory::new();
    let run = agent
        .run_plan("q", Plan::new(steps), &mut memory, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(run.steps_run, 5);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert!(run.invocations() <= 5);
}

#[tokio::test]
async fn stop_condition_met_before_first_step() {
    let llm = MockLlmClient::new("mock");
    let agent = agent(&llm, snapshot_store().await);
    let plan = Plan::new(vec![PlanStep::new("chat_tasks", json!({}))]).with_stop_when(&["lists.tasks"]);
    let mut memory = WorkingMemory::new();
    memory.set_list("tasks", vec![json!({"title": "Already known"})]);

    let run = agent
        .run_plan("q", plan, &mut memory, &CancellationToken::new())
        .await
        .unwrap();

    assert!(run.stopped_early);
    assert_eq!(run.steps_run, 0);
    assert!(run.results.is_empty());
    assert!(llm.requests().await.is_empty());
}

#[tokio::test]
async fn stop_condition_ends_plan_early() {
    let llm = MockLlmClient::new("mock");
    let agent = agent(&llm, snapshot_store().await);
    let plan = Plan::new(vec![
        PlanStep::new("chat_projectByName", json!({"name": "mobile app"})),
        PlanStep::new("chat_projectsList", json!({})),
    ])
    .with_stop_when(&["ids.projectId"]);
    let mut memory = WorkingMemory::new();

    let run = agent
        .run_plan("q", plan, &mut memory, &CancellationToken::new())
        .await
        .unwrap();

    assert!(run.stopped_early);
    assert_eq!(run.invocations(), 1);
    assert_eq!(memory.id("projectId"), Some("p2"));
}

#[tokio::test]
async fn unusable_plan_falls_back_to_single_shot() {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::text("not json"),
            MockStep::tool_calls(vec![ToolCall {
                id: "call_a".to_string(),
                name: "chat_projectsList".to_string(),
                arguments: json!({}),
            }]),
            MockStep::text("You have 2 projects."),
        ],
    );
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);
    let answer = agent(&llm, snapshot_store().await)
        .with_status(Arc::new(ChannelStatus::new(tx)))
        .ask("list my projects", &[])
        .await
        .unwrap();

    assert_eq!(answer.text, "You have 2 projects.");
    let requests = llm.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].tool_choice, Some(ToolChoice::Auto));
    assert_eq!(requests[1].tools.len(), 18);
    assert_eq!(tool_payloads(&requests[2])[0]["total"], json!(2));

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.first(), Some(&StatusEvent::Thinking));
    assert!(events.contains(&StatusEvent::ToolFinished {
        tool: "chat_projectsList".to_string(),
        ok: true,
    }));
    assert_eq!(events.last(), Some(&StatusEvent::Synthesizing));
}

#[tokio::test]
async fn synthesis_timeout_degrades() {
    let llm = MockLlmClient::from_steps(
        "mock",
        vec![
            MockStep::json(json!({"steps": [{"tool": "chat_projectsList", "args": {}}]})),
            MockStep::text("too late").with_delay(500),
        ],
    );
    let answer = agent(&llm, snapshot_store().await)
        .with_config(test_config().with_llm_timeout(Duration::from_millis(50)))
        .ask("list my projects", &[])
        .await
        .unwrap();

    assert!(answer.degraded);
    assert!(answer.citations.is_empty());
}

#[tokio::test]
async fn cancelled_request_degrades() {
    let llm = MockLlmClient::new("mock");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let answer = agent(&llm, snapshot_store().await)
        .ask_with_cancel("anything due?", &[], cancel)
        .await
        .unwrap();
    assert!(answer.degraded);
}
