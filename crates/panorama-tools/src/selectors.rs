//! Filter builders shared by the data tools, plus the allow-listed where-DSL
//! accepted by `chat_collectionQuery`.

use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use panorama_traits::{Collection, CompareOp, Filter};
use serde_json::{Map, Value};

/// Status value marking a finished task.
pub const DONE: &str = "done";

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn clamp_text(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut clamped: String = text.chars().take(max.saturating_sub(1)).collect();
    clamped.push('…');
    clamped
}

/// Parse an ISO date (`2026-10-17`) or RFC 3339 timestamp. Bare dates are
/// taken as the end of that local day.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    end_of_local_day(date)
}

fn end_of_local_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    let end = date.and_time(NaiveTime::from_hms_opt(23, 59, 59)?);
    Local
        .from_local_datetime(&end)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Local tomorrow at 23:59:59, the default deadline bound for `chat_tasks`.
pub fn end_of_tomorrow() -> Option<DateTime<Utc>> {
    let tomorrow = Local::now().date_naive().checked_add_days(Days::new(1))?;
    end_of_local_day(tomorrow)
}

/// Deadlines may be RFC 3339 timestamps, epoch milliseconds or `YYYY-MM-DD`
/// strings. The filter DSL compares all three against the bound as time.
pub fn deadline_at_or_before(bound: DateTime<Utc>) -> Filter {
    Filter::lte("deadline", bound.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Selector for `chat_tasks`: optional project and status, deadline bound,
/// completed tasks excluded unless a status was requested.
pub fn tasks_selector(
    project_id: Option<&str>,
    status: Option<&str>,
    due_before: DateTime<Utc>,
) -> Filter {
    let mut filter = Filter::All;
    if let Some(project_id) = project_id {
        filter = filter.and(Filter::eq("projectId", project_id));
    }
    filter = match status {
        Some(status) => filter.and(Filter::eq("status", status)),
        None => filter.and(Filter::ne("status", DONE)),
    };
    filter.and(deadline_at_or_before(due_before))
}

pub fn overdue_selector(now: DateTime<Utc>) -> Filter {
    Filter::ne("status", DONE).and(deadline_at_or_before(now))
}

pub fn by_project_selector(project_id: &str) -> Filter {
    Filter::eq("projectId", project_id).and(Filter::ne("status", DONE))
}

/// Loose boolean flag as sent by models: `true`, `"true"`, `"1"`, `1`.
pub fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Default, Clone)]
pub struct TaskFilters<'a> {
    pub project_id: Option<&'a str>,
    pub status: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub important: Option<bool>,
    pub urgent: Option<bool>,
}

pub fn task_filter_selector(filters: &TaskFilters<'_>) -> Filter {
    let mut filter = Filter::All;
    if let Some(project_id) = filters.project_id {
        filter = filter.and(Filter::eq("projectId", project_id));
    }
    if let Some(status) = filters.status {
        filter = filter.and(Filter::eq("status", status));
    }
    if let Some(tag) = filters.tag {
        filter = filter.and(Filter::eq("tags", tag));
    }
    if let Some(important) = filters.important {
        filter = filter.and(Filter::eq("isImportant", important));
    }
    if let Some(urgent) = filters.urgent {
        filter = filter.and(Filter::eq("isUrgent", urgent));
    }
    filter
}

pub fn project_name_exact(name: &str) -> Filter {
    Filter::compare("name", CompareOp::EqIgnoreCase, name)
}

pub fn project_name_fuzzy(name: &str) -> Filter {
    Filter::compare("name", CompareOp::ContainsIgnoreCase, name)
}

// ── Generic where-DSL ────────────────────────────────────────────────

/// Fields a generic query may filter, select or sort on.
pub fn field_allowlist(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Tasks => &[
            "title",
            "status",
            "deadline",
            "projectId",
            "isUrgent",
            "isImportant",
            "tags",
            "createdAt",
            "updatedAt",
        ],
        Collection::Projects => &["name", "description", "createdAt", "updatedAt"],
        Collection::Notes => &["projectId", "title", "content", "createdAt", "updatedAt"],
        Collection::NoteSessions => &["projectId", "name", "createdAt", "updatedAt"],
        Collection::NoteLines => &["sessionId", "content", "createdAt", "updatedAt"],
        Collection::Links => &["projectId", "name", "url", "createdAt", "updatedAt"],
        Collection::People => &["name", "createdAt", "updatedAt"],
        Collection::Teams => &["name", "createdAt", "updatedAt"],
        Collection::Files => &["projectId", "name", "createdAt", "updatedAt"],
        Collection::Alarms => &["title", "enabled", "when", "createdAt", "updatedAt"],
        Collection::UserLogs => &["content", "createdAt"],
    }
}

pub fn is_allowed_field(collection: Collection, field: &str) -> bool {
    field_allowlist(collection).contains(&field)
}

/// Compile a where object into a [`Filter`].
///
/// Supported shapes: `{ field: value }` (equality), `{ field: { eq, ne, lt,
/// lte, gt, gte, in, nin } }`, and `{ and: [...] }` / `{ or: [...] }`.
/// Fields outside the allow-list are dropped.
pub fn compile_where(collection: Collection, node: &Value) -> Filter {
    let Value::Object(map) = node else {
        return Filter::All;
    };

    let mut filter = Filter::All;
    if let Some(Value::Array(children)) = map.get("and") {
        let parts = children.iter().map(|c| compile_where(collection, c)).collect();
        filter = filter.and(Filter::And(parts));
    }
    if let Some(Value::Array(children)) = map.get("or") {
        let parts = children.iter().map(|c| compile_where(collection, c)).collect();
        filter = filter.and(Filter::Or(parts));
    }

    for (field, value) in map {
        if field == "and" || field == "or" || !is_allowed_field(collection, field) {
            continue;
        }
        filter = filter.and(compile_field(field, value));
    }
    filter
}

fn compile_field(field: &str, value: &Value) -> Filter {
    let Value::Object(ops) = value else {
        return Filter::eq(field, value.clone());
    };

    let mut filter = Filter::All;
    for (key, op) in [
        ("eq", CompareOp::Eq),
        ("ne", CompareOp::Ne),
        ("lt", CompareOp::Lt),
        ("lte", CompareOp::Lte),
        ("gt", CompareOp::Gt),
        ("gte", CompareOp::Gte),
        ("in", CompareOp::In),
        ("nin", CompareOp::Nin),
    ] {
        let Some(operand) = ops.get(key) else {
            continue;
        };
        let operand = match (op, operand) {
            (CompareOp::In | CompareOp::Nin, Value::Array(_)) => operand.clone(),
            (CompareOp::In | CompareOp::Nin, single) => Value::Array(vec![single.clone()]),
            (_, other) => other.clone(),
        };
        filter = filter.and(Filter::compare(field, op, operand));
    }
    filter
}

/// Sort keys from `{ field: 1 | -1 }`, keeping allow-listed fields only.
pub fn compile_sort(collection: Collection, sort: &Map<String, Value>) -> Vec<(String, bool)> {
    sort.iter()
        .filter(|(field, _)| is_allowed_field(collection, field))
        .map(|(field, dir)| {
            let descending = dir.as_i64().is_some_and(|d| d < 0)
                || dir.as_str().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            (field.clone(), descending)
        })
        .collect()
}
