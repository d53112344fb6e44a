//! Backend-neutral filter DSL used by tools to describe read queries.
//!
//! Semantics follow document-store conventions: `Eq` against an array field
//! matches when the array contains the value, `Ne`/`Nin` match documents
//! where the field is absent, ordered comparisons never match absent fields.
//!
//! Date-like strings compare by time, not by text: RFC 3339 timestamps by
//! instant, numbers against a timestamp as epoch milliseconds, and a bare
//! `YYYY-MM-DD` against an instant by the instant's local calendar day.

use std::cmp::Ordering;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde_json::{Map, Number, Value};

pub type Document = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Nin,
    /// Case-insensitive string equality after trimming.
    EqIgnoreCase,
    /// Case-insensitive substring match.
    ContainsIgnoreCase,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    #[default]
    All,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
}

impl Filter {
    pub fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    /// Combine with another filter, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut left), Filter::And(right)) => {
                left.extend(right);
                Filter::And(left)
            }
            (Filter::And(mut left), f) => {
                left.push(f);
                Filter::And(left)
            }
            (f, Filter::And(mut right)) => {
                right.insert(0, f);
                Filter::And(right)
            }
            (left, right) => Filter::And(vec![left, right]),
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
            Filter::Compare { field, op, value } => {
                compare_field(doc.get(field.as_str()), *op, value)
            }
        }
    }
}

fn compare_field(actual: Option<&Value>, op: CompareOp, expected: &Value) -> bool {
    let actual = actual.filter(|v| !v.is_null());
    match op {
        CompareOp::Eq => actual.is_some_and(|v| loosely_equal(v, expected)),
        CompareOp::Ne => !actual.is_some_and(|v| loosely_equal(v, expected)),
        CompareOp::In => actual.is_some_and(|v| any_of(expected, |e| loosely_equal(v, e))),
        CompareOp::Nin => !actual.is_some_and(|v| any_of(expected, |e| loosely_equal(v, e))),
        CompareOp::Lt => ordered(actual, expected, |o| o == Ordering::Less),
        CompareOp::Lte => ordered(actual, expected, |o| o != Ordering::Greater),
        CompareOp::Gt => ordered(actual, expected, |o| o == Ordering::Greater),
        CompareOp::Gte => ordered(actual, expected, |o| o != Ordering::Less),
        CompareOp::EqIgnoreCase => text_match(actual, expected, |a, e| a == e),
        CompareOp::ContainsIgnoreCase => text_match(actual, expected, |a, e| a.contains(e)),
    }
}

fn any_of(expected: &Value, pred: impl Fn(&Value) -> bool) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(pred),
        single => pred(single),
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        _ => compare_values(actual, expected) == Some(Ordering::Equal),
    }
}

fn ordered(actual: Option<&Value>, expected: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|v| compare_values(v, expected))
        .is_some_and(accept)
}

fn text_match(actual: Option<&Value>, expected: &Value, pred: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.and_then(Value::as_str), expected.as_str()) {
        (Some(a), Some(e)) => {
            let e = e.trim().to_lowercase();
            !e.is_empty() && pred(&a.trim().to_lowercase(), &e)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Temporal {
    Instant(DateTime<Utc>),
    Day(NaiveDate),
}

impl Temporal {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(Temporal::Instant(ts.with_timezone(&Utc)));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .map(Temporal::Day)
    }

    fn from_epoch_millis(n: &Number) -> Option<Self> {
        let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
        Utc.timestamp_millis_opt(millis)
            .single()
            .map(Temporal::Instant)
    }

    fn local_day(instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&Local).date_naive()
    }

    fn cmp(self, other: Self) -> Ordering {
        match (self, other) {
            (Temporal::Instant(a), Temporal::Instant(b)) => a.cmp(&b),
            (Temporal::Day(a), Temporal::Day(b)) => a.cmp(&b),
            (Temporal::Instant(a), Temporal::Day(b)) => Self::local_day(a).cmp(&b),
            (Temporal::Day(a), Temporal::Instant(b)) => a.cmp(&Self::local_day(b)),
        }
    }

    /// Position on a single time axis; bare days sit at local midnight.
    fn sort_millis(self) -> f64 {
        match self {
            Temporal::Instant(ts) => ts.timestamp_millis() as f64,
            Temporal::Day(day) => day
                .and_hms_opt(0, 0, 0)
                .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
                .map(|ts| ts.timestamp_millis() as f64)
                .unwrap_or_default(),
        }
    }
}

/// Order between comparable JSON scalars, `None` when they are not
/// comparable. Two date-like strings, or a number and a date-like string,
/// compare as points in time; other strings compare lexicographically.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (Temporal::parse(x), Temporal::parse(y)) {
            (Some(left), Some(right)) => Some(left.cmp(right)),
            _ => Some(x.as_str().cmp(y.as_str())),
        },
        (Value::Number(x), Value::String(y)) => {
            Some(Temporal::from_epoch_millis(x)?.cmp(Temporal::parse(y)?))
        }
        (Value::String(x), Value::Number(y)) => {
            Some(Temporal::parse(x)?.cmp(Temporal::from_epoch_millis(y)?))
        }
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

#[derive(Debug, PartialEq)]
enum SortKey<'a> {
    Null,
    Bool(bool),
    /// Numbers and date-like strings share one axis (epoch ms for dates).
    Numeric(f64),
    Text(&'a str),
    Other,
}

impl<'a> SortKey<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Null => SortKey::Null,
            Value::Bool(b) => SortKey::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(SortKey::Other, SortKey::Numeric),
            Value::String(s) => match Temporal::parse(s) {
                Some(t) => SortKey::Numeric(t.sort_millis()),
                None => SortKey::Text(s),
            },
            _ => SortKey::Other,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Null => 0,
            SortKey::Bool(_) => 1,
            SortKey::Numeric(_) => 2,
            SortKey::Text(_) => 3,
            SortKey::Other => 4,
        }
    }
}

/// Total order used for sorting mixed documents.
pub fn sort_order(a: &Value, b: &Value) -> Ordering {
    let (left, right) = (SortKey::of(a), SortKey::of(b));
    match (&left, &right) {
        (SortKey::Bool(x), SortKey::Bool(y)) => x.cmp(y),
        (SortKey::Numeric(x), SortKey::Numeric(y)) => x.total_cmp(y),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        _ => left.rank().cmp(&right.rank()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn ne_matches_missing_fields() {
        let filter = Filter::ne("status", "done");
        assert!(filter.matches(&doc(json!({"title": "a"}))));
        assert!(filter.matches(&doc(json!({"status": "todo"}))));
        assert!(!filter.matches(&doc(json!({"status": "done"}))));
    }

    #[test]
    fn timestamps_compare_by_instant() {
        let filter = Filter::lte("deadline", "2026-10-17T23:59:59.000Z");
        assert!(filter.matches(&doc(json!({"deadline": "2026-10-17T23:59:59Z"}))));
        assert!(filter.matches(&doc(json!({"deadline": "2026-10-17T20:00:00-03:00"}))));
        // Earlier clock text, later instant.
        assert!(!filter.matches(&doc(json!({"deadline": "2026-10-17T23:00:00-05:00"}))));
        assert!(!filter.matches(&doc(json!({"deadline": "2026-10-18T00:00:00Z"}))));
        assert!(!filter.matches(&doc(json!({"deadline": null}))));
    }

    #[test]
    fn epoch_millis_compare_with_timestamps() {
        let filter = Filter::lte("deadline", "2026-10-17T23:59:59.000Z");
        // 2025-10-09T00:00:00Z
        assert!(filter.matches(&doc(json!({"deadline": 1_759_968_000_000_i64}))));
        // 2027-01-01T00:00:00Z
        assert!(!filter.matches(&doc(json!({"deadline": 1_798_761_600_000_i64}))));
        assert!(!filter.matches(&doc(json!({"deadline": "later"}))));
    }

    #[test]
    fn bare_dates_compare_by_local_day() {
        let noon = Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2026, 10, 17)
                    .unwrap()
                    .and_hms_opt(12, 0, 0)
                    .unwrap(),
            )
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
            .to_rfc3339();
        let bound = Filter::lte("deadline", noon.as_str());
        assert!(bound.matches(&doc(json!({"deadline": "2026-10-17"}))));
        assert!(bound.matches(&doc(json!({"deadline": "2026-10-16"}))));
        assert!(!bound.matches(&doc(json!({"deadline": "2026-10-18"}))));

        let range = Filter::And(vec![
            Filter::compare("deadline", CompareOp::Gte, "2026-10-01"),
            Filter::compare("deadline", CompareOp::Lt, "2026-11-01"),
        ]);
        assert!(range.matches(&doc(json!({"deadline": "2026-10-15"}))));
        assert!(range.matches(&doc(json!({"deadline": noon.as_str()}))));
        assert!(!range.matches(&doc(json!({"deadline": "2026-11-02"}))));
    }

    #[test]
    fn sort_order_places_dates_on_one_axis() {
        let mut values = vec![
            json!("zeta"),
            json!("2026-10-18T00:00:00Z"),
            json!(1_759_968_000_000_i64),
            json!(null),
            json!("2026-10-17T23:59:59+02:00"),
            json!("alpha"),
        ];
        values.sort_by(sort_order);
        assert_eq!(
            values,
            vec![
                json!(null),
                json!(1_759_968_000_000_i64),
                json!("2026-10-17T23:59:59+02:00"),
                json!("2026-10-18T00:00:00Z"),
                json!("alpha"),
                json!("zeta"),
            ]
        );
    }

    #[test]
    fn eq_on_array_field_checks_membership() {
        let filter = Filter::eq("tags", "home");
        assert!(filter.matches(&doc(json!({"tags": ["work", "home"]}))));
        assert!(!filter.matches(&doc(json!({"tags": ["work"]}))));
    }

    #[test]
    fn case_insensitive_name_matching() {
        let exact = Filter::compare("name", CompareOp::EqIgnoreCase, "website redesign ");
        let fuzzy = Filter::compare("name", CompareOp::ContainsIgnoreCase, "redesign");
        let project = doc(json!({"name": "Website Redesign"}));
        assert!(exact.matches(&project));
        assert!(fuzzy.matches(&project));
        assert!(!Filter::compare("name", CompareOp::ContainsIgnoreCase, "").matches(&project));
    }

    #[test]
    fn and_flattens_conjunctions() {
        let filter = Filter::eq("a", 1)
            .and(Filter::All)
            .and(Filter::eq("b", 2))
            .and(Filter::eq("c", 3));
        match filter {
            Filter::And(parts) => assert_eq!(parts.len(), 3),
            other => panic!("unexpected filter: {other:?}"),
        }
    }
}
