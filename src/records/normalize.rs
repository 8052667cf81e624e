//! Conversion of raw GitHub pull request objects into [`PullRequestRecord`]s.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde_json::{Map, Value};

use super::{Column, ColumnSet, NormalizedBatch, PullRequestRecord};

const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Raw keys that map onto optional columns. Other raw keys, `html_url` and
/// the change counters included, are not part of the table and are dropped.
const OPTIONAL_SOURCES: [(&str, Column); 8] = [
    ("number", Column::Number),
    ("repo_full_name", Column::RepoFullName),
    ("state", Column::State),
    ("locked", Column::Locked),
    ("created_at", Column::CreatedAt),
    ("updated_at", Column::UpdatedAt),
    ("closed_at", Column::ClosedAt),
    ("merged_at", Column::MergedAt),
];

/// Normalizes raw pull request objects into a batch.
///
/// Values that are not JSON objects are ignored, as are objects without an
/// integer `id`. The first occurrence of each id is kept; rows whose title is
/// missing or empty are then dropped. Malformed fields become nulls.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use pullhouse::records::normalize;
/// use serde_json::json;
///
/// let raw = vec![json!({
///     "id": 1,
///     "title": "Fix bug",
///     "created_at": "2024-01-01T00:00:00Z",
///     "merged_at": "2024-01-03T00:00:00Z"
/// })];
/// let batch = normalize(&raw, Utc::now());
/// assert_eq!(batch.rows().first().map(|row| row.merge_days), Some(2.0));
/// ```
#[must_use]
pub fn normalize(raw: &[Value], ingested_at: DateTime<Utc>) -> NormalizedBatch {
    let objects: Vec<&Map<String, Value>> = raw.iter().filter_map(Value::as_object).collect();
    let columns = present_columns(&objects);

    let mut seen = HashSet::new();
    let rows = objects
        .into_iter()
        .filter_map(|object| {
            let Some(id) = object.get("id").and_then(Value::as_i64) else {
                tracing::debug!("discarding pull request without an integer id");
                return None;
            };
            seen.insert(id).then_some((id, object))
        })
        .filter_map(|(id, object)| build_record(id, object, ingested_at))
        .collect();

    NormalizedBatch::new(columns, rows)
}

fn present_columns(objects: &[&Map<String, Value>]) -> ColumnSet {
    let mut columns = ColumnSet::default();
    for (key, column) in OPTIONAL_SOURCES {
        if objects.iter().any(|object| object.contains_key(key)) {
            columns.insert(column);
        }
    }
    columns
}

fn build_record(
    id: i64,
    object: &Map<String, Value>,
    ingested_at: DateTime<Utc>,
) -> Option<PullRequestRecord> {
    let title = string_field(object, "title").filter(|title| !title.is_empty())?;
    let created_at = timestamp_field(object, "created_at");
    let merged_at = timestamp_field(object, "merged_at");

    Some(PullRequestRecord {
        id,
        number: object.get("number").and_then(Value::as_i64),
        repo_full_name: string_field(object, "repo_full_name"),
        title,
        state: string_field(object, "state"),
        locked: object.get("locked").and_then(Value::as_bool),
        created_at,
        updated_at: timestamp_field(object, "updated_at"),
        closed_at: timestamp_field(object, "closed_at"),
        merged_at,
        author: author_login(object),
        merge_days: merge_days(id, created_at, merged_at),
        ingested_at,
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn author_login(object: &Map<String, Value>) -> Option<String> {
    object
        .get("user")
        .and_then(Value::as_object)
        .and_then(|user| user.get("login"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn timestamp_field(object: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    object.get(key).and_then(Value::as_str).and_then(parse_timestamp)
}

/// Parses RFC 3339 timestamps, falling back to offset-less forms read as UTC.
pub(crate) fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let trimmed = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

fn merge_days(id: i64, created_at: Option<DateTime<Utc>>, merged_at: Option<DateTime<Utc>>) -> f64 {
    let (Some(created), Some(merged)) = (created_at, merged_at) else {
        return 0.0;
    };

    let elapsed = merged.signed_duration_since(created);
    if elapsed < TimeDelta::zero() {
        tracing::warn!(
            "pull request {id} was merged before it was created ({merged} < {created}); \
             recording merge_days as 0"
        );
        return 0.0;
    }

    u32::try_from(elapsed.num_days()).map_or(0.0, f64::from)
}
