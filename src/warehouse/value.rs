//! Driver-neutral bind values.

use chrono::NaiveDateTime;

use crate::records::{Column, PullRequestRecord};

/// A nullable value bound to an insert parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// 64-bit integer.
    BigInt(Option<i64>),
    /// Text.
    Text(Option<String>),
    /// Boolean.
    Bool(Option<bool>),
    /// Double precision float.
    Float(Option<f64>),
    /// Timestamp without offset, always UTC.
    Timestamp(Option<NaiveDateTime>),
}

impl SqlValue {
    /// Extracts the value of `column` from `record`.
    #[must_use]
    pub fn of(record: &PullRequestRecord, column: Column) -> Self {
        match column {
            Column::Id => Self::BigInt(Some(record.id)),
            Column::Number => Self::BigInt(record.number),
            Column::RepoFullName => Self::Text(record.repo_full_name.clone()),
            Column::Title => Self::Text(Some(record.title.clone())),
            Column::State => Self::Text(record.state.clone()),
            Column::Author => Self::Text(record.author.clone()),
            Column::Locked => Self::Bool(record.locked),
            Column::CreatedAt => Self::Timestamp(record.created_at.map(|value| value.naive_utc())),
            Column::UpdatedAt => Self::Timestamp(record.updated_at.map(|value| value.naive_utc())),
            Column::ClosedAt => Self::Timestamp(record.closed_at.map(|value| value.naive_utc())),
            Column::MergedAt => Self::Timestamp(record.merged_at.map(|value| value.naive_utc())),
            Column::MergeDays => Self::Float(Some(record.merge_days)),
            Column::IngestedAt => Self::Timestamp(Some(record.ingested_at.naive_utc())),
        }
    }
}

/// A row ready for insertion: columns in table order with their values.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValues {
    /// Source row id, for logging.
    pub id: i64,
    /// Column and value pairs.
    pub values: Vec<(Column, SqlValue)>,
}

impl RowValues {
    /// Projects `record` onto `columns`.
    #[must_use]
    pub fn project(record: &PullRequestRecord, columns: impl Iterator<Item = Column>) -> Self {
        Self {
            id: record.id,
            values: columns
                .map(|column| (column, SqlValue::of(record, column)))
                .collect(),
        }
    }
}
