//! Fixed-shape pull request rows and the batches that carry them.
//!
//! Raw GitHub objects are heterogeneous: fields come and go between API
//! versions and not every listing returns every field. A
//! [`NormalizedBatch`] therefore records which [`Column`]s were actually seen
//! on input so that the warehouse only receives values that were present.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

mod normalize;

pub use normalize::normalize;

/// Columns of the destination table, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Column {
    /// Global pull request identifier.
    Id,
    /// Repository-scoped pull request number.
    Number,
    /// `owner/name` of the source repository.
    RepoFullName,
    /// Pull request title.
    Title,
    /// `open` or `closed`.
    State,
    /// Whether conversation is locked.
    Locked,
    /// Creation time.
    CreatedAt,
    /// Last update time.
    UpdatedAt,
    /// Close time.
    ClosedAt,
    /// Merge time.
    MergedAt,
    /// Login of the pull request author.
    Author,
    /// Whole days between creation and merge.
    MergeDays,
    /// Time the row was processed.
    IngestedAt,
}

impl Column {
    /// Every column in table order.
    pub const ALL: [Self; 13] = [
        Self::Id,
        Self::Number,
        Self::RepoFullName,
        Self::Title,
        Self::State,
        Self::Locked,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::ClosedAt,
        Self::MergedAt,
        Self::Author,
        Self::MergeDays,
        Self::IngestedAt,
    ];

    /// Columns present in every batch regardless of input.
    pub const ALWAYS_PRESENT: [Self; 5] = [
        Self::Id,
        Self::Title,
        Self::Author,
        Self::MergeDays,
        Self::IngestedAt,
    ];

    /// Returns the SQL column name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Number => "number",
            Self::RepoFullName => "repo_full_name",
            Self::Title => "title",
            Self::State => "state",
            Self::Locked => "locked",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::ClosedAt => "closed_at",
            Self::MergedAt => "merged_at",
            Self::Author => "author",
            Self::MergeDays => "merge_days",
            Self::IngestedAt => "ingested_at",
        }
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.name())
    }
}

/// Ordered set of columns carried by a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet(BTreeSet<Column>);

impl Default for ColumnSet {
    fn default() -> Self {
        Self(Column::ALWAYS_PRESENT.into_iter().collect())
    }
}

impl ColumnSet {
    /// Adds `column` to the set.
    pub fn insert(&mut self, column: Column) {
        self.0.insert(column);
    }

    /// Returns true when `column` is carried.
    #[must_use]
    pub fn contains(&self, column: Column) -> bool {
        self.0.contains(&column)
    }

    /// Iterates columns in table order.
    pub fn iter(&self) -> impl Iterator<Item = Column> + '_ {
        self.0.iter().copied()
    }

    /// Number of carried columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no columns are carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn union_with(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }
}

/// One normalized pull request row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullRequestRecord {
    /// Global pull request identifier.
    pub id: i64,
    /// Repository-scoped pull request number.
    pub number: Option<i64>,
    /// `owner/name` of the source repository.
    pub repo_full_name: Option<String>,
    /// Non-empty pull request title.
    pub title: String,
    /// `open` or `closed`.
    pub state: Option<String>,
    /// Whether conversation is locked.
    pub locked: Option<bool>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Close time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Merge time.
    pub merged_at: Option<DateTime<Utc>>,
    /// Author login.
    pub author: Option<String>,
    /// Whole days between `created_at` and `merged_at`; zero when unmerged.
    pub merge_days: f64,
    /// Processing time of the run that produced the row.
    pub ingested_at: DateTime<Utc>,
}

/// Rows plus the columns present on input.
///
/// Row ids are unique within a batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedBatch {
    columns: ColumnSet,
    rows: Vec<PullRequestRecord>,
}

impl NormalizedBatch {
    /// Builds a batch from already-unique rows.
    pub(crate) const fn new(columns: ColumnSet, rows: Vec<PullRequestRecord>) -> Self {
        Self { columns, rows }
    }

    /// Columns carried by this batch.
    #[must_use]
    pub const fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    /// Rows in input order.
    #[must_use]
    pub fn rows(&self) -> &[PullRequestRecord] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true when the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stamps every row with `full_name`, replacing any raw value.
    pub fn tag_repository(&mut self, full_name: &str) {
        self.columns.insert(Column::RepoFullName);
        for row in &mut self.rows {
            row.repo_full_name = Some(full_name.to_owned());
        }
    }

    /// Appends rows from `other` whose ids are not already present.
    ///
    /// The first occurrence of an id wins. Returns the number of rows from
    /// `other` that were dropped as duplicates.
    pub fn merge(&mut self, other: Self) -> usize {
        let mut seen: HashSet<i64> = self.rows.iter().map(|row| row.id).collect();
        self.columns.union_with(&other.columns);

        let incoming = other.rows.len();
        let before = self.rows.len();
        self.rows
            .extend(other.rows.into_iter().filter(|row| seen.insert(row.id)));
        let added = self.rows.len().saturating_sub(before);
        incoming.saturating_sub(added)
    }
}
