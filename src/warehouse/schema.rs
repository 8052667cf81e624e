//! SQL text for the destination table in each dialect.

use crate::records::{Column, ColumnSet};

use super::target::TableName;

/// SQL flavour spoken by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// T-SQL as accepted by a Synapse dedicated SQL pool.
    Synapse,
    /// `SQLite`.
    Sqlite,
}

impl Dialect {
    const fn column_type(self, column: Column) -> &'static str {
        match (self, column) {
            (_, Column::Id) => "BIGINT NOT NULL",
            (Self::Synapse, Column::Number) => "INT",
            (Self::Sqlite, Column::Number) => "INTEGER",
            (_, Column::RepoFullName | Column::Author) => "VARCHAR(255)",
            (Self::Synapse, Column::Title) => "NVARCHAR(MAX)",
            (Self::Sqlite, Column::Title) => "TEXT",
            (_, Column::State) => "VARCHAR(20)",
            (Self::Synapse, Column::Locked) => "BIT",
            (Self::Sqlite, Column::Locked) => "BOOLEAN",
            (
                Self::Synapse,
                Column::CreatedAt
                | Column::UpdatedAt
                | Column::ClosedAt
                | Column::MergedAt
                | Column::IngestedAt,
            ) => "DATETIME2",
            (
                Self::Sqlite,
                Column::CreatedAt
                | Column::UpdatedAt
                | Column::ClosedAt
                | Column::MergedAt
                | Column::IngestedAt,
            ) => "DATETIME",
            (Self::Synapse, Column::MergeDays) => "FLOAT",
            (Self::Sqlite, Column::MergeDays) => "DOUBLE",
        }
    }

    /// Idempotent create statement for `table`.
    ///
    /// Synapse declares an advisory primary key on a heap with round-robin
    /// distribution; `SQLite` enforces the key.
    #[must_use]
    pub fn create_table_sql(self, table: &TableName) -> String {
        let columns = Column::ALL
            .iter()
            .map(|column| format!("    {} {}", column.name(), self.column_type(*column)))
            .collect::<Vec<_>>()
            .join(",\n");

        match self {
            Self::Synapse => format!(
                "IF NOT EXISTS (SELECT * FROM sysobjects WHERE name = '{table}' AND xtype = 'U')\n\
                 CREATE TABLE {table} (\n\
                 {columns},\n    \
                 CONSTRAINT pk_{table} PRIMARY KEY NONCLUSTERED (id) NOT ENFORCED\n\
                 )\n\
                 WITH (HEAP, DISTRIBUTION = ROUND_ROBIN);"
            ),
            Self::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (\n\
                 {columns},\n    \
                 PRIMARY KEY (id)\n\
                 );"
            ),
        }
    }

    /// Parameterized insert for the carried `columns`.
    #[must_use]
    pub fn insert_sql(self, table: &TableName, columns: &ColumnSet) -> String {
        let names = columns
            .iter()
            .map(Column::name)
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=columns.len())
            .map(|position| match self {
                Self::Synapse => format!("@P{position}"),
                Self::Sqlite => "?".to_owned(),
            })
            .collect::<Vec<_>>()
            .join(", ");

        format!("INSERT INTO {table} ({names}) VALUES ({placeholders});")
    }

    /// Row count query aliased as `count`.
    #[must_use]
    pub fn count_sql(self, table: &TableName) -> String {
        match self {
            Self::Synapse => format!("SELECT COUNT_BIG(*) AS count FROM {table};"),
            Self::Sqlite => format!("SELECT COUNT(*) AS count FROM {table};"),
        }
    }
}
