//! `SQLite` warehouse session backed by Diesel.
//!
//! Used for local runs and tests. Unlike Synapse, `SQLite` enforces the
//! primary key, so re-loading a row is rejected and reported as a duplicate.

use std::path::Path;

use diesel::Connection;
use diesel::QueryableByName;
use diesel::RunQueryDsl;
use diesel::query_builder::BoxedSqlQuery;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_query;
use diesel::sql_types::{BigInt, Bool, Double, Nullable, Text};
use diesel::sqlite::{Sqlite, SqliteConnection};

use crate::records::ColumnSet;

use super::error::{RowInsertError, WarehouseError};
use super::schema::Dialect;
use super::session::WarehouseSession;
use super::target::TableName;
use super::value::{RowValues, SqlValue};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

type BoxedQuery<'a> = BoxedSqlQuery<'a, Sqlite, diesel::query_builder::SqlQuery>;

/// Open `SQLite` connection.
pub struct SqliteSession {
    connection: SqliteConnection,
}

impl std::fmt::Debug for SqliteSession {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SqliteSession").finish_non_exhaustive()
    }
}

impl SqliteSession {
    /// Opens (creating if needed) the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WarehouseError::ConnectionFailed`] when the file cannot be
    /// opened.
    pub fn connect(path: &Path) -> Result<Self, WarehouseError> {
        let database_url = path.to_string_lossy();
        if database_url.trim().is_empty() {
            return Err(WarehouseError::ConnectionFailed {
                message: "SQLite database path must not be blank".to_owned(),
            });
        }

        let connection = SqliteConnection::establish(&database_url).map_err(|error| {
            WarehouseError::ConnectionFailed {
                message: error.to_string(),
            }
        })?;
        Ok(Self { connection })
    }

    fn bind_value<'a>(query: BoxedQuery<'a>, value: &SqlValue) -> BoxedQuery<'a> {
        match value {
            SqlValue::BigInt(number) => query.bind::<Nullable<BigInt>, _>(*number),
            SqlValue::Text(text) => query.bind::<Nullable<Text>, _>(text.clone()),
            SqlValue::Bool(flag) => query.bind::<Nullable<Bool>, _>(*flag),
            SqlValue::Float(number) => query.bind::<Nullable<Double>, _>(*number),
            SqlValue::Timestamp(timestamp) => query.bind::<Nullable<Text>, _>(
                timestamp.map(|value| value.format(TIMESTAMP_FORMAT).to_string()),
            ),
        }
    }
}

impl WarehouseSession for SqliteSession {
    fn ensure_table(&mut self, table: &TableName) -> Result<(), WarehouseError> {
        sql_query(Dialect::Sqlite.create_table_sql(table))
            .execute(&mut self.connection)
            .map(drop)
            .map_err(|error| WarehouseError::SchemaFailed {
                message: error.to_string(),
            })
    }

    fn insert_row(
        &mut self,
        table: &TableName,
        columns: &ColumnSet,
        row: &RowValues,
    ) -> Result<(), RowInsertError> {
        let statement = Dialect::Sqlite.insert_sql(table, columns);
        let query = row.values.iter().fold(
            sql_query(statement).into_boxed::<Sqlite>(),
            |query, (_, value)| Self::bind_value(query, value),
        );

        match query.execute(&mut self.connection) {
            Ok(_) => Ok(()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(RowInsertError::Duplicate)
            }
            Err(error) => Err(RowInsertError::Rejected {
                message: error.to_string(),
            }),
        }
    }

    fn count_rows(&mut self, table: &TableName) -> Result<u64, WarehouseError> {
        #[derive(Debug, QueryableByName)]
        struct Row {
            #[diesel(sql_type = BigInt)]
            count: i64,
        }

        let row: Row = sql_query(Dialect::Sqlite.count_sql(table))
            .get_result(&mut self.connection)
            .map_err(|error| WarehouseError::QueryFailed {
                message: error.to_string(),
            })?;

        Ok(u64::try_from(row.count).unwrap_or(0))
    }

    fn close(&mut self) -> Result<(), WarehouseError> {
        Ok(())
    }
}
