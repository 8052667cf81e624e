//! Tests for the batch loader.

type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

use chrono::Utc;
use diesel::{Connection, RunQueryDsl, SqliteConnection, sql_query};
use mockall::Sequence;
use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::{BatchLoader, LoadOutcome, RowOutcome, RowReport, WarehouseLoader};
use crate::records::{NormalizedBatch, normalize};
use crate::warehouse::driver::{CompiledDriverProbe, StaticDriverProbe, WarehouseDriver};
use crate::warehouse::error::{RowInsertError, WarehouseError};
use crate::warehouse::session::{
    DriverConnector, MockWarehouseConnector, MockWarehouseSession, WarehouseSession,
};
use crate::warehouse::target::{TableName, WarehouseTarget};

fn batch_of(ids: &[i64]) -> NormalizedBatch {
    let raw: Vec<_> = ids
        .iter()
        .map(|id| json!({ "id": id, "title": format!("PR {id}"), "state": "open" }))
        .collect();
    let mut batch = normalize(&raw, Utc::now());
    batch.tag_repository("octo/repo");
    batch
}

#[fixture]
fn sqlite_target() -> FixtureResult<(TempDir, WarehouseTarget)> {
    let temp_dir = TempDir::new()?;
    let target = WarehouseTarget::sqlite(
        temp_dir.path().join("warehouse.sqlite"),
        TableName::new("github_pull_requests")?,
    );
    Ok((temp_dir, target))
}

fn loader_with_session(session: MockWarehouseSession) -> WarehouseLoader {
    let mut connector = MockWarehouseConnector::new();
    let mut slot = Some(session);
    connector.expect_connect().times(1).returning(move |_| {
        slot.take()
            .map(|mock| Box::new(mock) as Box<dyn WarehouseSession>)
            .ok_or_else(|| WarehouseError::ConnectionFailed {
                message: "session already handed out".to_owned(),
            })
    });
    WarehouseLoader::new(
        Box::new(StaticDriverProbe::new(vec![WarehouseDriver::Sqlite])),
        Box::new(connector),
    )
}

#[rstest]
fn missing_driver_skips_without_connecting(sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(0);
    let loader = WarehouseLoader::new(Box::new(StaticDriverProbe::none()), Box::new(connector));

    let outcome = loader.ensure_schema_and_append(&batch_of(&[1]), &target);

    assert!(
        matches!(&outcome, LoadOutcome::Skipped { reason } if reason.contains("sqlite")),
        "expected a skipped load, got {outcome:?}"
    );
}

#[rstest]
fn connection_failure_is_reported_not_raised(
    sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>,
) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let mut connector = MockWarehouseConnector::new();
    connector.expect_connect().times(1).returning(|_| {
        Err(WarehouseError::ConnectionFailed {
            message: "login timeout".to_owned(),
        })
    });
    let loader = WarehouseLoader::new(Box::new(CompiledDriverProbe), Box::new(connector));

    let outcome = loader.ensure_schema_and_append(&batch_of(&[1]), &target);

    assert_eq!(
        outcome,
        LoadOutcome::Failed(WarehouseError::ConnectionFailed {
            message: "login timeout".to_owned(),
        })
    );
}

#[rstest]
fn reloading_a_batch_reports_duplicates(sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let loader = WarehouseLoader::new(Box::new(CompiledDriverProbe), Box::new(DriverConnector));

    let first = loader.ensure_schema_and_append(&batch_of(&[1, 2, 3]), &target);
    let second = loader.ensure_schema_and_append(&batch_of(&[3, 4]), &target);

    let LoadOutcome::Completed(first_report) = first else {
        panic!("first load should complete, got {first:?}");
    };
    let LoadOutcome::Completed(second_report) = second else {
        panic!("second load should complete, got {second:?}");
    };
    assert_eq!(first_report.inserted(), 3);
    assert_eq!(second_report.attempted(), 2);
    assert_eq!(
        second_report.rows(),
        [
            RowReport {
                id: 3,
                outcome: RowOutcome::DuplicateSkipped,
            },
            RowReport {
                id: 4,
                outcome: RowOutcome::Inserted,
            },
        ]
    );
    assert_eq!(loader.count_rows(&target), Ok(4));
}

#[rstest]
fn appends_into_a_table_created_by_an_earlier_job(
    sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>,
) {
    let (temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let path = temp_dir.path().join("warehouse.sqlite");
    let mut connection = SqliteConnection::establish(&path.to_string_lossy())
        .expect("sqlite database should open");
    sql_query(
        "CREATE TABLE github_pull_requests (\
         id BIGINT NOT NULL, number INT, repo_full_name VARCHAR(255), title TEXT, \
         state VARCHAR(20), locked BOOLEAN, created_at DATETIME, updated_at DATETIME, \
         closed_at DATETIME, merged_at DATETIME, author VARCHAR(255), merge_days DOUBLE, \
         ingested_at DATETIME, PRIMARY KEY (id));",
    )
    .execute(&mut connection)
    .expect("existing table should be created");
    let mut batch = normalize(
        &[json!({
            "id": 1,
            "number": 7,
            "title": "Add retries",
            "state": "closed",
            "html_url": "https://github.com/octo/repo/pull/7",
            "additions": null,
            "deletions": 4,
            "user": { "login": "octocat" }
        })],
        Utc::now(),
    );
    batch.tag_repository("octo/repo");
    let loader = WarehouseLoader::new(Box::new(CompiledDriverProbe), Box::new(DriverConnector));

    let outcome = loader.ensure_schema_and_append(&batch, &target);

    let LoadOutcome::Completed(report) = outcome else {
        panic!("load should complete, got {outcome:?}");
    };
    assert_eq!(report.inserted(), 1, "rows: {:?}", report.rows());
    assert_eq!(loader.count_rows(&target), Ok(1));
}

#[rstest]
fn schema_failure_aborts_before_inserts(sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let mut session = MockWarehouseSession::new();
    session.expect_ensure_table().times(1).returning(|_| {
        Err(WarehouseError::SchemaFailed {
            message: "permission denied".to_owned(),
        })
    });
    session.expect_insert_row().times(0);
    session.expect_close().times(1).returning(|| Ok(()));
    let loader = loader_with_session(session);

    let outcome = loader.ensure_schema_and_append(&batch_of(&[1]), &target);

    assert!(
        matches!(outcome, LoadOutcome::Failed(WarehouseError::SchemaFailed { .. })),
        "expected a schema failure, got {outcome:?}"
    );
}

#[rstest]
fn failed_row_does_not_stop_the_batch(sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let mut sequence = Sequence::new();
    let mut session = MockWarehouseSession::new();
    session
        .expect_ensure_table()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|_| Ok(()));
    session
        .expect_insert_row()
        .times(3)
        .in_sequence(&mut sequence)
        .returning(|_, _, row| {
            if row.id == 2 {
                Err(RowInsertError::Rejected {
                    message: "string or binary data would be truncated".to_owned(),
                })
            } else {
                Ok(())
            }
        });
    session
        .expect_close()
        .times(1)
        .in_sequence(&mut sequence)
        .returning(|| Ok(()));
    let loader = loader_with_session(session);

    let outcome = loader.ensure_schema_and_append(&batch_of(&[1, 2, 3]), &target);

    let LoadOutcome::Completed(report) = outcome else {
        panic!("load should complete, got {outcome:?}");
    };
    assert_eq!(report.attempted(), 3);
    assert_eq!(report.inserted(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        report.rows().get(1).map(|row| &row.outcome),
        Some(&RowOutcome::Failed(
            "string or binary data would be truncated".to_owned()
        ))
    );
}

#[rstest]
fn rows_after_a_rejected_row_are_still_written(
    sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>,
) {
    let (temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let loader = WarehouseLoader::new(Box::new(CompiledDriverProbe), Box::new(DriverConnector));
    loader.ensure_schema_and_append(&batch_of(&[]), &target);
    let mut connection =
        SqliteConnection::establish(&temp_dir.path().join("warehouse.sqlite").to_string_lossy())
            .expect("sqlite database should open");
    sql_query(
        "CREATE TRIGGER reject_two BEFORE INSERT ON github_pull_requests \
         WHEN NEW.id = 2 BEGIN SELECT RAISE(ABORT, 'row 2 rejected'); END;",
    )
    .execute(&mut connection)
    .expect("trigger should be created");

    let outcome = loader.ensure_schema_and_append(&batch_of(&[1, 2, 3]), &target);

    let LoadOutcome::Completed(report) = outcome else {
        panic!("load should complete, got {outcome:?}");
    };
    assert_eq!(report.inserted(), 2);
    assert!(matches!(
        report.rows().get(1).map(|row| &row.outcome),
        Some(RowOutcome::Failed(message)) if message.contains("row 2 rejected")
    ));
    assert_eq!(loader.count_rows(&target), Ok(2));
}

#[rstest]
fn count_rows_requires_a_driver(sqlite_target: FixtureResult<(TempDir, WarehouseTarget)>) {
    let (_temp_dir, target) = sqlite_target.expect("fixture should succeed");
    let loader = WarehouseLoader::new(
        Box::new(StaticDriverProbe::none()),
        Box::new(DriverConnector),
    );

    assert_eq!(
        loader.count_rows(&target),
        Err(WarehouseError::DriverUnavailable {
            driver: "sqlite".to_owned(),
        })
    );
}
