//! Output formatting utilities for CLI operations.

use std::io::{self, Write};

use pullhouse::warehouse::TableName;
use pullhouse::{IntakeError, LoadOutcome, RunSummary};

/// Writes a summary of a pipeline run to stdout.
pub fn write_run_summary(summary: &RunSummary, table: &TableName) -> Result<(), IntakeError> {
    let mut stdout = io::stdout().lock();
    write_run_summary_to(&mut stdout, summary, table)
}

/// Writes a summary of a pipeline run to the given writer.
pub fn write_run_summary_to<W: Write>(
    writer: &mut W,
    summary: &RunSummary,
    table: &TableName,
) -> Result<(), IntakeError> {
    writeln!(
        writer,
        "Fetched {} pull requests from {} repositories ({} rows after deduplication).",
        summary.fetched, summary.repositories, summary.rows
    )
    .map_err(|e| io_error(&e))?;

    if !summary.invalid_repositories.is_empty() {
        writeln!(
            writer,
            "Skipped invalid repositories: {}",
            summary.invalid_repositories.join(", ")
        )
        .map_err(|e| io_error(&e))?;
    }

    let load_line = match &summary.load {
        None => "Nothing to load.".to_owned(),
        Some(LoadOutcome::Skipped { reason }) => format!("Load skipped: {reason}"),
        Some(LoadOutcome::Failed(error)) => format!("Load failed: {error}"),
        Some(LoadOutcome::Completed(report)) => format!(
            "Loaded into {table}: {} inserted, {} duplicates skipped, {} failed.",
            report.inserted(),
            report.duplicates(),
            report.failed()
        ),
    };
    writeln!(writer, "{load_line}").map_err(|e| io_error(&e))
}

/// Writes the warehouse check result to the given writer.
pub fn write_row_count_to<W: Write>(
    writer: &mut W,
    count: u64,
    table: &TableName,
) -> Result<(), IntakeError> {
    writeln!(writer, "Fetched {count} rows from {table} table.").map_err(|e| io_error(&e))
}

pub(crate) fn io_error(error: &io::Error) -> IntakeError {
    IntakeError::Io {
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pullhouse::warehouse::{RowOutcome, RowReport, TableName, WarehouseError};
    use pullhouse::{LoadOutcome, LoadReport, RunSummary};

    use super::{write_row_count_to, write_run_summary_to};

    fn summary(load: Option<LoadOutcome>) -> RunSummary {
        RunSummary {
            repositories: 2,
            invalid_repositories: Vec::new(),
            fetched: 5,
            rows: 4,
            load,
        }
    }

    fn render(summary: &RunSummary) -> String {
        let table = TableName::new("github_pull_requests").expect("valid table");
        let mut buffer = Vec::new();
        write_run_summary_to(&mut buffer, summary, &table).expect("should write run summary");
        String::from_utf8(buffer).expect("output should be valid UTF-8")
    }

    #[test]
    fn completed_load_reports_row_counts() {
        let report: LoadReport = [
            (1, RowOutcome::Inserted),
            (2, RowOutcome::Inserted),
            (3, RowOutcome::DuplicateSkipped),
            (4, RowOutcome::Failed("truncated".to_owned())),
        ]
        .into_iter()
        .map(|(id, outcome)| RowReport { id, outcome })
        .collect();

        let output = render(&summary(Some(LoadOutcome::Completed(report))));

        assert!(
            output.contains("Fetched 5 pull requests from 2 repositories (4 rows after deduplication)."),
            "missing fetch line: {output}"
        );
        assert!(
            output.contains("Loaded into github_pull_requests: 2 inserted, 1 duplicates skipped, 1 failed."),
            "missing load line: {output}"
        );
    }

    #[test]
    fn missing_load_and_invalid_repositories_are_reported() {
        let mut run = summary(None);
        run.invalid_repositories = vec!["nope".to_owned(), "also/bad/name".to_owned()];

        let output = render(&run);

        assert!(
            output.contains("Skipped invalid repositories: nope, also/bad/name"),
            "missing invalid repositories: {output}"
        );
        assert!(output.contains("Nothing to load."), "missing load line: {output}");
    }

    #[test]
    fn failed_load_includes_the_error() {
        let output = render(&summary(Some(LoadOutcome::Failed(
            WarehouseError::ConnectionFailed {
                message: "login timeout".to_owned(),
            },
        ))));

        assert!(
            output.contains("Load failed: failed to connect to warehouse: login timeout"),
            "missing failure: {output}"
        );
    }

    #[test]
    fn row_count_line_names_the_table() {
        let table = TableName::new("github_pull_requests").expect("valid table");
        let mut buffer = Vec::new();

        write_row_count_to(&mut buffer, 42, &table).expect("should write row count");

        assert_eq!(
            String::from_utf8(buffer).expect("output should be valid UTF-8"),
            "Fetched 42 rows from github_pull_requests table.\n"
        );
    }
}
