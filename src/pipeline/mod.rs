//! One pipeline run: fetch each repository, normalize, merge, load once.

use chrono::{DateTime, TimeDelta, Utc};
use url::Url;

use crate::github::{PersonalAccessToken, PullRequestFetcher, RepositoryLocator};
use crate::records::{NormalizedBatch, normalize};
use crate::telemetry::{TelemetryEvent, TelemetrySink};
use crate::warehouse::{BatchLoader, LoadOutcome, WarehouseTarget};

/// GitHub access settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// REST API base URL.
    pub api_base: Url,
    /// Token sent as a bearer credential.
    pub token: PersonalAccessToken,
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// GitHub access.
    pub github: GitHubSettings,
    /// Repositories in `owner/name` form, processed in order.
    pub repositories: Vec<String>,
    /// Days before the run time to request updates from.
    pub lookback_days: u32,
    /// Where rows are loaded.
    pub warehouse: WarehouseTarget,
}

impl PipelineSettings {
    /// Lower bound on pull request update time for a run starting at `now`.
    #[must_use]
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        TimeDelta::try_days(i64::from(self.lookback_days))
            .and_then(|window| now.checked_sub_signed(window))
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Repositories fetched.
    pub repositories: usize,
    /// Configured names that were not valid `owner/name` identifiers.
    pub invalid_repositories: Vec<String>,
    /// Raw records returned across all repositories.
    pub fetched: usize,
    /// Rows handed to the loader after global deduplication.
    pub rows: usize,
    /// Load result, or `None` when there was nothing to load.
    pub load: Option<LoadOutcome>,
}

/// Orchestrates fetch, normalize and load for one run.
pub struct Pipeline<'a> {
    fetcher: &'a dyn PullRequestFetcher,
    loader: &'a dyn BatchLoader,
    telemetry: &'a dyn TelemetrySink,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over the given collaborators.
    #[must_use]
    pub const fn new(
        fetcher: &'a dyn PullRequestFetcher,
        loader: &'a dyn BatchLoader,
        telemetry: &'a dyn TelemetrySink,
    ) -> Self {
        Self {
            fetcher,
            loader,
            telemetry,
        }
    }

    /// Runs the pipeline once with `now` as the run time.
    ///
    /// Repositories are processed sequentially. Rows are deduplicated across
    /// repositories with the first occurrence winning, and the loader is
    /// called at most once. Nothing here fails the run: every problem is
    /// logged and reflected in the summary.
    pub fn run(&self, settings: &PipelineSettings, now: DateTime<Utc>) -> RunSummary {
        let since = settings.since(now);
        let mut combined = NormalizedBatch::default();
        let mut summary = RunSummary {
            repositories: 0,
            invalid_repositories: Vec::new(),
            fetched: 0,
            rows: 0,
            load: None,
        };

        for name in &settings.repositories {
            let locator = match RepositoryLocator::from_full_name(&settings.github.api_base, name) {
                Ok(locator) => locator,
                Err(error) => {
                    tracing::error!("{error}; skipping");
                    summary.invalid_repositories.push(name.clone());
                    continue;
                }
            };

            let batch = self.fetch_repository(&locator, since, now, &mut summary);
            let dropped = combined.merge(batch);
            if dropped > 0 {
                tracing::warn!(
                    "{dropped} pull requests from {} were already seen in an earlier repository",
                    locator.full_name()
                );
            }
        }

        summary.rows = combined.len();
        if combined.is_empty() {
            tracing::warn!("No new PRs fetched");
            self.telemetry.record(TelemetryEvent::LoadSkipped {
                reason: "no pull requests to load".to_owned(),
            });
            return summary;
        }

        tracing::info!("loading {} pull requests", combined.len());
        let outcome = self
            .loader
            .ensure_schema_and_append(&combined, &settings.warehouse);
        self.record_outcome(&outcome, settings);
        summary.load = Some(outcome);
        summary
    }

    fn fetch_repository(
        &self,
        locator: &RepositoryLocator,
        since: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        summary: &mut RunSummary,
    ) -> NormalizedBatch {
        let full_name = locator.full_name();
        tracing::info!("Fetching PRs for {full_name}");

        let raw = self.fetcher.fetch(locator, since);
        let mut batch = normalize(&raw, now);
        batch.tag_repository(&full_name);
        tracing::info!(
            "Fetched {} PRs from {full_name} ({} after normalization)",
            raw.len(),
            batch.len()
        );

        self.telemetry.record(TelemetryEvent::RepositoryFetched {
            repository: full_name,
            fetched: as_count(raw.len()),
            normalized: as_count(batch.len()),
        });
        summary.repositories = summary.repositories.saturating_add(1);
        summary.fetched = summary.fetched.saturating_add(raw.len());
        batch
    }

    fn record_outcome(&self, outcome: &LoadOutcome, settings: &PipelineSettings) {
        let event = match outcome {
            LoadOutcome::Completed(report) => TelemetryEvent::LoadCompleted {
                table: settings.warehouse.table().to_string(),
                attempted: as_count(report.attempted()),
                inserted: as_count(report.inserted()),
                duplicates: as_count(report.duplicates()),
                failed: as_count(report.failed()),
            },
            LoadOutcome::Skipped { reason } => TelemetryEvent::LoadSkipped {
                reason: reason.clone(),
            },
            LoadOutcome::Failed(error) => TelemetryEvent::LoadFailed {
                message: error.to_string(),
            },
        };
        self.telemetry.record(event);
    }
}

fn as_count(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
