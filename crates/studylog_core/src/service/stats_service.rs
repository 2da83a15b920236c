//! Study time statistics aggregation.
//!
//! # Responsibility
//! - Resolve a window selector into a window start and bucket format.
//! - Run the two grouped queries (time buckets, categories) and shape them
//!   into display-ready series.
//!
//! # Invariants
//! - Read-only: no store mutation of any kind.
//! - Results are scoped to one user; an unknown user yields empty series.
//! - Either both grouped queries succeed or the call fails as a whole.
//! - Stored durations are summed as-is, negative values included.

use crate::model::stats::{StatsResult, StatsWindow};
use crate::model::user::UserId;
use crate::repo::stats_repo::{SqliteStatsRepository, StatsRepository};
use crate::repo::RepoError;
use crate::service::local_now;
use chrono::NaiveDateTime;
use log::{debug, error};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Failure of one aggregation call.
#[derive(Debug)]
pub enum StatsError {
    /// One of the grouped queries failed; no partial result is returned.
    Aggregation(RepoError),
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aggregation(err) => write!(f, "aggregation failed: {err}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Aggregation(err) => Some(err),
        }
    }
}

impl From<RepoError> for StatsError {
    fn from(value: RepoError) -> Self {
        Self::Aggregation(value)
    }
}

/// Stateless aggregator over a statistics repository.
pub struct StatsAggregator<R: StatsRepository> {
    repo: R,
}

impl<'conn> StatsAggregator<SqliteStatsRepository<'conn>> {
    /// Builds an aggregator reading from `conn`.
    pub fn sqlite(conn: &'conn Connection) -> Self {
        Self::new(SqliteStatsRepository::new(conn))
    }
}

impl<R: StatsRepository> StatsAggregator<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Computes statistics for `user_id` relative to the current local time.
    ///
    /// `window_selector` is `"year"` for the 365-day monthly view; any other
    /// value selects the 30-day daily view.
    pub fn compute_stats(
        &self,
        user_id: UserId,
        window_selector: &str,
    ) -> Result<StatsResult, StatsError> {
        self.compute_stats_at(
            user_id,
            StatsWindow::from_selector(window_selector),
            local_now(),
        )
    }

    /// Computes statistics for `user_id` with an explicit clock reading.
    pub fn compute_stats_at(
        &self,
        user_id: UserId,
        window: StatsWindow,
        now: NaiveDateTime,
    ) -> Result<StatsResult, StatsError> {
        let started_at = Instant::now();
        let window_start = window.start_from(now);

        let grouped = self
            .repo
            .minutes_by_bucket(user_id, window_start, window.bucket_format())
            .and_then(|time_rows| {
                self.repo
                    .minutes_by_category(user_id, window_start)
                    .map(|category_rows| (time_rows, category_rows))
            });

        let (time_rows, category_rows) = match grouped {
            Ok(rows) => rows,
            Err(err) => {
                error!(
                    "event=stats_compute module=stats status=error window={} duration_ms={} error={}",
                    window.as_str(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        let result = StatsResult::from_grouped(window, window_start, time_rows, category_rows);
        debug!(
            "event=stats_compute module=stats status=ok window={} buckets={} categories={} duration_ms={}",
            window.as_str(),
            result.time_series.len(),
            result.category_series.len(),
            started_at.elapsed().as_millis()
        );
        Ok(result)
    }
}
