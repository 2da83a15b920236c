//! Statistics shapes produced by the aggregation core.
//!
//! # Responsibility
//! - Map the coarse window selector onto a window length and bucket format.
//! - Define the display-ready series and the raw grouped rows behind them.
//!
//! # Invariants
//! - Only the literal selector `"year"` selects the year window; every other
//!   value falls back to the month window.
//! - Bucket labels sort lexically in chronological order.
//! - `total_hours` is minutes / 60 rounded to one decimal, half away from zero.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

const MONTH_WINDOW_DAYS: i64 = 30;
const YEAR_WINDOW_DAYS: i64 = 365;

/// Time window and bucket granularity for one statistics request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsWindow {
    /// Last 30 days, bucketed by calendar day (`YYYY-MM-DD`).
    #[default]
    Month,
    /// Last 365 days, bucketed by calendar month (`YYYY-MM`).
    Year,
}

impl StatsWindow {
    /// Resolves a caller-supplied selector. Never fails.
    pub fn from_selector(selector: &str) -> Self {
        if selector == "year" {
            Self::Year
        } else {
            Self::Month
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    /// Window length in days.
    pub fn days(self) -> i64 {
        match self {
            Self::Month => MONTH_WINDOW_DAYS,
            Self::Year => YEAR_WINDOW_DAYS,
        }
    }

    /// `strftime` pattern producing this window's bucket labels.
    pub fn bucket_format(self) -> &'static str {
        match self {
            Self::Month => "%Y-%m-%d",
            Self::Year => "%Y-%m",
        }
    }

    /// Inclusive lower bound of the window relative to `now`.
    pub fn start_from(self, now: NaiveDateTime) -> NaiveDateTime {
        now - Duration::days(self.days())
    }
}

/// One grouped SQL row: a label and the summed minutes behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedMinutes {
    pub label: String,
    pub total_minutes: i64,
}

/// Time bucket entry of the bar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeBucket {
    pub label: String,
    pub total_hours: f64,
}

/// Category entry of the pie series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total_minutes: i64,
}

/// Ungrouped intermediate rows behind both series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatsRows {
    pub time: Vec<GroupedMinutes>,
    pub category: Vec<GroupedMinutes>,
}

/// Aggregated study time for one user and window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    pub window: StatsWindow,
    pub window_start: NaiveDateTime,
    /// Ascending by label; empty buckets are omitted.
    pub time_series: Vec<TimeBucket>,
    /// One entry per category with at least one matching detail.
    pub category_series: Vec<CategoryTotal>,
    pub raw_rows: RawStatsRows,
}

/// Parallel label/value arrays for chart widgets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub bar_labels: Vec<String>,
    pub bar_values: Vec<f64>,
    pub pie_labels: Vec<String>,
    pub pie_values: Vec<i64>,
}

impl StatsResult {
    /// Builds both series from the grouped rows.
    ///
    /// Time rows are re-sorted by label so ordering holds regardless of the
    /// query engine.
    pub fn from_grouped(
        window: StatsWindow,
        window_start: NaiveDateTime,
        mut time_rows: Vec<GroupedMinutes>,
        category_rows: Vec<GroupedMinutes>,
    ) -> Self {
        time_rows.sort_by(|left, right| left.label.cmp(&right.label));

        let time_series = time_rows
            .iter()
            .map(|row| TimeBucket {
                label: row.label.clone(),
                total_hours: minutes_to_hours(row.total_minutes),
            })
            .collect();
        let category_series = category_rows
            .iter()
            .map(|row| CategoryTotal {
                category: row.label.clone(),
                total_minutes: row.total_minutes,
            })
            .collect();

        Self {
            window,
            window_start,
            time_series,
            category_series,
            raw_rows: RawStatsRows {
                time: time_rows,
                category: category_rows,
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.time_series.is_empty() && self.category_series.is_empty()
    }

    /// Splits both series into label/value arrays.
    pub fn chart_data(&self) -> ChartData {
        ChartData {
            bar_labels: self.time_series.iter().map(|b| b.label.clone()).collect(),
            bar_values: self.time_series.iter().map(|b| b.total_hours).collect(),
            pie_labels: self
                .category_series
                .iter()
                .map(|c| c.category.clone())
                .collect(),
            pie_values: self
                .category_series
                .iter()
                .map(|c| c.total_minutes)
                .collect(),
        }
    }
}

/// Converts minutes to hours rounded to one decimal place.
///
/// Rounding is done on exact tenths (minutes / 6), half away from zero, so
/// results do not depend on binary floating point artifacts.
pub fn minutes_to_hours(total_minutes: i64) -> f64 {
    let magnitude = (total_minutes.unsigned_abs() + 3) / 6;
    let tenths = if total_minutes < 0 {
        -(magnitude as f64)
    } else {
        magnitude as f64
    };
    tenths / 10.0
}
