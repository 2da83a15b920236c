//! Grouped read queries behind the statistics aggregator.
//!
//! # Responsibility
//! - Sum detail minutes per time bucket of the parent post's timestamp.
//! - Sum detail minutes per category name.
//!
//! # Invariants
//! - Both queries are scoped to one user and `created_at >= window_start`.
//! - Queries are read-only.
//! - The category query inner-joins categories, so orphaned details are
//!   excluded there while still counting toward time buckets.
//! - A NULL sum is read as zero.

use crate::db::format_timestamp;
use crate::model::stats::GroupedMinutes;
use crate::model::user::UserId;
use crate::repo::RepoResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

/// Read-only grouped queries used by `StatsAggregator`.
pub trait StatsRepository {
    /// Sums minutes per `strftime(bucket_format, post.created_at)` label,
    /// ascending by label.
    fn minutes_by_bucket(
        &self,
        user_id: UserId,
        window_start: NaiveDateTime,
        bucket_format: &str,
    ) -> RepoResult<Vec<GroupedMinutes>>;

    /// Sums minutes per category name, ascending by name.
    fn minutes_by_category(
        &self,
        user_id: UserId,
        window_start: NaiveDateTime,
    ) -> RepoResult<Vec<GroupedMinutes>>;
}

/// SQLite-backed statistics queries.
pub struct SqliteStatsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStatsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl StatsRepository for SqliteStatsRepository<'_> {
    fn minutes_by_bucket(
        &self,
        user_id: UserId,
        window_start: NaiveDateTime,
        bucket_format: &str,
    ) -> RepoResult<Vec<GroupedMinutes>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT
                strftime(?3, p.created_at) AS label,
                SUM(d.duration_minutes) AS total_minutes
             FROM study_details d
             INNER JOIN study_posts p ON p.id = d.post_id
             WHERE p.user_id = ?1
               AND p.created_at >= ?2
             GROUP BY label
             ORDER BY label ASC;",
        )?;
        let mut rows = stmt.query(params![
            user_id.to_string(),
            format_timestamp(window_start),
            bucket_format,
        ])?;
        collect_grouped(&mut rows)
    }

    fn minutes_by_category(
        &self,
        user_id: UserId,
        window_start: NaiveDateTime,
    ) -> RepoResult<Vec<GroupedMinutes>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT
                c.name AS label,
                SUM(d.duration_minutes) AS total_minutes
             FROM study_details d
             INNER JOIN study_posts p ON p.id = d.post_id
             INNER JOIN study_categories c ON c.id = d.category_id
             WHERE p.user_id = ?1
               AND p.created_at >= ?2
             GROUP BY c.name
             ORDER BY c.name ASC;",
        )?;
        let mut rows = stmt.query(params![user_id.to_string(), format_timestamp(window_start)])?;
        collect_grouped(&mut rows)
    }
}

fn collect_grouped(rows: &mut rusqlite::Rows<'_>) -> RepoResult<Vec<GroupedMinutes>> {
    let mut grouped = Vec::new();
    while let Some(row) = rows.next()? {
        grouped.push(parse_grouped_row(row)?);
    }
    Ok(grouped)
}

fn parse_grouped_row(row: &Row<'_>) -> rusqlite::Result<GroupedMinutes> {
    Ok(GroupedMinutes {
        label: row.get("label")?,
        total_minutes: row.get::<_, Option<i64>>("total_minutes")?.unwrap_or(0),
    })
}
