use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use studylog_core::db::open_db_in_memory;
use studylog_core::model::stats::minutes_to_hours;
use studylog_core::{
    CategoryId, DetailDraft, PostDraft, SqliteAdminService, SqlitePostService, StatsAggregator,
    StatsWindow, UserId,
};

fn at(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn now() -> NaiveDateTime {
    at(2024, 3, 15, 12)
}

fn add_user(conn: &Connection, name: &str) -> UserId {
    SqliteAdminService::sqlite(conn).create_user(name).unwrap().id
}

fn add_category(conn: &Connection, name: &str) -> CategoryId {
    SqliteAdminService::sqlite(conn)
        .create_category(name)
        .unwrap()
        .id
}

fn add_post(
    conn: &Connection,
    user: UserId,
    created_at: NaiveDateTime,
    details: &[(CategoryId, i64)],
) {
    let draft = PostDraft {
        title: "study".to_string(),
        details: details
            .iter()
            .map(|&(category_id, duration_minutes)| DetailDraft {
                category_id,
                duration_minutes,
            })
            .collect(),
        ..PostDraft::default()
    };
    SqlitePostService::sqlite(conn)
        .create_post_at(user, draft, created_at)
        .unwrap();
}

fn category_pairs(result: &studylog_core::StatsResult) -> Vec<(String, i64)> {
    let mut pairs: Vec<(String, i64)> = result
        .category_series
        .iter()
        .map(|entry| (entry.category.clone(), entry.total_minutes))
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn single_post_yields_one_bucket_and_two_categories() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let cat1 = add_category(&conn, "cat1");
    let cat2 = add_category(&conn, "cat2");
    add_post(&conn, user, at(2024, 3, 1, 9), &[(cat1, 30), (cat2, 90)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].label, "2024-03-01");
    assert_eq!(result.time_series[0].total_hours, 2.0);
    assert_eq!(
        category_pairs(&result),
        vec![("cat1".to_string(), 30), ("cat2".to_string(), 90)]
    );
}

#[test]
fn user_without_posts_gets_empty_series_for_any_window() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let aggregator = StatsAggregator::sqlite(&conn);

    for window in [StatsWindow::Month, StatsWindow::Year] {
        let result = aggregator.compute_stats_at(user, window, now()).unwrap();
        assert!(result.time_series.is_empty());
        assert!(result.category_series.is_empty());
        assert!(result.is_empty());
    }
}

#[test]
fn same_day_posts_merge_into_one_bucket() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    add_post(&conn, user, at(2024, 3, 10, 8), &[(math, 45)]);
    add_post(&conn, user, at(2024, 3, 10, 20), &[(math, 75)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].total_hours, 2.0);
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 120)]);
}

#[test]
fn unknown_selector_behaves_like_month() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    add_post(&conn, user, at(2024, 3, 10, 8), &[(math, 45)]);
    add_post(&conn, user, at(2023, 12, 1, 8), &[(math, 60)]);

    let aggregator = StatsAggregator::sqlite(&conn);
    let unknown = aggregator
        .compute_stats_at(user, StatsWindow::from_selector("unknown_value"), now())
        .unwrap();
    let month = aggregator
        .compute_stats_at(user, StatsWindow::from_selector("month"), now())
        .unwrap();

    assert_eq!(unknown, month);
    assert_eq!(unknown.window, StatsWindow::Month);
    assert_eq!(unknown.time_series.len(), 1);
}

#[test]
fn compute_stats_with_selector_reads_current_clock() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    let today = studylog_core::service::local_now();
    add_post(&conn, user, today, &[(math, 90)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats(user, "unknown_value")
        .unwrap();

    assert_eq!(result.window, StatsWindow::Month);
    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].total_hours, 1.5);
}

#[test]
fn year_window_buckets_by_year_qualified_month() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    add_post(&conn, user, at(2024, 1, 5, 8), &[(math, 60)]);
    add_post(&conn, user, at(2023, 6, 10, 8), &[(math, 30)]);
    add_post(&conn, user, at(2023, 6, 20, 8), &[(math, 30)]);
    add_post(&conn, user, at(2022, 6, 20, 8), &[(math, 500)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Year, now())
        .unwrap();

    let labels: Vec<&str> = result
        .time_series
        .iter()
        .map(|bucket| bucket.label.as_str())
        .collect();
    assert_eq!(labels, vec!["2023-06", "2024-01"]);
    assert_eq!(result.time_series[0].total_hours, 1.0);
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 120)]);
}

#[test]
fn window_start_is_inclusive() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    let start = StatsWindow::Month.start_from(now());
    add_post(&conn, user, start, &[(math, 60)]);
    add_post(
        &conn,
        user,
        start - chrono::Duration::seconds(1),
        &[(math, 600)],
    );

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.window_start, start);
    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].label, "2024-02-14");
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 60)]);
}

#[test]
fn empty_buckets_are_omitted_and_labels_ascend() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    for day in [12, 3, 7] {
        add_post(&conn, user, at(2024, 3, day, 10), &[(math, 20)]);
    }

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    let labels: Vec<&str> = result
        .time_series
        .iter()
        .map(|bucket| bucket.label.as_str())
        .collect();
    assert_eq!(labels, vec!["2024-03-03", "2024-03-07", "2024-03-12"]);
    assert!(result
        .time_series
        .iter()
        .all(|bucket| bucket.total_hours != 0.0));
    assert!(labels.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[test]
fn hours_are_minutes_over_sixty_rounded_to_one_decimal() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    let minutes = [(1, 7), (2, 50), (3, 100), (4, 3), (5, 119)];
    for (day, total) in minutes {
        add_post(&conn, user, at(2024, 3, day, 10), &[(math, total)]);
    }

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.raw_rows.time.len(), minutes.len());
    for (bucket, raw) in result.time_series.iter().zip(&result.raw_rows.time) {
        assert_eq!(bucket.label, raw.label);
        assert_eq!(bucket.total_hours, minutes_to_hours(raw.total_minutes));
    }
    let hours: Vec<f64> = result
        .time_series
        .iter()
        .map(|bucket| bucket.total_hours)
        .collect();
    assert_eq!(hours, vec![0.1, 0.8, 1.7, 0.1, 2.0]);
}

#[test]
fn other_users_never_contribute() {
    let conn = open_db_in_memory().unwrap();
    let alice = add_user(&conn, "alice");
    let bob = add_user(&conn, "bob");
    let math = add_category(&conn, "math");
    let art = add_category(&conn, "art");
    add_post(&conn, alice, at(2024, 3, 10, 8), &[(math, 30)]);
    add_post(&conn, bob, at(2024, 3, 10, 9), &[(math, 300), (art, 60)]);
    add_post(&conn, bob, at(2024, 3, 11, 9), &[(art, 60)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(alice, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.time_series.len(), 1);
    assert_eq!(result.time_series[0].total_hours, 0.5);
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 30)]);
}

#[test]
fn unknown_user_yields_empty_result() {
    let conn = open_db_in_memory().unwrap();
    let alice = add_user(&conn, "alice");
    let math = add_category(&conn, "math");
    add_post(&conn, alice, at(2024, 3, 10, 8), &[(math, 30)]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(uuid::Uuid::new_v4(), StatsWindow::Month, now())
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn repeated_calls_are_identical() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    let art = add_category(&conn, "art");
    add_post(&conn, user, at(2024, 3, 2, 8), &[(math, 30), (art, 15)]);
    add_post(&conn, user, at(2024, 3, 9, 8), &[(art, 95)]);

    let aggregator = StatsAggregator::sqlite(&conn);
    let first = aggregator
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();
    let second = aggregator
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn aggregation_does_not_write() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    add_post(&conn, user, at(2024, 3, 2, 8), &[(math, 30)]);

    let before = row_counts(&conn);
    StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Year, now())
        .unwrap();
    assert_eq!(row_counts(&conn), before);
}

fn row_counts(conn: &Connection) -> (i64, i64, i64) {
    conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM study_posts),
            (SELECT COUNT(*) FROM study_details),
            (SELECT COUNT(*) FROM study_categories);",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )
    .unwrap()
}

#[test]
fn negative_stored_durations_are_summed_as_is() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    add_post(&conn, user, at(2024, 3, 5, 8), &[(math, 90)]);
    let post_id: String = conn
        .query_row("SELECT id FROM study_posts;", [], |row| row.get(0))
        .unwrap();
    conn.execute(
        "INSERT INTO study_details (id, post_id, category_id, duration_minutes, position)
         VALUES ('neg', ?1, ?2, -30, 1);",
        params![post_id, math.to_string()],
    )
    .unwrap();

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.time_series[0].total_hours, 1.0);
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 60)]);
}

#[test]
fn orphaned_details_count_in_time_series_only() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    let math = add_category(&conn, "math");
    let gone = add_category(&conn, "gone");
    add_post(&conn, user, at(2024, 3, 5, 8), &[(math, 30), (gone, 90)]);

    conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
    conn.execute(
        "DELETE FROM study_categories WHERE id = ?1;",
        [gone.to_string()],
    )
    .unwrap();
    conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();

    assert_eq!(result.time_series[0].total_hours, 2.0);
    assert_eq!(category_pairs(&result), vec![("math".to_string(), 30)]);
}

#[test]
fn posts_without_details_produce_no_buckets() {
    let conn = open_db_in_memory().unwrap();
    let user = add_user(&conn, "u");
    add_post(&conn, user, at(2024, 3, 5, 8), &[]);

    let result = StatsAggregator::sqlite(&conn)
        .compute_stats_at(user, StatsWindow::Month, now())
        .unwrap();
    assert!(result.is_empty());
}
