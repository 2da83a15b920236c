//! Persisted per-user auto-post flags.
//!
//! # Invariants
//! - One row per user at most; absence means disabled.
//! - Rows are removed together with their user.

use crate::db::format_timestamp;
use crate::model::user::{User, UserId};
use crate::repo::{int_to_bool, parse_stored_timestamp, parse_uuid, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

/// Auto-post flag of one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoPostStatus {
    pub user_id: UserId,
    pub user_name: String,
    pub enabled: bool,
}

/// Repository interface for auto-post flags.
pub trait AutoPostRepository {
    fn set_enabled(&self, user_id: UserId, enabled: bool, at: NaiveDateTime) -> RepoResult<()>;
    fn is_enabled(&self, user_id: UserId) -> RepoResult<bool>;
    /// Lists every user with their flag, ordered by user name.
    fn list_statuses(&self) -> RepoResult<Vec<AutoPostStatus>>;
    /// Lists users whose flag is enabled, ordered by user name.
    fn list_enabled_users(&self) -> RepoResult<Vec<User>>;
}

/// SQLite-backed auto-post repository.
pub struct SqliteAutoPostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAutoPostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AutoPostRepository for SqliteAutoPostRepository<'_> {
    fn set_enabled(&self, user_id: UserId, enabled: bool, at: NaiveDateTime) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO auto_post_settings (user_id, enabled, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                enabled = excluded.enabled,
                updated_at = excluded.updated_at;",
            params![user_id.to_string(), i64::from(enabled), format_timestamp(at)],
        )?;
        Ok(())
    }

    fn is_enabled(&self, user_id: UserId) -> RepoResult<bool> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT enabled FROM auto_post_settings WHERE user_id = ?1;",
                [user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(value) => int_to_bool(value, "auto_post_settings.enabled"),
            None => Ok(false),
        }
    }

    fn list_statuses(&self) -> RepoResult<Vec<AutoPostStatus>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id AS id, u.name AS name, COALESCE(s.enabled, 0) AS enabled
             FROM users u
             LEFT JOIN auto_post_settings s ON s.user_id = u.id
             ORDER BY u.name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut statuses = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            statuses.push(AutoPostStatus {
                user_id: parse_uuid(&id, "users.id")?,
                user_name: row.get("name")?,
                enabled: int_to_bool(row.get("enabled")?, "auto_post_settings.enabled")?,
            });
        }
        Ok(statuses)
    }

    fn list_enabled_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id AS id, u.name AS name, u.is_admin AS is_admin, u.created_at AS created_at
             FROM users u
             INNER JOIN auto_post_settings s ON s.user_id = u.id
             WHERE s.enabled = 1
             ORDER BY u.name ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let created_at: String = row.get("created_at")?;
            users.push(User {
                id: parse_uuid(&id, "users.id")?,
                name: row.get("name")?,
                is_admin: int_to_bool(row.get("is_admin")?, "users.is_admin")?,
                created_at: parse_stored_timestamp(&created_at, "users.created_at")?,
            });
        }
        Ok(users)
    }
}
