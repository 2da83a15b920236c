//! User repository contracts and SQLite implementation.
//!
//! # Invariants
//! - User names are unique; duplicates surface as `RepoError::Duplicate`.
//! - Deleting a user cascades to posts, comments, likes and auto-post state.

use crate::db::{format_timestamp, is_unique_violation};
use crate::model::user::{User, UserId};
use crate::repo::{
    bool_to_int, int_to_bool, parse_stored_timestamp, parse_uuid, RepoError, RepoResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, name, is_admin, created_at FROM users";

/// Repository interface for user accounts.
pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_user_by_name(&self, name: &str) -> RepoResult<Option<User>>;
    /// Lists users ordered by name.
    fn list_users(&self) -> RepoResult<Vec<User>>;
    fn delete_user(&self, id: UserId) -> RepoResult<()>;
    fn count_users(&self) -> RepoResult<u64>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        let inserted = self.conn.execute(
            "INSERT INTO users (id, name, is_admin, created_at) VALUES (?1, ?2, ?3, ?4);",
            params![
                user.id.to_string(),
                user.name.as_str(),
                bool_to_int(user.is_admin),
                format_timestamp(user.created_at),
            ],
        );

        match inserted {
            Ok(_) => Ok(user.id),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Duplicate {
                entity: "user",
                name: user.name.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_user_columns,
            )
            .optional()?
            .map(UserColumns::into_user)
            .transpose()
    }

    fn find_user_by_name(&self, name: &str) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE name = ?1;"),
                [name],
                read_user_columns,
            )
            .optional()?
            .map(UserColumns::into_user)
            .transpose()
    }

    fn list_users(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            users.push(read_user_columns(row)?.into_user()?);
        }
        Ok(users)
    }

    fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("user", id));
        }
        Ok(())
    }

    fn count_users(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

struct UserColumns {
    id: String,
    name: String,
    is_admin: i64,
    created_at: String,
}

impl UserColumns {
    fn into_user(self) -> RepoResult<User> {
        Ok(User {
            id: parse_uuid(&self.id, "users.id")?,
            name: self.name,
            is_admin: int_to_bool(self.is_admin, "users.is_admin")?,
            created_at: parse_stored_timestamp(&self.created_at, "users.created_at")?,
        })
    }
}

fn read_user_columns(row: &Row<'_>) -> rusqlite::Result<UserColumns> {
    Ok(UserColumns {
        id: row.get("id")?,
        name: row.get("name")?,
        is_admin: row.get("is_admin")?,
        created_at: row.get("created_at")?,
    })
}
