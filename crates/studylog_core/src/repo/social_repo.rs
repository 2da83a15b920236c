//! Comment and like persistence.
//!
//! # Invariants
//! - A user holds at most one like per post (`UNIQUE (post_id, user_id)`).
//! - Toggling a like and reading back the count happen in one transaction.
//! - Comments are listed oldest first.

use crate::db::format_timestamp;
use crate::model::post::{Comment, LikeAction, PostId};
use crate::model::user::UserId;
use crate::repo::{parse_stored_timestamp, parse_uuid, RepoError, RepoResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

/// Comment joined with its author's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author_name: String,
}

/// Repository interface for comments and likes.
pub trait SocialRepository {
    fn add_comment(&self, comment: &Comment) -> RepoResult<()>;
    fn list_comments(&self, post_id: PostId) -> RepoResult<Vec<CommentView>>;
    /// Adds the like when absent, removes it when present.
    ///
    /// Returns the applied action and the post's like count afterwards.
    fn toggle_like(
        &self,
        post_id: PostId,
        user_id: UserId,
        at: NaiveDateTime,
    ) -> RepoResult<(LikeAction, u64)>;
    fn like_count(&self, post_id: PostId) -> RepoResult<u64>;
}

/// SQLite-backed comment/like repository.
pub struct SqliteSocialRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSocialRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SocialRepository for SqliteSocialRepository<'_> {
    fn add_comment(&self, comment: &Comment) -> RepoResult<()> {
        if !post_exists(self.conn, comment.post_id)? {
            return Err(RepoError::not_found("post", comment.post_id));
        }

        self.conn.execute(
            "INSERT INTO comments (id, post_id, user_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                comment.id.to_string(),
                comment.post_id.to_string(),
                comment.user_id.to_string(),
                comment.content.as_str(),
                format_timestamp(comment.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_comments(&self, post_id: PostId) -> RepoResult<Vec<CommentView>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                m.id AS id,
                m.user_id AS user_id,
                m.content AS content,
                m.created_at AS created_at,
                u.name AS author_name
             FROM comments m
             INNER JOIN users u ON u.id = m.user_id
             WHERE m.post_id = ?1
             ORDER BY m.created_at ASC, m.rowid ASC;",
        )?;
        let mut rows = stmt.query([post_id.to_string()])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let user_id: String = row.get("user_id")?;
            let created_at: String = row.get("created_at")?;
            comments.push(CommentView {
                comment: Comment {
                    id: parse_uuid(&id, "comments.id")?,
                    post_id,
                    user_id: parse_uuid(&user_id, "comments.user_id")?,
                    content: row.get("content")?,
                    created_at: parse_stored_timestamp(&created_at, "comments.created_at")?,
                },
                author_name: row.get("author_name")?,
            });
        }
        Ok(comments)
    }

    fn toggle_like(
        &self,
        post_id: PostId,
        user_id: UserId,
        at: NaiveDateTime,
    ) -> RepoResult<(LikeAction, u64)> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !post_exists(&tx, post_id)? {
            return Err(RepoError::not_found("post", post_id));
        }

        let removed = tx.execute(
            "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2;",
            params![post_id.to_string(), user_id.to_string()],
        )?;
        let action = if removed > 0 {
            LikeAction::Unliked
        } else {
            tx.execute(
                "INSERT INTO likes (id, post_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4);",
                params![
                    Uuid::new_v4().to_string(),
                    post_id.to_string(),
                    user_id.to_string(),
                    format_timestamp(at),
                ],
            )?;
            LikeAction::Liked
        };

        let count = count_likes(&tx, post_id)?;
        tx.commit()?;
        Ok((action, count))
    }

    fn like_count(&self, post_id: PostId) -> RepoResult<u64> {
        count_likes(self.conn, post_id)
    }
}

fn post_exists(conn: &Connection, post_id: PostId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM study_posts WHERE id = ?1);",
        [post_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn count_likes(conn: &Connection, post_id: PostId) -> RepoResult<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE post_id = ?1;",
        [post_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}
