//! Study post repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist a post together with its details and references atomically.
//! - Provide list/detail read models for the index, per-user list, post page
//!   and reference dashboard.
//!
//! # Invariants
//! - Insert/replace run in one immediate transaction; `insert_posts` uses a
//!   single transaction for the whole batch.
//! - Child rows are fully replaced, never merged.
//! - Every detail/reference category id must exist at write time.
//! - Post lists are ordered newest first.

use crate::db::format_timestamp;
use crate::model::category::CategoryId;
use crate::model::post::{PostId, PostRecord, Reference, StudyDetail, StudyPost};
use crate::model::user::UserId;
use crate::repo::{
    parse_optional_uuid, parse_stored_timestamp, parse_uuid, RepoError, RepoResult,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use serde::Serialize;

/// Post row plus aggregate counters for list pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostSummary {
    pub post: StudyPost,
    pub author_name: String,
    pub total_minutes: i64,
    pub like_count: u64,
    pub comment_count: u64,
}

/// Detail row joined with its category name.
///
/// `category_name` is `None` for orphaned details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailView {
    pub detail: StudyDetail,
    pub category_name: Option<String>,
}

/// Reference row joined with its category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceView {
    pub reference: Reference,
    pub category_name: Option<String>,
}

/// Reference dashboard filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReferenceFilter {
    pub category_id: Option<CategoryId>,
    /// Keeps references rated at least this value.
    pub min_rating: Option<u8>,
}

/// Repository interface for study posts and their child rows.
pub trait PostRepository {
    fn insert_post(&self, record: &PostRecord) -> RepoResult<PostId>;
    /// Inserts every record in one transaction; nothing is kept on failure.
    fn insert_posts(&self, records: &[PostRecord]) -> RepoResult<Vec<PostId>>;
    /// Replaces title/content and all child rows of an existing post.
    fn replace_post(&self, record: &PostRecord) -> RepoResult<()>;
    fn delete_post(&self, id: PostId) -> RepoResult<()>;
    fn get_post(&self, id: PostId) -> RepoResult<Option<StudyPost>>;
    fn list_details(&self, post_id: PostId) -> RepoResult<Vec<DetailView>>;
    fn list_post_references(&self, post_id: PostId) -> RepoResult<Vec<ReferenceView>>;
    /// Lists posts newest first, optionally restricted to one author.
    fn list_posts(&self, author: Option<UserId>) -> RepoResult<Vec<PostSummary>>;
    fn list_references(&self, filter: &ReferenceFilter) -> RepoResult<Vec<ReferenceView>>;
    fn count_posts(&self) -> RepoResult<u64>;
}

/// SQLite-backed post repository.
pub struct SqlitePostRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePostRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

const REFERENCE_SELECT_SQL: &str = "SELECT
    r.id AS id,
    r.post_id AS post_id,
    r.category_id AS category_id,
    r.title AS title,
    r.url AS url,
    r.rating AS rating,
    c.name AS category_name
FROM study_references r
LEFT JOIN study_categories c ON c.id = r.category_id";

impl PostRepository for SqlitePostRepository<'_> {
    fn insert_post(&self, record: &PostRecord) -> RepoResult<PostId> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let post_id = insert_record(&tx, record)?;
        tx.commit()?;
        Ok(post_id)
    }

    fn insert_posts(&self, records: &[PostRecord]) -> RepoResult<Vec<PostId>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut post_ids = Vec::with_capacity(records.len());
        for record in records {
            post_ids.push(insert_record(&tx, record)?);
        }
        tx.commit()?;
        Ok(post_ids)
    }

    fn replace_post(&self, record: &PostRecord) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_categories_exist(&tx, record)?;

        let post = &record.post;
        let changed = tx.execute(
            "UPDATE study_posts SET title = ?2, content = ?3 WHERE id = ?1;",
            params![
                post.id.to_string(),
                post.title.as_str(),
                post.content.as_deref()
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("post", post.id));
        }

        let post_id = post.id.to_string();
        tx.execute("DELETE FROM study_details WHERE post_id = ?1;", [&post_id])?;
        tx.execute("DELETE FROM study_references WHERE post_id = ?1;", [&post_id])?;
        insert_children(&tx, record)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_post(&self, id: PostId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM study_posts WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::not_found("post", id));
        }
        Ok(())
    }

    fn get_post(&self, id: PostId) -> RepoResult<Option<StudyPost>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, title, content, created_at
             FROM study_posts
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_post_row(row)?));
        }
        Ok(None)
    }

    fn list_details(&self, post_id: PostId) -> RepoResult<Vec<DetailView>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                d.id AS id,
                d.category_id AS category_id,
                d.duration_minutes AS duration_minutes,
                c.name AS category_name
             FROM study_details d
             LEFT JOIN study_categories c ON c.id = d.category_id
             WHERE d.post_id = ?1
             ORDER BY d.position ASC, d.rowid ASC;",
        )?;
        let mut rows = stmt.query([post_id.to_string()])?;
        let mut details = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            let category_id: String = row.get("category_id")?;
            details.push(DetailView {
                detail: StudyDetail {
                    id: parse_uuid(&id, "study_details.id")?,
                    post_id,
                    category_id: parse_uuid(&category_id, "study_details.category_id")?,
                    duration_minutes: row.get("duration_minutes")?,
                },
                category_name: row.get("category_name")?,
            });
        }
        Ok(details)
    }

    fn list_post_references(&self, post_id: PostId) -> RepoResult<Vec<ReferenceView>> {
        let mut stmt = self.conn.prepare(&format!(
            "{REFERENCE_SELECT_SQL}
             WHERE r.post_id = ?1
             ORDER BY r.position ASC, r.rowid ASC;"
        ))?;
        let mut rows = stmt.query([post_id.to_string()])?;
        let mut references = Vec::new();
        while let Some(row) = rows.next()? {
            references.push(parse_reference_row(row)?);
        }
        Ok(references)
    }

    fn list_posts(&self, author: Option<UserId>) -> RepoResult<Vec<PostSummary>> {
        let mut sql = String::from(
            "SELECT
                p.id AS id,
                p.user_id AS user_id,
                p.title AS title,
                p.content AS content,
                p.created_at AS created_at,
                u.name AS author_name,
                (SELECT COALESCE(SUM(d.duration_minutes), 0)
                   FROM study_details d WHERE d.post_id = p.id) AS total_minutes,
                (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count,
                (SELECT COUNT(*) FROM comments m WHERE m.post_id = p.id) AS comment_count
             FROM study_posts p
             INNER JOIN users u ON u.id = p.user_id",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(user_id) = author {
            sql.push_str(" WHERE p.user_id = ?");
            bind_values.push(Value::Text(user_id.to_string()));
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(PostSummary {
                post: parse_post_row(row)?,
                author_name: row.get("author_name")?,
                total_minutes: row.get("total_minutes")?,
                like_count: non_negative_count(row.get("like_count")?),
                comment_count: non_negative_count(row.get("comment_count")?),
            });
        }
        Ok(posts)
    }

    fn list_references(&self, filter: &ReferenceFilter) -> RepoResult<Vec<ReferenceView>> {
        let mut sql = format!("{REFERENCE_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(category_id) = filter.category_id {
            sql.push_str(" AND r.category_id = ?");
            bind_values.push(Value::Text(category_id.to_string()));
        }
        if let Some(min_rating) = filter.min_rating {
            sql.push_str(" AND r.rating >= ?");
            bind_values.push(Value::Integer(i64::from(min_rating)));
        }
        sql.push_str(" ORDER BY r.rating DESC, r.title ASC, r.rowid ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut references = Vec::new();
        while let Some(row) = rows.next()? {
            references.push(parse_reference_row(row)?);
        }
        Ok(references)
    }

    fn count_posts(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM study_posts;", [], |row| row.get(0))?;
        Ok(non_negative_count(count))
    }
}

fn insert_record(tx: &Transaction<'_>, record: &PostRecord) -> RepoResult<PostId> {
    ensure_categories_exist(tx, record)?;

    let post = &record.post;
    tx.execute(
        "INSERT INTO study_posts (id, user_id, title, content, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            post.id.to_string(),
            post.user_id.to_string(),
            post.title.as_str(),
            post.content.as_deref(),
            format_timestamp(post.created_at),
        ],
    )?;
    insert_children(tx, record)?;
    Ok(post.id)
}

fn ensure_categories_exist(tx: &Transaction<'_>, record: &PostRecord) -> RepoResult<()> {
    let detail_ids = record.details.iter().map(|detail| detail.category_id);
    let reference_ids = record
        .references
        .iter()
        .filter_map(|reference| reference.category_id);

    for category_id in detail_ids.chain(reference_ids) {
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM study_categories WHERE id = ?1);",
            [category_id.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("category", category_id));
        }
    }
    Ok(())
}

fn insert_children(tx: &Transaction<'_>, record: &PostRecord) -> RepoResult<()> {
    let post_id = record.post.id.to_string();

    for (position, detail) in record.details.iter().enumerate() {
        tx.execute(
            "INSERT INTO study_details (id, post_id, category_id, duration_minutes, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                detail.id.to_string(),
                post_id.as_str(),
                detail.category_id.to_string(),
                detail.duration_minutes,
                position as i64,
            ],
        )?;
    }

    for (position, reference) in record.references.iter().enumerate() {
        tx.execute(
            "INSERT INTO study_references (id, post_id, category_id, title, url, rating, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                reference.id.to_string(),
                post_id.as_str(),
                reference.category_id.map(|id| id.to_string()),
                reference.title.as_str(),
                reference.url.as_deref(),
                i64::from(reference.rating),
                position as i64,
            ],
        )?;
    }

    Ok(())
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<StudyPost> {
    let id: String = row.get("id")?;
    let user_id: String = row.get("user_id")?;
    let created_at: String = row.get("created_at")?;
    Ok(StudyPost {
        id: parse_uuid(&id, "study_posts.id")?,
        user_id: parse_uuid(&user_id, "study_posts.user_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        created_at: parse_stored_timestamp(&created_at, "study_posts.created_at")?,
    })
}

fn parse_reference_row(row: &Row<'_>) -> RepoResult<ReferenceView> {
    let id: String = row.get("id")?;
    let post_id: String = row.get("post_id")?;
    let rating: i64 = row.get("rating")?;
    let rating = u8::try_from(rating).map_err(|_| {
        RepoError::InvalidData(format!("invalid rating `{rating}` in study_references.rating"))
    })?;

    Ok(ReferenceView {
        reference: Reference {
            id: parse_uuid(&id, "study_references.id")?,
            post_id: parse_uuid(&post_id, "study_references.post_id")?,
            category_id: parse_optional_uuid(
                row.get("category_id")?,
                "study_references.category_id",
            )?,
            title: row.get("title")?,
            url: row.get("url")?,
            rating,
        },
        category_name: row.get("category_name")?,
    })
}

fn non_negative_count(value: i64) -> u64 {
    value.max(0) as u64
}
