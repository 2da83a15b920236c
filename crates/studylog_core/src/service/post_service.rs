//! Study post use-case service.
//!
//! # Responsibility
//! - Create, replace and delete posts with their details and references.
//! - Serve index/user/post-page read models and the reference dashboard.
//! - Comment and like flows.
//!
//! # Invariants
//! - Only the author may update or delete a post.
//! - Updates fully replace details and references.
//! - New posts are stamped with local time truncated to the minute unless the
//!   caller supplies a timestamp.

use crate::model::post::{normalize_comment, Comment, LikeAction, PostDraft, PostId, StudyPost};
use crate::model::user::UserId;
use crate::model::ValidationError;
use crate::repo::post_repo::{
    DetailView, PostRepository, PostSummary, ReferenceFilter, ReferenceView, SqlitePostRepository,
};
use crate::repo::social_repo::{CommentView, SocialRepository, SqliteSocialRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use crate::service::{local_now, truncate_to_minute};
use chrono::NaiveDateTime;
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const PREVIEW_MAX_CHARS: usize = 80;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for post use-cases.
#[derive(Debug)]
pub enum PostServiceError {
    Validation(ValidationError),
    NotFound { entity: &'static str, key: String },
    /// Actor is not the author of the post.
    Forbidden { post_id: PostId, actor: UserId },
    Repo(RepoError),
}

impl Display for PostServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Forbidden { post_id, actor } => {
                write!(f, "user {actor} may not modify post {post_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PostServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PostServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound { entity, key } => Self::NotFound { entity, key },
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for PostServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// List item for the index and per-user pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostListItem {
    #[serde(flatten)]
    pub summary: PostSummary,
    /// Whitespace-collapsed, truncated content.
    pub preview_text: Option<String>,
}

/// Everything the post page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub post: StudyPost,
    pub author_name: String,
    pub details: Vec<DetailView>,
    pub references: Vec<ReferenceView>,
    pub comments: Vec<CommentView>,
    pub like_count: u64,
    pub total_minutes: i64,
}

/// Post service facade over repository implementations.
pub struct PostService<P, S, U>
where
    P: PostRepository,
    S: SocialRepository,
    U: UserRepository,
{
    posts: P,
    social: S,
    users: U,
}

pub type SqlitePostService<'conn> = PostService<
    SqlitePostRepository<'conn>,
    SqliteSocialRepository<'conn>,
    SqliteUserRepository<'conn>,
>;

impl<'conn> SqlitePostService<'conn> {
    /// Builds the service over SQLite repositories sharing `conn`.
    pub fn sqlite(conn: &'conn Connection) -> Self {
        Self::new(
            SqlitePostRepository::new(conn),
            SqliteSocialRepository::new(conn),
            SqliteUserRepository::new(conn),
        )
    }
}

impl<P, S, U> PostService<P, S, U>
where
    P: PostRepository,
    S: SocialRepository,
    U: UserRepository,
{
    pub fn new(posts: P, social: S, users: U) -> Self {
        Self {
            posts,
            social,
            users,
        }
    }

    /// Creates a post stamped with the current minute.
    pub fn create_post(&self, author: UserId, draft: PostDraft) -> Result<PostId, PostServiceError> {
        self.create_post_at(author, draft, truncate_to_minute(local_now()))
    }

    /// Creates a post with an explicit creation timestamp.
    pub fn create_post_at(
        &self,
        author: UserId,
        draft: PostDraft,
        created_at: NaiveDateTime,
    ) -> Result<PostId, PostServiceError> {
        self.require_user(author)?;
        let record = draft.into_record(Uuid::new_v4(), author, created_at)?;
        let post_id = self.posts.insert_post(&record)?;
        info!(
            "event=post_create module=post status=ok details={} references={}",
            record.details.len(),
            record.references.len()
        );
        Ok(post_id)
    }

    /// Replaces title, content, details and references of an owned post.
    pub fn update_post(
        &self,
        actor: UserId,
        post_id: PostId,
        draft: PostDraft,
    ) -> Result<(), PostServiceError> {
        let existing = self.require_owned_post(actor, post_id)?;
        let record = draft.into_record(post_id, existing.user_id, existing.created_at)?;
        self.posts.replace_post(&record)?;
        info!("event=post_update module=post status=ok");
        Ok(())
    }

    /// Deletes an owned post together with its child rows.
    pub fn delete_post(&self, actor: UserId, post_id: PostId) -> Result<(), PostServiceError> {
        self.require_owned_post(actor, post_id)?;
        self.posts.delete_post(post_id)?;
        info!("event=post_delete module=post status=ok");
        Ok(())
    }

    /// Loads the full post page model.
    pub fn get_post(&self, post_id: PostId) -> Result<PostView, PostServiceError> {
        let post = self.require_post(post_id)?;
        let author_name = self
            .users
            .get_user(post.user_id)?
            .map(|user| user.name)
            .ok_or_else(|| PostServiceError::NotFound {
                entity: "user",
                key: post.user_id.to_string(),
            })?;
        let details = self.posts.list_details(post_id)?;
        let total_minutes = details
            .iter()
            .map(|view| view.detail.duration_minutes)
            .sum();

        Ok(PostView {
            author_name,
            references: self.posts.list_post_references(post_id)?,
            comments: self.social.list_comments(post_id)?,
            like_count: self.social.like_count(post_id)?,
            total_minutes,
            details,
            post,
        })
    }

    /// Lists every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostListItem>, PostServiceError> {
        Ok(self
            .posts
            .list_posts(None)?
            .into_iter()
            .map(to_list_item)
            .collect())
    }

    /// Lists posts of the named user, newest first.
    pub fn list_posts_by_user(
        &self,
        user_name: &str,
    ) -> Result<Vec<PostListItem>, PostServiceError> {
        let user = self
            .users
            .find_user_by_name(user_name.trim())?
            .ok_or_else(|| PostServiceError::NotFound {
                entity: "user",
                key: user_name.to_string(),
            })?;
        Ok(self
            .posts
            .list_posts(Some(user.id))?
            .into_iter()
            .map(to_list_item)
            .collect())
    }

    /// Lists references for the dashboard.
    pub fn list_references(
        &self,
        filter: &ReferenceFilter,
    ) -> Result<Vec<ReferenceView>, PostServiceError> {
        Ok(self.posts.list_references(filter)?)
    }

    /// Adds a comment by `actor` to a post.
    pub fn add_comment(
        &self,
        actor: UserId,
        post_id: PostId,
        content: &str,
    ) -> Result<Comment, PostServiceError> {
        let content = normalize_comment(content)?;
        self.require_user(actor)?;
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id: actor,
            content,
            created_at: local_now(),
        };
        self.social.add_comment(&comment)?;
        info!("event=comment_create module=post status=ok");
        Ok(comment)
    }

    /// Likes or unlikes a post on behalf of `actor`.
    pub fn toggle_like(
        &self,
        actor: UserId,
        post_id: PostId,
    ) -> Result<(LikeAction, u64), PostServiceError> {
        self.require_user(actor)?;
        let (action, count) = self.social.toggle_like(post_id, actor, local_now())?;
        info!(
            "event=like_toggle module=post status=ok action={:?} like_count={}",
            action, count
        );
        Ok((action, count))
    }

    fn require_user(&self, user_id: UserId) -> Result<(), PostServiceError> {
        match self.users.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(PostServiceError::NotFound {
                entity: "user",
                key: user_id.to_string(),
            }),
        }
    }

    fn require_post(&self, post_id: PostId) -> Result<StudyPost, PostServiceError> {
        self.posts
            .get_post(post_id)?
            .ok_or_else(|| PostServiceError::NotFound {
                entity: "post",
                key: post_id.to_string(),
            })
    }

    fn require_owned_post(
        &self,
        actor: UserId,
        post_id: PostId,
    ) -> Result<StudyPost, PostServiceError> {
        let post = self.require_post(post_id)?;
        if post.user_id != actor {
            return Err(PostServiceError::Forbidden { post_id, actor });
        }
        Ok(post)
    }
}

fn to_list_item(summary: PostSummary) -> PostListItem {
    let preview_text = summary.post.content.as_deref().and_then(derive_preview);
    PostListItem {
        summary,
        preview_text,
    }
}

/// Collapses whitespace and truncates content for list previews.
pub fn derive_preview(content: &str) -> Option<String> {
    let collapsed = WHITESPACE_RE.replace_all(content.trim(), " ");
    if collapsed.is_empty() {
        return None;
    }
    let mut preview: String = collapsed.chars().take(PREVIEW_MAX_CHARS).collect();
    if collapsed.chars().count() > PREVIEW_MAX_CHARS {
        preview.push_str("...");
    }
    Some(preview)
}
