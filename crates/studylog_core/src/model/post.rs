//! Study post aggregate: post header, per-category details, references,
//! comments and likes.
//!
//! # Invariants
//! - A detail belongs to exactly one post and names exactly one category.
//! - A reference belongs to one post and optionally names a category.
//! - `created_at` is fixed at creation and never edited afterwards.

use crate::model::category::CategoryId;
use crate::model::user::UserId;
use crate::model::{normalize_required_text, ValidationError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PostId = Uuid;
pub type DetailId = Uuid;
pub type ReferenceId = Uuid;
pub type CommentId = Uuid;

pub const POST_TITLE_MAX_CHARS: usize = 200;
pub const REFERENCE_TITLE_MAX_CHARS: usize = 200;
pub const REFERENCE_URL_MAX_CHARS: usize = 500;
/// Rating applied when a reference is saved without one.
pub const DEFAULT_REFERENCE_RATING: u8 = 3;
pub const MIN_REFERENCE_RATING: u8 = 1;
pub const MAX_REFERENCE_RATING: u8 = 5;

/// One study session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyPost {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Time spent on one category within a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyDetail {
    pub id: DetailId,
    pub post_id: PostId,
    pub category_id: CategoryId,
    /// Minutes. Stored data may hold any integer; new writes are non-negative.
    pub duration_minutes: i64,
}

/// Rated link attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: ReferenceId,
    pub post_id: PostId,
    pub category_id: Option<CategoryId>,
    pub title: String,
    pub url: Option<String>,
    pub rating: u8,
}

/// Comment left on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeAction {
    Liked,
    Unliked,
}

/// Input for one detail row of a post draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailDraft {
    pub category_id: CategoryId,
    pub duration_minutes: i64,
}

/// Input for one reference row of a post draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDraft {
    /// Rows with a blank title are dropped.
    pub title: String,
    pub url: Option<String>,
    /// Defaults to `DEFAULT_REFERENCE_RATING` when absent.
    pub rating: Option<u8>,
    pub category_id: Option<CategoryId>,
}

/// Create/update input for a post and its child rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub content: Option<String>,
    pub details: Vec<DetailDraft>,
    pub references: Vec<ReferenceDraft>,
}

/// Validated post aggregate ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub post: StudyPost,
    pub details: Vec<StudyDetail>,
    pub references: Vec<Reference>,
}

impl PostDraft {
    /// Validates the draft and materializes rows for `post_id`.
    ///
    /// # Contract
    /// - Title is trimmed and required.
    /// - Blank content becomes `None`.
    /// - Negative durations are rejected.
    /// - Reference rows with blank titles are skipped; blank urls become `None`.
    pub fn into_record(
        self,
        post_id: PostId,
        user_id: UserId,
        created_at: NaiveDateTime,
    ) -> Result<PostRecord, ValidationError> {
        let title = normalize_required_text("post title", &self.title, POST_TITLE_MAX_CHARS)?;
        let content = self.content.filter(|value| !value.trim().is_empty());

        let mut details = Vec::with_capacity(self.details.len());
        for draft in self.details {
            if draft.duration_minutes < 0 {
                return Err(ValidationError::NegativeDuration(draft.duration_minutes));
            }
            details.push(StudyDetail {
                id: Uuid::new_v4(),
                post_id,
                category_id: draft.category_id,
                duration_minutes: draft.duration_minutes,
            });
        }

        let mut references = Vec::new();
        for draft in self.references {
            if draft.title.trim().is_empty() {
                continue;
            }
            references.push(draft.into_reference(post_id)?);
        }

        Ok(PostRecord {
            post: StudyPost {
                id: post_id,
                user_id,
                title,
                content,
                created_at,
            },
            details,
            references,
        })
    }
}

impl ReferenceDraft {
    fn into_reference(self, post_id: PostId) -> Result<Reference, ValidationError> {
        let title =
            normalize_required_text("reference title", &self.title, REFERENCE_TITLE_MAX_CHARS)?;
        let url = match self.url.as_deref().map(str::trim) {
            Some(value) if !value.is_empty() => {
                if value.chars().count() > REFERENCE_URL_MAX_CHARS {
                    return Err(ValidationError::TooLong {
                        field: "reference url",
                        max_chars: REFERENCE_URL_MAX_CHARS,
                    });
                }
                Some(value.to_string())
            }
            _ => None,
        };
        let rating = self.rating.unwrap_or(DEFAULT_REFERENCE_RATING);
        if !(MIN_REFERENCE_RATING..=MAX_REFERENCE_RATING).contains(&rating) {
            return Err(ValidationError::RatingOutOfRange(rating));
        }

        Ok(Reference {
            id: Uuid::new_v4(),
            post_id,
            category_id: self.category_id,
            title,
            url,
            rating,
        })
    }
}

/// Normalizes comment text.
pub fn normalize_comment(content: &str) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank("comment"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{DetailDraft, PostDraft, ReferenceDraft, DEFAULT_REFERENCE_RATING};
    use crate::model::ValidationError;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn into_record_skips_untitled_references_and_defaults_rating() {
        let draft = PostDraft {
            title: " Day 1 ".to_string(),
            content: Some("   ".to_string()),
            details: vec![DetailDraft {
                category_id: Uuid::new_v4(),
                duration_minutes: 30,
            }],
            references: vec![
                ReferenceDraft {
                    title: "Guide".to_string(),
                    url: Some(" ".to_string()),
                    ..ReferenceDraft::default()
                },
                ReferenceDraft {
                    title: "  ".to_string(),
                    rating: Some(5),
                    ..ReferenceDraft::default()
                },
            ],
        };

        let record = draft.into_record(Uuid::new_v4(), Uuid::new_v4(), at()).unwrap();
        assert_eq!(record.post.title, "Day 1");
        assert_eq!(record.post.content, None);
        assert_eq!(record.details.len(), 1);
        assert_eq!(record.references.len(), 1);
        assert_eq!(record.references[0].rating, DEFAULT_REFERENCE_RATING);
        assert_eq!(record.references[0].url, None);
        assert_eq!(record.details[0].post_id, record.post.id);
    }

    #[test]
    fn into_record_rejects_negative_duration_and_bad_rating() {
        let negative = PostDraft {
            title: "t".to_string(),
            details: vec![DetailDraft {
                category_id: Uuid::new_v4(),
                duration_minutes: -5,
            }],
            ..PostDraft::default()
        };
        assert_eq!(
            negative
                .into_record(Uuid::new_v4(), Uuid::new_v4(), at())
                .unwrap_err(),
            ValidationError::NegativeDuration(-5)
        );

        let bad_rating = PostDraft {
            title: "t".to_string(),
            references: vec![ReferenceDraft {
                title: "r".to_string(),
                rating: Some(9),
                ..ReferenceDraft::default()
            }],
            ..PostDraft::default()
        };
        assert_eq!(
            bad_rating
                .into_record(Uuid::new_v4(), Uuid::new_v4(), at())
                .unwrap_err(),
            ValidationError::RatingOutOfRange(9)
        );
    }
}
