//! Study log domain model.
//!
//! # Responsibility
//! - Define the records owned by the store (users, categories, posts and
//!   their details/references/comments/likes).
//! - Define the statistics shapes handed to the view layer.
//! - Own write-side validation shared by repositories and services.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Relationships are explicit id fields, never back-references.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category;
pub mod post;
pub mod stats;
pub mod user;

/// Write-side validation failure for domain records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field is blank after trimming.
    Blank(&'static str),
    /// A text field exceeds its column limit.
    TooLong { field: &'static str, max_chars: usize },
    /// Study durations are recorded as non-negative minutes.
    NegativeDuration(i64),
    /// Reference ratings are limited to 1..=5.
    RatingOutOfRange(u8),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::NegativeDuration(value) => {
                write!(f, "duration must be non-negative minutes, got {value}")
            }
            Self::RatingOutOfRange(value) => write!(f, "rating must be in 1..=5, got {value}"),
        }
    }
}

impl Error for ValidationError {}

/// Trims `value` and checks it against blank/length rules.
pub(crate) fn normalize_required_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::TooLong { field, max_chars });
    }
    Ok(trimmed.to_string())
}
