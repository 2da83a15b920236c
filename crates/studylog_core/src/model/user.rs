//! User model.

use crate::model::{normalize_required_text, ValidationError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// Column limit for `users.name`.
pub const USER_NAME_MAX_CHARS: usize = 50;

/// Account that owns study posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique, trimmed display/login name.
    pub name: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

impl User {
    /// Creates a regular user with a generated id.
    ///
    /// # Errors
    /// - Returns `ValidationError` when the name is blank or too long.
    pub fn new(name: &str, created_at: NaiveDateTime) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_user_name(name)?,
            is_admin: false,
            created_at,
        })
    }

    /// Creates an administrator account.
    pub fn new_admin(name: &str, created_at: NaiveDateTime) -> Result<Self, ValidationError> {
        let mut user = Self::new(name, created_at)?;
        user.is_admin = true;
        Ok(user)
    }
}

/// Normalizes a user name for storage and lookup.
pub fn normalize_user_name(name: &str) -> Result<String, ValidationError> {
    normalize_required_text("user name", name, USER_NAME_MAX_CHARS)
}
