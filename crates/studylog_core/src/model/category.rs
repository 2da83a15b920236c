//! Study category model.

use crate::model::{normalize_required_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;

/// Column limit for `study_categories.name`.
pub const CATEGORY_NAME_MAX_CHARS: usize = 50;

/// Subject a study duration or reference is filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyCategory {
    pub id: CategoryId,
    /// Unique display name.
    pub name: String,
}

impl StudyCategory {
    /// Creates a category with a generated id and normalized name.
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: normalize_required_text("category name", name, CATEGORY_NAME_MAX_CHARS)?,
        })
    }
}
