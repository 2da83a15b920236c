//! Study category repository contracts and SQLite implementation.
//!
//! # Invariants
//! - Category names are unique.
//! - Categories are listed in insertion order.
//! - A category referenced by study details cannot be deleted; references
//!   pointing at it lose their category instead.

use crate::db::{is_foreign_key_violation, is_unique_violation};
use crate::model::category::{CategoryId, StudyCategory};
use crate::repo::{parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Repository interface for study categories.
pub trait CategoryRepository {
    fn create_category(&self, category: &StudyCategory) -> RepoResult<CategoryId>;
    fn get_category(&self, id: CategoryId) -> RepoResult<Option<StudyCategory>>;
    fn list_categories(&self) -> RepoResult<Vec<StudyCategory>>;
    fn delete_category(&self, id: CategoryId) -> RepoResult<()>;
}

/// SQLite-backed category repository.
pub struct SqliteCategoryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCategoryRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CategoryRepository for SqliteCategoryRepository<'_> {
    fn create_category(&self, category: &StudyCategory) -> RepoResult<CategoryId> {
        let inserted = self.conn.execute(
            "INSERT INTO study_categories (id, name, created_at)
             VALUES (?1, ?2, strftime('%Y-%m-%d %H:%M:%S', 'now', 'localtime'));",
            params![category.id.to_string(), category.name.as_str()],
        );

        match inserted {
            Ok(_) => Ok(category.id),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Duplicate {
                entity: "category",
                name: category.name.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get_category(&self, id: CategoryId) -> RepoResult<Option<StudyCategory>> {
        let name: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM study_categories WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name.map(|name| StudyCategory { id, name }))
    }

    fn list_categories(&self) -> RepoResult<Vec<StudyCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name
             FROM study_categories
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut categories = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get("id")?;
            categories.push(StudyCategory {
                id: parse_uuid(&id, "study_categories.id")?,
                name: row.get("name")?,
            });
        }
        Ok(categories)
    }

    fn delete_category(&self, id: CategoryId) -> RepoResult<()> {
        let deleted = self.conn.execute(
            "DELETE FROM study_categories WHERE id = ?1;",
            [id.to_string()],
        );

        match deleted {
            Ok(0) => Err(RepoError::not_found("category", id)),
            Ok(_) => Ok(()),
            Err(err) if is_foreign_key_violation(&err) => Err(RepoError::InUse {
                entity: "category",
                key: id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
