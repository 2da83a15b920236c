//! Administration use-case service.
//!
//! # Responsibility
//! - Bootstrap the default administrator account.
//! - Manage users and study categories.
//! - Report store totals and per-user auto-post flags.
//!
//! # Invariants
//! - User and category names are unique after trimming.
//! - Auto-post flags are persisted, never held in process memory.

use crate::model::category::{CategoryId, StudyCategory};
use crate::model::user::{normalize_user_name, User};
use crate::model::ValidationError;
use crate::repo::auto_post_repo::{AutoPostRepository, AutoPostStatus, SqliteAutoPostRepository};
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::post_repo::{PostRepository, SqlitePostRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use crate::service::local_now;
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of the administrator created at bootstrap.
pub const DEFAULT_ADMIN_NAME: &str = "admin";

/// Errors from administration use-cases.
#[derive(Debug)]
pub enum AdminServiceError {
    Validation(ValidationError),
    DuplicateUser(String),
    DuplicateCategory(String),
    UserNotFound(String),
    CategoryNotFound(CategoryId),
    /// Study details still reference the category.
    CategoryInUse(CategoryId),
    Repo(RepoError),
}

impl Display for AdminServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::DuplicateUser(name) => write!(f, "user name `{name}` is already taken"),
            Self::DuplicateCategory(name) => {
                write!(f, "category `{name}` is already registered")
            }
            Self::UserNotFound(name) => write!(f, "user not found: `{name}`"),
            Self::CategoryNotFound(id) => write!(f, "category not found: {id}"),
            Self::CategoryInUse(id) => write!(f, "category {id} still has study records"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AdminServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AdminServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for AdminServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Store totals for the admin landing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdminSummary {
    pub total_users: u64,
    pub total_posts: u64,
}

/// Administration facade over repository implementations.
pub struct AdminService<U, C, P, A>
where
    U: UserRepository,
    C: CategoryRepository,
    P: PostRepository,
    A: AutoPostRepository,
{
    users: U,
    categories: C,
    posts: P,
    auto_post: A,
}

pub type SqliteAdminService<'conn> = AdminService<
    SqliteUserRepository<'conn>,
    SqliteCategoryRepository<'conn>,
    SqlitePostRepository<'conn>,
    SqliteAutoPostRepository<'conn>,
>;

impl<'conn> SqliteAdminService<'conn> {
    /// Builds the service over SQLite repositories sharing `conn`.
    pub fn sqlite(conn: &'conn Connection) -> Self {
        Self::new(
            SqliteUserRepository::new(conn),
            SqliteCategoryRepository::new(conn),
            SqlitePostRepository::new(conn),
            SqliteAutoPostRepository::new(conn),
        )
    }
}

impl<U, C, P, A> AdminService<U, C, P, A>
where
    U: UserRepository,
    C: CategoryRepository,
    P: PostRepository,
    A: AutoPostRepository,
{
    pub fn new(users: U, categories: C, posts: P, auto_post: A) -> Self {
        Self {
            users,
            categories,
            posts,
            auto_post,
        }
    }

    /// Creates the default administrator when missing.
    ///
    /// Returns the admin account and whether it was created by this call.
    pub fn ensure_default_admin(&self) -> Result<(User, bool), AdminServiceError> {
        if let Some(existing) = self.users.find_user_by_name(DEFAULT_ADMIN_NAME)? {
            info!("event=admin_bootstrap module=admin status=ok created=false");
            return Ok((existing, false));
        }

        let admin = User::new_admin(DEFAULT_ADMIN_NAME, local_now())?;
        self.users.create_user(&admin)?;
        info!("event=admin_bootstrap module=admin status=ok created=true");
        Ok((admin, true))
    }

    pub fn create_user(&self, name: &str) -> Result<User, AdminServiceError> {
        let user = User::new(name, local_now())?;
        match self.users.create_user(&user) {
            Ok(_) => {
                info!("event=user_create module=admin status=ok");
                Ok(user)
            }
            Err(RepoError::Duplicate { name, .. }) => {
                warn!("event=user_create module=admin status=error error_code=duplicate_name");
                Err(AdminServiceError::DuplicateUser(name))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes the named user and everything they own.
    pub fn delete_user(&self, name: &str) -> Result<(), AdminServiceError> {
        let user = self.require_user(name)?;
        self.users.delete_user(user.id)?;
        info!("event=user_delete module=admin status=ok");
        Ok(())
    }

    pub fn find_user(&self, name: &str) -> Result<Option<User>, AdminServiceError> {
        let name = normalize_user_name(name)?;
        Ok(self.users.find_user_by_name(&name)?)
    }

    /// Looks up a user by name, failing when absent.
    pub fn require_user(&self, name: &str) -> Result<User, AdminServiceError> {
        self.find_user(name)?
            .ok_or_else(|| AdminServiceError::UserNotFound(name.trim().to_string()))
    }

    /// Lists users ordered by name.
    pub fn list_users(&self) -> Result<Vec<User>, AdminServiceError> {
        Ok(self.users.list_users()?)
    }

    pub fn create_category(&self, name: &str) -> Result<StudyCategory, AdminServiceError> {
        let category = StudyCategory::new(name)?;
        match self.categories.create_category(&category) {
            Ok(_) => {
                info!("event=category_create module=admin status=ok");
                Ok(category)
            }
            Err(RepoError::Duplicate { name, .. }) => {
                Err(AdminServiceError::DuplicateCategory(name))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn delete_category(&self, id: CategoryId) -> Result<(), AdminServiceError> {
        match self.categories.delete_category(id) {
            Ok(()) => {
                info!("event=category_delete module=admin status=ok");
                Ok(())
            }
            Err(RepoError::NotFound { .. }) => Err(AdminServiceError::CategoryNotFound(id)),
            Err(RepoError::InUse { .. }) => {
                warn!("event=category_delete module=admin status=error error_code=in_use");
                Err(AdminServiceError::CategoryInUse(id))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Lists categories in insertion order.
    pub fn list_categories(&self) -> Result<Vec<StudyCategory>, AdminServiceError> {
        Ok(self.categories.list_categories()?)
    }

    pub fn summary(&self) -> Result<AdminSummary, AdminServiceError> {
        Ok(AdminSummary {
            total_users: self.users.count_users()?,
            total_posts: self.posts.count_posts()?,
        })
    }

    /// Turns the named user's auto-post flag on or off.
    pub fn set_auto_post(&self, name: &str, enabled: bool) -> Result<(), AdminServiceError> {
        let user = self.require_user(name)?;
        self.auto_post.set_enabled(user.id, enabled, local_now())?;
        info!("event=auto_post_toggle module=admin status=ok enabled={enabled}");
        Ok(())
    }

    /// Lists every user's auto-post flag, ordered by user name.
    pub fn auto_post_statuses(&self) -> Result<Vec<AutoPostStatus>, AdminServiceError> {
        Ok(self.auto_post.list_statuses()?)
    }
}
