//! Demo data generation and the auto-post task.
//!
//! # Responsibility
//! - Fill a user's history with daily demo posts for chart or reference
//!   dashboard previews.
//! - Create the daily auto-generated post for users whose flag is enabled.
//!
//! # Invariants
//! - Demo details use the first four categories in insertion order.
//! - A demo run is committed as one transaction; a failure leaves no posts.
//! - Scheduling is the caller's concern; this module only performs one run.

use crate::model::category::{CategoryId, StudyCategory};
use crate::model::post::{DetailDraft, PostDraft, PostId, ReferenceDraft};
use crate::model::user::User;
use crate::model::ValidationError;
use crate::repo::auto_post_repo::{AutoPostRepository, SqliteAutoPostRepository};
use crate::repo::category_repo::{CategoryRepository, SqliteCategoryRepository};
use crate::repo::post_repo::{PostRepository, SqlitePostRepository};
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoError;
use crate::service::local_now;
use chrono::{Datelike, Duration, NaiveDateTime};
use log::{error, info};
use rand::Rng;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DEMO_CATEGORY_COUNT: usize = 4;
const GRAPH_DEMO_DAYS: i64 = 365;
const RANDOM_MINUTES_MIN: i64 = 10;
const RANDOM_MINUTES_MAX: i64 = 60;

/// (title, url, rating, 1-based demo category index)
const DEMO_REFERENCES: [(&str, &str, u8, usize); 16] = [
    (
        "Web APIs and automated data collection",
        "https://www.youtube.com/watch?v=iOXcJoAtXn4",
        5,
        2,
    ),
    (
        "Building web apps with Python and Flask",
        "https://www.youtube.com/watch?v=cxgY9mKDuHw",
        5,
        2,
    ),
    (
        "Python side projects in practice",
        "https://www.youtube.com/watch?v=kV8fpcXo73s",
        5,
        2,
    ),
    (
        "Setting up a Python environment",
        "https://www.youtube.com/watch?v=BLMc1reLeGc",
        5,
        1,
    ),
    (
        "Backend API basics with Flask, part 4",
        "https://www.youtube.com/watch?v=wKZmbMZJQ-s",
        3,
        1,
    ),
    (
        "Docker intro: Linux on Windows",
        "https://www.youtube.com/watch?v=iRAy0h5HpZA",
        3,
        1,
    ),
    (
        "Docker intro: Python dev containers",
        "https://www.youtube.com/watch?v=CCcF5xuaDtI",
        3,
        2,
    ),
    (
        "Docker intro: running commands in containers",
        "https://www.youtube.com/watch?v=PR_JMxvyyfA",
        3,
        4,
    ),
    (
        "Container-based virtual environments",
        "https://www.youtube.com/watch?v=B5tSZr_QqXw",
        3,
        4,
    ),
    (
        "Programming fundamentals in Python",
        "https://www.youtube.com/watch?v=tCMl1AWfhQQ",
        4,
        4,
    ),
    (
        "A desktop spreadsheet app in ten minutes",
        "https://www.youtube.com/watch?v=dPK5xNRUOuI",
        4,
        3,
    ),
    (
        "A message board web app with Flask, part 1",
        "https://www.youtube.com/watch?v=DkOZSxaMV8w",
        4,
        3,
    ),
    (
        "Pandas from the ground up",
        "https://www.youtube.com/watch?v=sSR2x0y6D9s",
        4,
        2,
    ),
    (
        "Matplotlib from the ground up",
        "https://www.youtube.com/watch?v=6-QCxoA3Rio",
        4,
        2,
    ),
    (
        "JupyterLab Desktop for data analysis",
        "https://www.youtube.com/watch?v=d_OVFb3gL_8",
        4,
        1,
    ),
    (
        "Reading and filtering data with Pandas",
        "https://www.youtube.com/watch?v=GoboWIxBBWw",
        4,
        1,
    ),
];

/// Kind of demo history to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    /// One post per day for the last 365 days.
    Graph,
    /// One post per day for the last 16 days, each with a reference.
    References,
}

impl DemoKind {
    pub fn post_count(self) -> usize {
        match self {
            Self::Graph => GRAPH_DEMO_DAYS as usize,
            Self::References => DEMO_REFERENCES.len(),
        }
    }
}

/// Errors from demo generation and auto-post runs.
#[derive(Debug)]
pub enum DemoServiceError {
    UserNotFound(String),
    /// Demo details need at least four categories.
    NotEnoughCategories { required: usize, found: usize },
    Validation(ValidationError),
    Repo(RepoError),
}

impl Display for DemoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(name) => write!(f, "user not found: `{name}`"),
            Self::NotEnoughCategories { required, found } => write!(
                f,
                "demo data needs {required} categories, only {found} registered"
            ),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DemoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for DemoServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ValidationError> for DemoServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Demo/auto-post facade over repository implementations.
pub struct DemoService<U, C, P, A>
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

pub type SqliteDemoService<'conn> = DemoService<
    SqliteUserRepository<'conn>,
    SqliteCategoryRepository<'conn>,
    SqlitePostRepository<'conn>,
    SqliteAutoPostRepository<'conn>,
>;

impl<'conn> SqliteDemoService<'conn> {
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

impl<U, C, P, A> DemoService<U, C, P, A>
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

    /// Generates demo history for the named user going back from now.
    pub fn generate(&self, user_name: &str, kind: DemoKind) -> Result<usize, DemoServiceError> {
        self.generate_at(user_name, kind, local_now(), &mut rand::thread_rng())
    }

    /// Generates demo history relative to `now` with a caller-provided RNG.
    ///
    /// Day `i` (0 = today) gets one detail per demo category with
    /// `random(10..=60) + i + category_index` minutes. Returns the number of
    /// posts written.
    pub fn generate_at<G: Rng>(
        &self,
        user_name: &str,
        kind: DemoKind,
        now: NaiveDateTime,
        rng: &mut G,
    ) -> Result<usize, DemoServiceError> {
        let user = self.require_user(user_name)?;
        let categories = self.demo_categories()?;

        let mut records = Vec::with_capacity(kind.post_count());
        for day_offset in 0..kind.post_count() {
            let target = now - Duration::days(day_offset as i64);
            let details = categories
                .iter()
                .enumerate()
                .map(|(index, category)| DetailDraft {
                    category_id: category.id,
                    duration_minutes: random_minutes(rng) + day_offset as i64 + index as i64 + 1,
                })
                .collect();

            let draft = match kind {
                DemoKind::Graph => PostDraft {
                    title: format!("{} study log", target.format("%Y-%m-%d")),
                    content: Some(format!("Day {} of studying. Keeping it up!", target.day())),
                    details,
                    references: Vec::new(),
                },
                DemoKind::References => PostDraft {
                    title: format!("{} study log (with references)", target.format("%Y-%m-%d")),
                    content: Some(format!("Day {} of studying. Keeping it up!", target.day())),
                    details,
                    references: vec![demo_reference(day_offset, &categories)],
                },
            };
            records.push(draft.into_record(Uuid::new_v4(), user.id, target)?);
        }

        let written = self.posts.insert_posts(&records).map_err(|err| {
            error!("event=demo_generate module=demo status=error kind={kind:?} error={err}");
            DemoServiceError::from(err)
        })?;
        info!(
            "event=demo_generate module=demo status=ok kind={:?} posts={}",
            kind,
            written.len()
        );
        Ok(written.len())
    }

    /// Creates today's auto-generated post for the named user.
    pub fn run_auto_post(&self, user_name: &str) -> Result<PostId, DemoServiceError> {
        let user = self.require_user(user_name)?;
        self.auto_post_for(&user, local_now(), &mut rand::thread_rng())
    }

    /// Creates the auto-generated post for every user whose flag is enabled.
    ///
    /// Stops at the first failure.
    pub fn run_enabled_auto_posts_at<G: Rng>(
        &self,
        now: NaiveDateTime,
        rng: &mut G,
    ) -> Result<Vec<PostId>, DemoServiceError> {
        let users = self.auto_post.list_enabled_users()?;
        let mut created = Vec::with_capacity(users.len());
        for user in &users {
            created.push(self.auto_post_for(user, now, rng)?);
        }
        info!("event=auto_post_run module=demo status=ok users={}", created.len());
        Ok(created)
    }

    pub fn run_enabled_auto_posts(&self) -> Result<Vec<PostId>, DemoServiceError> {
        self.run_enabled_auto_posts_at(local_now(), &mut rand::thread_rng())
    }

    fn auto_post_for<G: Rng>(
        &self,
        user: &User,
        now: NaiveDateTime,
        rng: &mut G,
    ) -> Result<PostId, DemoServiceError> {
        let categories = self.demo_categories()?;
        let draft = PostDraft {
            title: format!("{} automatic study log", now.format("%Y-%m-%d")),
            content: Some("Automatic post: today's studying went well!".to_string()),
            details: categories
                .iter()
                .map(|category| DetailDraft {
                    category_id: category.id,
                    duration_minutes: random_minutes(rng),
                })
                .collect(),
            references: Vec::new(),
        };
        self.insert_draft(user, draft, now)
    }

    fn insert_draft(
        &self,
        user: &User,
        draft: PostDraft,
        created_at: NaiveDateTime,
    ) -> Result<PostId, DemoServiceError> {
        let record = draft.into_record(Uuid::new_v4(), user.id, created_at)?;
        self.posts.insert_post(&record).map_err(|err| {
            error!("event=demo_post_insert module=demo status=error error={err}");
            DemoServiceError::from(err)
        })
    }

    fn require_user(&self, user_name: &str) -> Result<User, DemoServiceError> {
        self.users
            .find_user_by_name(user_name.trim())?
            .ok_or_else(|| DemoServiceError::UserNotFound(user_name.trim().to_string()))
    }

    fn demo_categories(&self) -> Result<Vec<StudyCategory>, DemoServiceError> {
        let mut categories = self.categories.list_categories()?;
        if categories.len() < DEMO_CATEGORY_COUNT {
            return Err(DemoServiceError::NotEnoughCategories {
                required: DEMO_CATEGORY_COUNT,
                found: categories.len(),
            });
        }
        categories.truncate(DEMO_CATEGORY_COUNT);
        Ok(categories)
    }
}

fn random_minutes<G: Rng>(rng: &mut G) -> i64 {
    rng.gen_range(RANDOM_MINUTES_MIN..=RANDOM_MINUTES_MAX)
}

fn demo_reference(day_offset: usize, categories: &[StudyCategory]) -> ReferenceDraft {
    let (title, url, rating, category_index) = DEMO_REFERENCES[day_offset];
    let category_id: Option<CategoryId> = categories.get(category_index - 1).map(|c| c.id);
    ReferenceDraft {
        title: title.to_string(),
        url: Some(url.to_string()),
        rating: Some(rating),
        category_id,
    }
}
