//! Core domain logic for the study log.
//! Storage, statistics, posts and administration live here; front ends only
//! call into these services.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::category::{CategoryId, StudyCategory};
pub use model::post::{
    Comment, DetailDraft, LikeAction, PostDraft, PostId, Reference, ReferenceDraft, StudyDetail,
    StudyPost,
};
pub use model::stats::{CategoryTotal, ChartData, StatsResult, StatsWindow, TimeBucket};
pub use model::user::{User, UserId};
pub use model::ValidationError;
pub use repo::post_repo::ReferenceFilter;
pub use repo::{RepoError, RepoResult};
pub use service::admin_service::{AdminService, AdminServiceError, SqliteAdminService};
pub use service::demo_service::{DemoKind, DemoService, DemoServiceError, SqliteDemoService};
pub use service::post_service::{PostService, PostServiceError, SqlitePostService};
pub use service::stats_service::{StatsAggregator, StatsError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
