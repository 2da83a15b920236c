use chrono::NaiveDate;
use studylog_core::db::open_db_in_memory;
use studylog_core::service::admin_service::{AdminSummary, DEFAULT_ADMIN_NAME};
use studylog_core::{
    AdminServiceError, DetailDraft, PostDraft, ReferenceDraft, SqliteAdminService,
    SqlitePostService, ValidationError,
};
use uuid::Uuid;

#[test]
fn ensure_default_admin_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let admin = SqliteAdminService::sqlite(&conn);

    let (first, created) = admin.ensure_default_admin().unwrap();
    assert!(created);
    assert!(first.is_admin);
    assert_eq!(first.name, DEFAULT_ADMIN_NAME);

    let (second, created) = admin.ensure_default_admin().unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(admin.list_users().unwrap().len(), 1);
}

#[test]
fn user_names_are_trimmed_unique_and_listed_by_name() {
    let conn = open_db_in_memory().unwrap();
    let admin = SqliteAdminService::sqlite(&conn);

    admin.create_user(" zoe ").unwrap();
    admin.create_user("adam").unwrap();
    assert!(matches!(
        admin.create_user("zoe").unwrap_err(),
        AdminServiceError::DuplicateUser(name) if name == "zoe"
    ));
    assert!(matches!(
        admin.create_user("  ").unwrap_err(),
        AdminServiceError::Validation(ValidationError::Blank(_))
    ));

    let names: Vec<String> = admin
        .list_users()
        .unwrap()
        .into_iter()
        .map(|user| user.name)
        .collect();
    assert_eq!(names, vec!["adam", "zoe"]);
    assert!(!admin.require_user("zoe").unwrap().is_admin);
    assert!(matches!(
        admin.require_user("nobody").unwrap_err(),
        AdminServiceError::UserNotFound(_)
    ));
}

#[test]
fn deleting_a_user_cascades_to_owned_rows() {
    let conn = open_db_in_memory().unwrap();
    let admin = SqliteAdminService::sqlite(&conn);
    let posts = SqlitePostService::sqlite(&conn);
    let alice = admin.create_user("alice").unwrap();
    let bob = admin.create_user("bob").unwrap();
    let math = admin.create_category("math").unwrap();

    let alice_post = posts
        .create_post(
            alice.id,
            PostDraft {
                title: "alice".to_string(),
                details: vec![DetailDraft {
                    category_id: math.id,
                    duration_minutes: 30,
                }],
                ..PostDraft::default()
            },
        )
        .unwrap();
    let bob_post = posts
        .create_post(
            bob.id,
            PostDraft {
                title: "bob".to_string(),
                ..PostDraft::default()
            },
        )
        .unwrap();
    posts.add_comment(alice.id, bob_post, "hi").unwrap();
    posts.toggle_like(alice.id, bob_post).unwrap();
    admin.set_auto_post("alice", true).unwrap();

    admin.delete_user("alice").unwrap();

    assert!(posts.get_post(alice_post).is_err());
    let bob_view = posts.get_post(bob_post).unwrap();
    assert!(bob_view.comments.is_empty());
    assert_eq!(bob_view.like_count, 0);
    assert_eq!(
        admin.summary().unwrap(),
        AdminSummary {
            total_users: 1,
            total_posts: 1,
        }
    );
    let statuses = admin.auto_post_statuses().unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].user_name, "bob");
    assert!(matches!(
        admin.delete_user("alice").unwrap_err(),
        AdminServiceError::UserNotFound(_)
    ));
}

#[test]
fn categories_keep_insertion_order_and_reject_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let admin = SqliteAdminService::sqlite(&conn);

    for name in ["rust", "algebra", "music"] {
        admin.create_category(name).unwrap();
    }
    assert!(matches!(
        admin.create_category("rust").unwrap_err(),
        AdminServiceError::DuplicateCategory(_)
    ));

    let names: Vec<String> = admin
        .list_categories()
        .unwrap()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["rust", "algebra", "music"]);
}

#[test]
fn category_in_use_by_details_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let admin = SqliteAdminService::sqlite(&conn);
    let posts = SqlitePostService::sqlite(&conn);
    let user = admin.create_user("u").unwrap();
    let used = admin.create_category("used").unwrap();
    let referenced = admin.create_category("referenced").unwrap();

    let created_at = NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let post_id = posts
        .create_post_at(
            user.id,
            PostDraft {
                title: "p".to_string(),
                details: vec![DetailDraft {
                    category_id: used.id,
                    duration_minutes: 15,
                }],
                references: vec![ReferenceDraft {
                    title: "ref".to_string(),
                    category_id: Some(referenced.id),
                    ..ReferenceDraft::default()
                }],
                ..PostDraft::default()
            },
            created_at,
        )
        .unwrap();

    assert!(matches!(
        admin.delete_category(used.id).unwrap_err(),
        AdminServiceError::CategoryInUse(id) if id == used.id
    ));

    admin.delete_category(referenced.id).unwrap();
    let view = posts.get_post(post_id).unwrap();
    assert_eq!(view.references[0].reference.category_id, None);
    assert_eq!(view.references[0].category_name, None);

    assert!(matches!(
        admin.delete_category(Uuid::new_v4()).unwrap_err(),
        AdminServiceError::CategoryNotFound(_)
    ));
}

#[test]
fn auto_post_flags_are_persisted_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studylog.db");

    {
        let conn = studylog_core::open_db(&path).unwrap();
        let admin = SqliteAdminService::sqlite(&conn);
        admin.create_user("alice").unwrap();
        admin.create_user("bob").unwrap();
        admin.set_auto_post("alice", true).unwrap();
        admin.set_auto_post("bob", true).unwrap();
        admin.set_auto_post("bob", false).unwrap();
        assert!(matches!(
            admin.set_auto_post("carol", true).unwrap_err(),
            AdminServiceError::UserNotFound(_)
        ));
    }

    let conn = studylog_core::open_db(&path).unwrap();
    let statuses = SqliteAdminService::sqlite(&conn)
        .auto_post_statuses()
        .unwrap();
    let flags: Vec<(&str, bool)> = statuses
        .iter()
        .map(|status| (status.user_name.as_str(), status.enabled))
        .collect();
    assert_eq!(flags, vec![("alice", true), ("bob", false)]);
}
