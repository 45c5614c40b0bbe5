//! Integration tests for conferences, configuration rows and access
//! records.

use huddle_core::models::acl::Acl;
use huddle_core::models::tenant::{CreateTenant, UpdateTenant, config_map};
use huddle_core::repository::{ConfigRepository, Pagination, TenantRepository};
use huddle_db::repository::{SurrealConfigRepository, SurrealTenantRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    huddle_db::run_migrations(&db).await.unwrap();
    db
}

fn new_tenant(name: &str, workspace: Option<&str>, pending: Option<&str>) -> CreateTenant {
    CreateTenant {
        name: name.into(),
        workspace_id: workspace.map(Into::into),
        pending_workspace_name: pending.map(Into::into),
    }
}

#[tokio::test]
async fn find_by_workspace_and_update() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let tenant = repo
        .create(new_tenant("Acme", None, Some("acme")))
        .await
        .unwrap();
    assert!(repo.find_by_workspace("T123").await.unwrap().is_none());

    let updated = repo
        .update(
            tenant.id,
            UpdateTenant {
                workspace_id: Some(Some("T123".into())),
                pending_workspace_name: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.workspace_id.as_deref(), Some("T123"));
    assert!(updated.pending_workspace_name.is_none());

    let found = repo.find_by_workspace("T123").await.unwrap().unwrap();
    assert_eq!(found.id, tenant.id);
    assert_eq!(repo.get_by_id(tenant.id).await.unwrap().name, "Acme");
}

#[tokio::test]
async fn install_lookup_prefers_pending_name() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    let bound = repo
        .create(new_tenant("Bound", Some("T1"), None))
        .await
        .unwrap();
    let pending = repo
        .create(new_tenant("Pending", None, Some("Acme Corp")))
        .await
        .unwrap();

    let hit = repo
        .find_for_install("T1", "Acme Corp")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.id, pending.id);

    let hit = repo.find_for_install("T1", "Other").await.unwrap().unwrap();
    assert_eq!(hit.id, bound.id);

    assert!(repo.find_for_install("T9", "Nobody").await.unwrap().is_none());
    assert_eq!(repo.list(Pagination::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn access_record_is_unique_per_conference() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);
    let tenant = repo.create(new_tenant("Acme", None, None)).await.unwrap();

    assert!(repo.find_access(tenant.id).await.unwrap().is_none());

    let role = Uuid::new_v4();
    let access = repo
        .create_access(tenant.id, Acl::private().with_role_read(role))
        .await
        .unwrap();
    assert!(access.acl.read_roles.contains(&role));

    let again = repo.create_access(tenant.id, Acl::private()).await;
    assert!(again.unwrap_err().is_conflict());

    let found = repo.find_access(tenant.id).await.unwrap().unwrap();
    assert_eq!(found.id, access.id);
}

#[tokio::test]
async fn config_upsert_adds_then_replaces() {
    let db = setup().await;
    let tenant = SurrealTenantRepository::new(db.clone())
        .create(new_tenant("Acme", None, None))
        .await
        .unwrap();
    let repo = SurrealConfigRepository::new(db);

    repo.upsert(tenant.id, "FRONTEND_URL", "https://a.example")
        .await
        .unwrap();
    repo.upsert(tenant.id, "SLACK_BOT_TOKEN", "xoxb-1")
        .await
        .unwrap();
    let replaced = repo
        .upsert(tenant.id, "SLACK_BOT_TOKEN", "xoxb-2")
        .await
        .unwrap();
    assert_eq!(replaced.value, "xoxb-2");

    let map = config_map(repo.list(tenant.id).await.unwrap());
    assert_eq!(map.len(), 2);
    assert_eq!(map["SLACK_BOT_TOKEN"], "xoxb-2");
    assert_eq!(map["FRONTEND_URL"], "https://a.example");
}

#[tokio::test]
async fn concurrent_upserts_leave_one_row() {
    let db = setup().await;
    let tenant = SurrealTenantRepository::new(db.clone())
        .create(new_tenant("Acme", None, None))
        .await
        .unwrap();
    let repo = SurrealConfigRepository::new(db);

    let (a, b) = tokio::join!(
        repo.upsert(tenant.id, "TWILIO_ROOM_TYPE", "group"),
        repo.upsert(tenant.id, "TWILIO_ROOM_TYPE", "go"),
    );
    a.unwrap();
    b.unwrap();

    let rows = repo.list(tenant.id).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn workspace_ids_are_unique() {
    let db = setup().await;
    let repo = SurrealTenantRepository::new(db);

    repo.create(new_tenant("First", Some("T777"), None))
        .await
        .unwrap();
    let err = repo
        .create(new_tenant("Second", Some("T777"), None))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    // Tenants still awaiting install carry no workspace id.
    repo.create(new_tenant("Pending A", None, Some("a")))
        .await
        .unwrap();
    repo.create(new_tenant("Pending B", None, Some("b")))
        .await
        .unwrap();
}
