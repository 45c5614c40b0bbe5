//! Integration tests for the Room repository.

use chrono::Utc;
use futures::future::join;
use huddle_core::models::acl::Acl;
use huddle_core::models::room::{CreateRoom, Persistence, RoomMode, Visibility};
use huddle_core::repository::RoomRepository;
use huddle_db::repository::SurrealRoomRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealRoomRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    huddle_db::run_migrations(&db).await.unwrap();
    SurrealRoomRepository::new(db)
}

fn new_room(tenant_id: Uuid, title: &str, call_id: Option<&str>) -> CreateRoom {
    CreateRoom {
        tenant_id,
        title: title.into(),
        call_id: call_id.map(Into::into),
        persistence: Persistence::Ephemeral,
        visibility: Visibility::Public,
        mode: RoomMode::Group,
        capacity: Some(RoomMode::Group.capacity()),
        acl: Acl::private().with_role_read(Uuid::new_v4()),
    }
}

#[tokio::test]
async fn create_and_lookup() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();

    let room = repo
        .create(new_room(tenant, "standup", Some("RM1")))
        .await
        .unwrap();
    assert!(room.members.is_empty());
    assert_eq!(room.capacity, Some(24));

    let by_call = repo.find_by_call_id(tenant, "RM1").await.unwrap().unwrap();
    assert_eq!(by_call.id, room.id);
    let by_title = repo.find_by_title(tenant, "standup").await.unwrap().unwrap();
    assert_eq!(by_title.id, room.id);
    assert_eq!(repo.get_by_id(tenant, room.id).await.unwrap().title, "standup");

    // Rooms are invisible from other conferences.
    assert!(repo.find_by_call_id(Uuid::new_v4(), "RM1").await.unwrap().is_none());
    assert!(repo.get_by_id(Uuid::new_v4(), room.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn concurrent_creation_of_same_title_conflicts_once() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();

    let (a, b) = join(
        repo.create(new_room(tenant, "standup", None)),
        repo.create(new_room(tenant, "standup", None)),
    )
    .await;

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.is_conflict())
    );
    assert_eq!(repo.list_by_tenant(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn save_persists_membership_and_downgrade() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let mut room = repo
        .create(CreateRoom {
            persistence: Persistence::Persistent,
            ..new_room(tenant, "lobby", Some("RM2"))
        })
        .await
        .unwrap();

    let (p1, p2) = (Uuid::new_v4(), Uuid::new_v4());
    room.add_member(p1);
    room.add_member(p2);
    room.last_observed_at = Some(Utc::now());
    let saved = repo.save(&room).await.unwrap();
    assert_eq!(saved.members, vec![p1, p2]);
    assert!(saved.last_observed_at.is_some());

    room.call_id = None;
    room.members.clear();
    let dormant = repo.save(&room).await.unwrap();
    assert!(dormant.is_dormant());
    assert!(repo.find_by_call_id(tenant, "RM2").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_removes_room_and_save_then_fails() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let room = repo
        .create(new_room(tenant, "ad-hoc", Some("RM3")))
        .await
        .unwrap();

    repo.delete(tenant, room.id).await.unwrap();
    assert!(repo.list_by_tenant(tenant).await.unwrap().is_empty());
    assert!(repo.save(&room).await.unwrap_err().is_not_found());
}
