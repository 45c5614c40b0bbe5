//! Room reconciliation and provider lifecycle callbacks.

mod common;

use std::sync::atomic::Ordering;

use common::{Harness, WORKSPACE, setup};
use futures::future::join;
use huddle_core::models::acl::Acl;
use huddle_core::models::profile::{CreateProfile, Profile};
use huddle_core::models::room::{CreateRoom, Persistence, Room, RoomMode, Visibility};
use huddle_core::repository::{ProfileRepository, RoomRepository, Store};
use huddle_core::video::{CallEvent, CallEventKind, ParticipantIdentity};
use uuid::Uuid;

async fn profile(h: &Harness, chat_user_id: &str) -> Profile {
    let account = h.account(&format!("{chat_user_id}@example.com")).await;
    h.store
        .profiles()
        .create(CreateProfile {
            account_id: account.id,
            tenant_id: h.tenant.id,
            chat_user_id: chat_user_id.into(),
            display_name: Some(chat_user_id.into()),
            acl: Acl::private(),
        })
        .await
        .unwrap()
}

fn identity(p: &Profile) -> String {
    ParticipantIdentity::new(p.id, p.chat_user_id.clone()).to_string()
}

async fn room(
    h: &Harness,
    title: &str,
    call_id: Option<&str>,
    persistence: Persistence,
    members: &[Uuid],
) -> Room {
    let mut room = h
        .store
        .rooms()
        .create(CreateRoom {
            tenant_id: h.tenant.id,
            title: title.into(),
            call_id: call_id.map(Into::into),
            persistence,
            visibility: Visibility::Public,
            mode: RoomMode::Group,
            capacity: Some(24),
            acl: Acl::private(),
        })
        .await
        .unwrap();
    if !members.is_empty() {
        room.members = members.to_vec();
        room = h.store.rooms().save(&room).await.unwrap();
    }
    room
}

#[tokio::test]
async fn membership_converges_to_live_participants() {
    let h = setup().await;
    let live: Vec<Profile> = vec![
        profile(&h, "U1").await,
        profile(&h, "U2").await,
        profile(&h, "U3").await,
    ];
    let stale = [profile(&h, "U8").await.id, profile(&h, "U9").await.id];

    let call_id = h.video.start_call("standup");
    h.video
        .set_participants(&call_id, &live.iter().map(identity).collect::<Vec<_>>());
    let standup = room(&h, "standup", Some(&call_id), Persistence::Ephemeral, &stale).await;

    h.registry.resolve(WORKSPACE).await.unwrap();

    let standup = h.store.rooms().get_by_id(h.tenant.id, standup.id).await.unwrap();
    let mut members = standup.members.clone();
    members.sort();
    let mut expected: Vec<Uuid> = live.iter().map(|p| p.id).collect();
    expected.sort();
    assert_eq!(members, expected);
    assert!(standup.last_observed_at.is_some());
}

#[tokio::test]
async fn ended_calls_downgrade_persistent_and_remove_ephemeral_rooms() {
    let h = setup().await;
    let keep = room(&h, "office-hours", Some("RM-GONE-1"), Persistence::Persistent, &[]).await;
    let drop = room(&h, "hallway", Some("RM-GONE-2"), Persistence::Ephemeral, &[]).await;
    let dormant = room(&h, "library", None, Persistence::Persistent, &[]).await;

    let conf = h.registry.resolve(WORKSPACE).await.unwrap();

    let keep = h.store.rooms().get_by_id(h.tenant.id, keep.id).await.unwrap();
    assert_eq!(keep.call_id, None);
    assert_eq!(keep.persistence, Persistence::Persistent);

    let err = h.store.rooms().get_by_id(h.tenant.id, drop.id).await.unwrap_err();
    assert!(err.is_not_found());

    assert!(h.store.rooms().get_by_id(h.tenant.id, dormant.id).await.is_ok());
    assert_eq!(conf.room_for_call("RM-GONE-2"), None);
}

#[tokio::test]
async fn unknown_live_calls_are_discovered_once() {
    let h = setup().await;
    let call_id = h.video.start_call("lobby");

    let conf = h.registry.resolve(WORKSPACE).await.unwrap();
    let reconciler = h.registry.reconciler();
    let (a, b) = join(reconciler.reconcile(&conf), reconciler.reconcile(&conf)).await;
    a.unwrap();
    b.unwrap();

    let rooms = h.store.rooms().list_by_tenant(h.tenant.id).await.unwrap();
    assert_eq!(rooms.len(), 1);
    let lobby = &rooms[0];
    assert_eq!(lobby.title, "lobby");
    assert_eq!(lobby.call_id.as_deref(), Some(call_id.as_str()));
    assert_eq!(lobby.persistence, Persistence::Ephemeral);
    assert_eq!(conf.room_for_call(&call_id), Some(lobby.id));

    let conference_role = h
        .registry
        .roles()
        .get_or_create_role(h.tenant.id, huddle_core::models::role::RoleSuffix::Conference)
        .await
        .unwrap();
    assert!(lobby.acl.read_roles.contains(&conference_role.id));
    assert!(!lobby.acl.public_read);
}

#[tokio::test]
async fn malformed_identities_are_skipped() {
    let h = setup().await;
    let ada = profile(&h, "U1").await;
    let call_id = h.video.start_call("standup");
    h.video.set_participants(
        &call_id,
        &[
            "garbage".to_string(),
            format!("{}:Ghost", Uuid::new_v4()),
            identity(&ada),
        ],
    );
    let standup = room(&h, "standup", Some(&call_id), Persistence::Ephemeral, &[]).await;

    let conf = h.registry.resolve(WORKSPACE).await.unwrap();
    let report = h.registry.reconciler().reconcile(&conf).await.unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(report.converged, 1);

    let standup = h.store.rooms().get_by_id(h.tenant.id, standup.id).await.unwrap();
    assert_eq!(standup.members, vec![ada.id]);
}

#[tokio::test]
async fn unavailable_provider_does_not_block_resolution() {
    let h = setup().await;
    let kept = room(&h, "hallway", Some("RM-UNKNOWN"), Persistence::Ephemeral, &[]).await;
    h.video.listing_fails.store(true, Ordering::SeqCst);

    let conf = h.registry.resolve(WORKSPACE).await.unwrap();
    assert_eq!(conf.moderator_channel(), Some("C-MODS"));
    // Without a listing nothing can be judged stale.
    assert!(h.store.rooms().get_by_id(h.tenant.id, kept.id).await.is_ok());
}

#[tokio::test]
async fn lifecycle_events_track_membership_and_endings() {
    let h = setup().await;
    let ada = profile(&h, "U1").await;
    let call_id = h.video.start_call("standup");
    let conf = h.registry.resolve(WORKSPACE).await.unwrap();
    let standup = h
        .store
        .rooms()
        .find_by_call_id(h.tenant.id, &call_id)
        .await
        .unwrap()
        .unwrap();

    let event = |kind: &str, who: Option<String>| CallEvent {
        kind: CallEventKind::from(kind),
        call_id: call_id.clone(),
        identity: who,
    };

    h.gateway
        .process_call_event(WORKSPACE, event("participant-connected", Some(identity(&ada))))
        .await
        .unwrap();
    let room = h.store.rooms().get_by_id(h.tenant.id, standup.id).await.unwrap();
    assert_eq!(room.members, vec![ada.id]);

    h.gateway
        .process_call_event(WORKSPACE, event("participant-disconnected", Some(identity(&ada))))
        .await
        .unwrap();
    let room = h.store.rooms().get_by_id(h.tenant.id, standup.id).await.unwrap();
    assert!(room.members.is_empty());

    h.gateway
        .process_call_event(WORKSPACE, event("room-ended", None))
        .await
        .unwrap();
    assert!(
        h.store
            .rooms()
            .get_by_id(h.tenant.id, standup.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(conf.room_for_call(&call_id), None);
}

#[tokio::test]
async fn connect_for_unknown_call_triggers_reconcile() {
    let h = setup().await;
    let ada = profile(&h, "U1").await;
    h.registry.resolve(WORKSPACE).await.unwrap();

    // Started after the cold build, so no room exists yet.
    let call_id = h.video.start_call("late-night");
    h.video.set_participants(&call_id, &[identity(&ada)]);

    h.gateway
        .process_call_event(
            WORKSPACE,
            CallEvent {
                kind: CallEventKind::ParticipantConnected,
                call_id: call_id.clone(),
                identity: Some(identity(&ada)),
            },
        )
        .await
        .unwrap();

    let room = h
        .store
        .rooms()
        .find_by_call_id(h.tenant.id, &call_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(room.title, "late-night");
    assert_eq!(room.members, vec![ada.id]);
}
