//! Room reconciliation against the video provider.
//!
//! A run first discovers live calls with no room, then converges every
//! room with the call it points at. Both passes fan out per item and
//! tolerate individual failures. Runs may interleave; each mutation is
//! re-derived from the provider's current state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use huddle_core::batch::{ItemFailure, settle};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::acl::Acl;
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::room::{CreateRoom, Persistence, Room, Visibility};
use huddle_core::repository::{ProfileRepository, RoomRepository, Store};
use huddle_core::video::{
    CallEvent, CallEventKind, CreateCall, LiveCall, ParticipantIdentity, ParticipantStatus,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conference::Conference;
use crate::roles::RoleCache;

/// What a convergence step did to one room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomOutcome {
    /// Persistent room without a call.
    Dormant,
    /// Membership synced with the live call.
    Converged,
    /// Call gone, persistent room kept with its call id cleared.
    Downgraded,
    /// Call gone, ephemeral room deleted.
    Removed,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub discovered: usize,
    pub converged: usize,
    pub downgraded: usize,
    pub removed: usize,
    pub failures: Vec<ItemFailure>,
}

pub struct RoomReconciler<S: Store> {
    store: Arc<S>,
    roles: Arc<RoleCache<S>>,
}

impl<S: Store> RoomReconciler<S> {
    pub fn new(store: Arc<S>, roles: Arc<RoleCache<S>>) -> Self {
        Self { store, roles }
    }

    /// Full sync of a conference's rooms. Fails only when the live
    /// call listing itself is unavailable.
    pub async fn reconcile(&self, conf: &Conference) -> HuddleResult<ReconcileReport> {
        let live: Vec<LiveCall> = conf
            .video()
            .list_live_calls()
            .await?
            .into_iter()
            .filter(LiveCall::is_live)
            .collect();

        let mut report = ReconcileReport::default();

        let discovery = settle(
            "room-discovery",
            live.iter()
                .map(|call| (call.unique_name.clone(), self.discover(conf, call))),
        )
        .await;
        report.discovered = discovery.succeeded.iter().filter(|created| **created).count();
        report.failures.extend(discovery.failed);

        let live_by_id: HashMap<&str, &LiveCall> =
            live.iter().map(|c| (c.call_id.as_str(), c)).collect();
        let rooms = self.store.rooms().list_by_tenant(conf.tenant_id()).await?;
        let convergence = settle(
            "room-convergence",
            rooms.into_iter().map(|room| {
                let label = room.title.clone();
                (label, self.converge_room(conf, room, &live_by_id))
            }),
        )
        .await;
        for outcome in convergence.succeeded {
            match outcome {
                RoomOutcome::Converged => report.converged += 1,
                RoomOutcome::Downgraded => report.downgraded += 1,
                RoomOutcome::Removed => report.removed += 1,
                RoomOutcome::Dormant => {}
            }
        }
        report.failures.extend(convergence.failed);

        info!(
            conference = %conf.tenant_id(),
            live = live.len(),
            discovered = report.discovered,
            converged = report.converged,
            downgraded = report.downgraded,
            removed = report.removed,
            failed = report.failures.len(),
            "Rooms reconciled"
        );
        Ok(report)
    }

    /// Create an ephemeral room for a live call nobody has recorded.
    /// Returns whether a room was created or adopted.
    async fn discover(&self, conf: &Conference, call: &LiveCall) -> HuddleResult<bool> {
        let rooms = self.store.rooms();
        if let Some(room) = rooms.find_by_call_id(conf.tenant_id(), &call.call_id).await? {
            conf.track_call(&call.call_id, room.id);
            return Ok(false);
        }

        let conference_role = self
            .roles
            .get_or_create_role(conf.tenant_id(), RoleSuffix::Conference)
            .await?;
        let created = rooms
            .create(CreateRoom {
                tenant_id: conf.tenant_id(),
                title: call.unique_name.clone(),
                call_id: Some(call.call_id.clone()),
                persistence: Persistence::Ephemeral,
                visibility: Visibility::Public,
                mode: call.mode,
                capacity: Some(call.mode.capacity()),
                acl: Acl::private().with_role_read(conference_role.id),
            })
            .await;

        let room = match created {
            Ok(room) => {
                info!(conference = %conf.tenant_id(), room = %room.title, call = %call.call_id, "Room discovered");
                room
            }
            // A room with this title exists: it now owns the call.
            Err(e) if e.is_conflict() => {
                let mut room = rooms
                    .find_by_title(conf.tenant_id(), &call.unique_name)
                    .await?
                    .ok_or(e)?;
                if room.call_id.as_deref() == Some(call.call_id.as_str()) {
                    conf.track_call(&call.call_id, room.id);
                    return Ok(false);
                }
                room.call_id = Some(call.call_id.clone());
                let room = rooms.save(&room).await?;
                info!(conference = %conf.tenant_id(), room = %room.title, call = %call.call_id, "Room adopted live call");
                room
            }
            Err(e) => return Err(e),
        };
        conf.track_call(&call.call_id, room.id);
        Ok(true)
    }

    async fn converge_room(
        &self,
        conf: &Conference,
        mut room: Room,
        live: &HashMap<&str, &LiveCall>,
    ) -> HuddleResult<RoomOutcome> {
        if room.is_dormant() {
            return Ok(RoomOutcome::Dormant);
        }

        let call = room.call_id.as_deref().and_then(|id| live.get(id).copied());
        match call {
            Some(call) => {
                self.sync_members(conf, &mut room, &call.call_id).await?;
                room.last_observed_at = Some(Utc::now());
                self.store.rooms().save(&room).await?;
                conf.track_call(&call.call_id, room.id);
                Ok(RoomOutcome::Converged)
            }
            None => self.end_call(conf, room).await,
        }
    }

    /// Make the room's member set equal to the call's connected
    /// participants. Malformed or unknown identities are skipped.
    async fn sync_members(&self, conf: &Conference, room: &mut Room, call_id: &str) -> HuddleResult<()> {
        let participants = conf.video().list_participants(call_id).await?;

        let mut connected = HashSet::new();
        for participant in participants
            .iter()
            .filter(|p| p.status == ParticipantStatus::Connected)
        {
            match participant.identity.parse::<ParticipantIdentity>() {
                Ok(identity) => {
                    connected.insert(identity.profile_id);
                }
                Err(e) => {
                    warn!(room = %room.title, identity = %participant.identity, error = %e, "Skipping malformed participant");
                }
            }
        }

        for profile_id in &connected {
            if room.has_member(*profile_id) {
                continue;
            }
            match self.known_profile(conf, *profile_id).await {
                Ok(()) => {
                    room.add_member(*profile_id);
                }
                Err(e) => {
                    warn!(room = %room.title, profile = %profile_id, error = %e, "Skipping unknown participant");
                }
            }
        }
        room.members.retain(|m| connected.contains(m));
        Ok(())
    }

    async fn known_profile(&self, conf: &Conference, profile_id: Uuid) -> HuddleResult<()> {
        let profile = self.store.profiles().get_by_id(profile_id).await?;
        if profile.tenant_id != conf.tenant_id() {
            return Err(HuddleError::not_found("profile", profile_id));
        }
        Ok(())
    }

    /// The room's call is over: downgrade persistent rooms, delete
    /// ephemeral ones.
    async fn end_call(&self, conf: &Conference, mut room: Room) -> HuddleResult<RoomOutcome> {
        if let Some(call_id) = room.call_id.take() {
            conf.forget_call(&call_id);
        }
        match room.persistence {
            Persistence::Persistent => {
                room.members.clear();
                self.store.rooms().save(&room).await?;
                info!(conference = %conf.tenant_id(), room = %room.title, "Persistent room downgraded");
                Ok(RoomOutcome::Downgraded)
            }
            Persistence::Ephemeral => {
                self.store.rooms().delete(conf.tenant_id(), room.id).await?;
                info!(conference = %conf.tenant_id(), room = %room.title, "Ephemeral room removed");
                Ok(RoomOutcome::Removed)
            }
        }
    }

    /// Apply one provider lifecycle callback.
    pub async fn apply_event(&self, conf: &Conference, event: CallEvent) -> HuddleResult<()> {
        let room = self.room_for_call(conf, &event.call_id).await?;

        match event.kind {
            CallEventKind::ParticipantConnected => {
                let identity = parse_event_identity(&event)?;
                let Some(mut room) = room else {
                    debug!(call = %event.call_id, "Connect for unknown call, reconciling");
                    self.reconcile(conf).await?;
                    return Ok(());
                };
                self.known_profile(conf, identity.profile_id).await?;
                if room.add_member(identity.profile_id) {
                    room.last_observed_at = Some(Utc::now());
                    self.store.rooms().save(&room).await?;
                }
            }
            CallEventKind::ParticipantDisconnected => {
                let identity = parse_event_identity(&event)?;
                if let Some(mut room) = room
                    && room.remove_member(identity.profile_id)
                {
                    self.store.rooms().save(&room).await?;
                }
            }
            CallEventKind::RoomEnded => match room {
                Some(room) => {
                    self.end_call(conf, room).await?;
                }
                None => debug!(call = %event.call_id, "Ended call has no room"),
            },
            CallEventKind::Other(kind) => debug!(kind = %kind, "Ignoring call event"),
        }
        Ok(())
    }

    async fn room_for_call(&self, conf: &Conference, call_id: &str) -> HuddleResult<Option<Room>> {
        let rooms = self.store.rooms();
        if let Some(room_id) = conf.room_for_call(call_id) {
            match rooms.get_by_id(conf.tenant_id(), room_id).await {
                Ok(room) if room.call_id.as_deref() == Some(call_id) => return Ok(Some(room)),
                Ok(_) => conf.forget_call(call_id),
                Err(e) if e.is_not_found() => conf.forget_call(call_id),
                Err(e) => return Err(e),
            }
        }
        let room = rooms.find_by_call_id(conf.tenant_id(), call_id).await?;
        if let Some(room) = &room {
            conf.track_call(call_id, room.id);
        }
        Ok(room)
    }

    /// Give a dormant persistent room a live call. When the provider
    /// rejects the create because the name is taken, the existing call
    /// is adopted instead.
    pub async fn open_call(&self, conf: &Conference, mut room: Room) -> HuddleResult<Room> {
        let created = conf
            .video()
            .create_call(CreateCall {
                unique_name: room.title.clone(),
                mode: room.mode,
                max_participants: room.capacity.unwrap_or_else(|| room.mode.capacity()),
                status_callback: Some(conf.status_callback()),
            })
            .await;
        let call = match created {
            Ok(call) => call,
            Err(e) => {
                debug!(room = %room.title, error = %e, "Create call failed, fetching by name");
                conf.video().fetch_call_by_name(&room.title).await?
            }
        };

        room.call_id = Some(call.call_id.clone());
        let room = self.store.rooms().save(&room).await?;
        conf.track_call(&call.call_id, room.id);
        info!(conference = %conf.tenant_id(), room = %room.title, call = %call.call_id, "Call opened");
        Ok(room)
    }
}

fn parse_event_identity(event: &CallEvent) -> HuddleResult<ParticipantIdentity> {
    event
        .identity
        .as_deref()
        .ok_or_else(|| HuddleError::validation("participant event without identity"))?
        .parse()
}
