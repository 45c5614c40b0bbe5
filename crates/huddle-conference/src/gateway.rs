//! Session & access gateway.
//!
//! Every request flow enters here: the caller's session (web) or chat
//! identity (slash commands, events) is resolved to an account, the
//! privileged action is checked, and the work is delegated to the
//! registry's components.

use std::collections::BTreeSet;
use std::sync::Arc;

use huddle_auth::service::{HandoffService, Redemption};
use huddle_core::batch::{BatchReport, settle};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::account::Account;
use huddle_core::models::acl::Acl;
use huddle_core::models::activity::PRIVATE_ROOMS_TOPIC;
use huddle_core::models::privilege::PrivilegedActionKind;
use huddle_core::models::profile::Profile;
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::room::{CreateRoom, Persistence, Room, RoomMode, Visibility};
use huddle_core::repository::{
    AccountRepository, ActivityRepository, ProfileRepository, RoomRepository, Store,
};
use huddle_core::video::{CallEvent, CreateCall, ParticipantIdentity};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::conference::Conference;
use crate::messages::{self, ListedRoom, RoomListing};
use crate::registry::ConferenceRegistry;

/// Rooms shown per chat listing.
const LISTING_LIMIT: usize = 100;

pub const ROOM_NAME_TAKEN: &str = "There is already a video room with this name (although it may be private, and you can't see it). Please either join the existing room or pick a new name.";

#[derive(Debug, Clone, Default)]
pub struct NewRoom {
    pub name: String,
    pub mode: Option<RoomMode>,
    pub persistence: Option<Persistence>,
    pub visibility: Option<Visibility>,
}

/// Credential letting a web client join a room's call.
#[derive(Debug, Clone)]
pub struct VideoGrant {
    pub token: String,
    pub room_title: String,
    pub identity: String,
}

pub struct Gateway<S: Store> {
    registry: Arc<ConferenceRegistry<S>>,
    handoff: Arc<HandoffService<S>>,
}

impl<S: Store> Gateway<S> {
    pub fn new(registry: Arc<ConferenceRegistry<S>>, handoff: Arc<HandoffService<S>>) -> Self {
        Self { registry, handoff }
    }

    pub fn registry(&self) -> &ConferenceRegistry<S> {
        &self.registry
    }

    fn store(&self) -> &S {
        self.registry.store().as_ref()
    }

    /// Resolve a session and the conference it is acting on.
    async fn enter(
        &self,
        session_token: &str,
        workspace_id: &str,
    ) -> HuddleResult<(Arc<Conference>, Account)> {
        let (_, account) = self.handoff.authenticate(session_token).await?;
        let conf = self.registry.resolve(workspace_id).await?;
        Ok((conf, account))
    }

    async fn require(
        &self,
        conf: &Conference,
        account: &Account,
        kind: PrivilegedActionKind,
        denied: impl FnOnce() -> String,
    ) -> HuddleResult<()> {
        if self
            .registry
            .roles()
            .has_permission(account.id, conf.tenant_id(), kind)
            .await?
        {
            Ok(())
        } else {
            Err(HuddleError::unauthorized(denied()))
        }
    }

    async fn profile_of(&self, conf: &Conference, account: &Account) -> HuddleResult<Profile> {
        self.store()
            .profiles()
            .find_by_account(conf.tenant_id(), account.id)
            .await?
            .ok_or_else(|| HuddleError::not_found("profile", account.id))
    }

    /// Load a room the account may read. Unreadable rooms look absent.
    async fn readable_room(&self, conf: &Conference, account: &Account, room_id: Uuid) -> HuddleResult<Room> {
        let room = self.store().rooms().get_by_id(conf.tenant_id(), room_id).await?;
        let role_ids = self.registry.roles().effective_role_ids(account.id).await?;
        if room.acl.can_read(account.id, &role_ids) {
            Ok(room)
        } else {
            Err(HuddleError::not_found("room", room_id))
        }
    }

    /// Create a room and its live call.
    pub async fn create_room(
        &self,
        session_token: &str,
        workspace_id: &str,
        request: NewRoom,
    ) -> HuddleResult<Room> {
        let (conf, account) = self.enter(session_token, workspace_id).await?;
        self.require(&conf, &account, PrivilegedActionKind::CreateVideoRoom, || {
            format!(
                "Sorry, you do not currently have access to create video rooms for {}",
                conf.name()
            )
        })
        .await?;

        let name = request.name.trim();
        if name.is_empty() {
            return Err(HuddleError::validation("You need to specify a room name"));
        }
        let mode = request.mode.unwrap_or(conf.config().room_mode);
        let persistence = request.persistence.unwrap_or_default();
        let visibility = request.visibility.unwrap_or_default();

        let taken = || HuddleError::Conflict {
            entity: "room".into(),
            message: ROOM_NAME_TAKEN.into(),
        };
        let rooms = self.store().rooms();
        if rooms.find_by_title(conf.tenant_id(), name).await?.is_some() {
            return Err(taken());
        }

        let roles = self.registry.roles();
        let moderators = roles
            .get_or_create_role(conf.tenant_id(), RoleSuffix::Moderator)
            .await?;
        let mut acl = Acl::private().with_role_read(moderators.id);
        acl = match visibility {
            Visibility::Unlisted => acl.with_account_read(account.id),
            Visibility::Public => {
                let members = roles
                    .get_or_create_role(conf.tenant_id(), RoleSuffix::Conference)
                    .await?;
                acl.with_role_read(members.id)
            }
        };

        let call = conf
            .video()
            .create_call(CreateCall {
                unique_name: name.to_string(),
                mode,
                max_participants: mode.capacity(),
                status_callback: Some(conf.status_callback()),
            })
            .await
            .map_err(|e| if e.is_conflict() { taken() } else { e })?;

        let room = rooms
            .create(CreateRoom {
                tenant_id: conf.tenant_id(),
                title: name.to_string(),
                call_id: Some(call.call_id.clone()),
                persistence,
                visibility,
                mode,
                capacity: Some(mode.capacity()),
                acl,
            })
            .await
            .map_err(|e| if e.is_conflict() { taken() } else { e })?;

        conf.track_call(&call.call_id, room.id);
        info!(conference = %conf.tenant_id(), room = %room.title, account = %account.id, "Room created");
        Ok(room)
    }

    /// Replace the per-account read list of a room. Accounts that lose
    /// access are dropped from the live call; every changed account's
    /// private-rooms marker is touched.
    pub async fn update_acl(
        &self,
        session_token: &str,
        workspace_id: &str,
        room_id: Uuid,
        readers: Vec<Uuid>,
    ) -> HuddleResult<BatchReport<()>> {
        let (conf, account) = self.enter(session_token, workspace_id).await?;
        let mut room = self.readable_room(&conf, &account, room_id).await?;

        let wanted: BTreeSet<Uuid> = readers.into_iter().collect();
        let removed: Vec<Uuid> = room.acl.read_accounts.difference(&wanted).copied().collect();
        let added: Vec<Uuid> = wanted.difference(&room.acl.read_accounts).copied().collect();

        room.acl.read_accounts = wanted;
        let room = self.store().rooms().save(&room).await?;

        let mut work: Vec<(String, futures::future::BoxFuture<'_, HuddleResult<()>>)> = Vec::new();
        if let Some(call_id) = room.call_id.as_deref() {
            for id in &removed {
                work.push((
                    format!("disconnect {id}"),
                    Box::pin(self.disconnect(&conf, call_id, *id)),
                ));
            }
        }
        for id in removed.iter().chain(&added) {
            let (account_id, tenant_id) = (*id, conf.tenant_id());
            work.push((
                format!("refresh {id}"),
                Box::pin(async move {
                    self.store()
                        .activity()
                        .touch(account_id, tenant_id, PRIVATE_ROOMS_TOPIC)
                        .await
                        .map(|_| ())
                }),
            ));
        }

        info!(
            room = %room.title,
            removed = removed.len(),
            added = added.len(),
            "Room access updated"
        );
        Ok(settle("acl-update", work).await)
    }

    /// Best effort: the account may already have left.
    async fn disconnect(&self, conf: &Conference, call_id: &str, account_id: Uuid) -> HuddleResult<()> {
        let account = self.store().accounts().get_by_id(account_id).await?;
        let Some(profile) = self
            .store()
            .profiles()
            .find_by_account(conf.tenant_id(), account_id)
            .await?
        else {
            return Ok(());
        };
        let identity = ParticipantIdentity::new(profile.id, account.display_name).to_string();
        if let Err(e) = conf.video().disconnect_participant(call_id, &identity).await {
            debug!(identity = %identity, error = %e, "Disconnect skipped");
        }
        Ok(())
    }

    /// Post a moderation request raised from a web room.
    pub async fn escalate_to_moderators(
        &self,
        session_token: &str,
        workspace_id: &str,
        room_id: Uuid,
        participants: Vec<Uuid>,
        message: &str,
    ) -> HuddleResult<()> {
        let (conf, account) = self.enter(session_token, workspace_id).await?;
        let reporter = self.profile_of(&conf, &account).await?;
        let room = self.readable_room(&conf, &account, room_id).await?;
        let channel = conf
            .moderator_channel()
            .ok_or_else(|| HuddleError::not_found("channel", crate::conference::MODERATORS_CHANNEL))?;

        let mut participant_ids = Vec::with_capacity(participants.len());
        for profile_id in participants {
            match self.store().profiles().get_by_id(profile_id).await {
                Ok(profile) => participant_ids.push(profile.chat_user_id),
                Err(e) => warn!(profile = %profile_id, error = %e, "Skipping unknown participant"),
            }
        }

        conf.chat()
            .post_message(messages::moderation_from_web(
                channel,
                &reporter.chat_user_id,
                &room.title,
                &participant_ids,
                message,
            ))
            .await?;
        info!(conference = %conf.tenant_id(), room = %room.title, "Moderation request posted");
        Ok(())
    }

    /// Post a moderation request raised with a slash command.
    pub async fn moderator_from_chat(
        &self,
        workspace_id: &str,
        chat_user_id: &str,
        message: &str,
    ) -> HuddleResult<()> {
        let conf = self.registry.resolve(workspace_id).await?;
        let channel = conf
            .moderator_channel()
            .ok_or_else(|| HuddleError::not_found("channel", crate::conference::MODERATORS_CHANNEL))?;
        conf.chat()
            .post_message(messages::moderation_from_chat(channel, chat_user_id, message))
            .await
    }

    /// Provider token for joining a room's call, opening the call first
    /// when a persistent room is dormant.
    pub async fn mint_video_token(
        &self,
        session_token: &str,
        workspace_id: &str,
        room_id: Uuid,
    ) -> HuddleResult<VideoGrant> {
        let (conf, account) = self.enter(session_token, workspace_id).await?;
        let profile = self.profile_of(&conf, &account).await?;
        let identity = ParticipantIdentity::new(profile.id, account.display_name.clone()).to_string();

        let mut room = self.readable_room(&conf, &account, room_id).await?;
        if room.call_id.is_none() {
            if room.persistence != Persistence::Persistent {
                return Err(HuddleError::not_found("room", "This room has been deleted"));
            }
            room = self.registry.reconciler().open_call(&conf, room).await?;
        }

        let call_id = room
            .call_id
            .as_deref()
            .ok_or_else(|| HuddleError::Internal(format!("room {} has no call", room.id)))?;
        let token = conf.video().access_token(&identity, call_id)?;
        Ok(VideoGrant {
            token,
            room_title: room.title,
            identity,
        })
    }

    /// Frontend link that logs the user in and sends them to `room_name`.
    pub async fn join_link(&self, conf: &Conference, account: &Account, room_name: &str) -> HuddleResult<String> {
        let token = self
            .handoff
            .mint(account.id, conf.workspace_id(), room_name)
            .await?;
        Ok(format!(
            "{}/fromSlack/{}/{}/{}",
            conf.config().frontend_url.trim_end_matches('/'),
            urlencoding::encode(conf.workspace_id()),
            urlencoding::encode(room_name),
            urlencoding::encode(&token)
        ))
    }

    /// Link for the `/video <room>` slash command.
    pub async fn chat_join_link(
        &self,
        workspace_id: &str,
        chat_user_id: &str,
        room_name: &str,
    ) -> HuddleResult<String> {
        let room_name = room_name.trim();
        if room_name.is_empty() {
            return Err(HuddleError::validation("You need to specify a room name"));
        }
        if room_name.starts_with('!') {
            return Err(HuddleError::validation(
                "Room names can not begin with special characters",
            ));
        }

        let conf = self.registry.resolve(workspace_id).await?;
        let account = self
            .registry
            .bridge()
            .get_or_create_account(&conf, chat_user_id, None)
            .await?;
        self.require(&conf, &account, PrivilegedActionKind::AccessFromChat, || {
            format!("You do not currently have access to video rooms at {}", conf.name())
        })
        .await?;

        self.join_link(&conf, &account, room_name).await
    }

    /// Rooms the chat user can read, with members and join links.
    pub async fn list_rooms_for_chat(
        &self,
        workspace_id: &str,
        chat_user_id: &str,
    ) -> HuddleResult<RoomListing> {
        let conf = self.registry.resolve(workspace_id).await?;
        let account = self
            .registry
            .bridge()
            .get_or_create_account(&conf, chat_user_id, None)
            .await?;
        let roles = self.registry.roles();
        if !roles
            .has_permission(account.id, conf.tenant_id(), PrivilegedActionKind::AccessFromChat)
            .await?
        {
            return Ok(RoomListing::NotEnabled);
        }

        let role_ids = roles.effective_role_ids(account.id).await?;
        let rooms: Vec<Room> = self
            .store()
            .rooms()
            .list_by_tenant(conf.tenant_id())
            .await?
            .into_iter()
            .filter(|room| room.acl.can_read(account.id, &role_ids))
            .take(LISTING_LIMIT)
            .collect();

        let mut listed = Vec::with_capacity(rooms.len());
        for room in rooms {
            let mut member_chat_ids = Vec::with_capacity(room.members.len());
            for profile_id in &room.members {
                if let Ok(profile) = self.store().profiles().get_by_id(*profile_id).await {
                    member_chat_ids.push(profile.chat_user_id);
                }
            }
            listed.push(ListedRoom {
                link: self.join_link(&conf, &account, &room.title).await?,
                title: room.title,
                member_chat_ids,
            });
        }
        Ok(RoomListing::Rooms(listed))
    }

    /// Refresh the chat user's app home with the current room listing.
    pub async fn publish_home(&self, workspace_id: &str, chat_user_id: &str) -> HuddleResult<()> {
        let listing = self.list_rooms_for_chat(workspace_id, chat_user_id).await?;
        let conf = self.registry.resolve(workspace_id).await?;
        conf.chat()
            .publish_home(chat_user_id, messages::home_view(conf.name(), &listing))
            .await
    }

    /// A new member joined the chat workspace.
    pub async fn team_join(&self, workspace_id: &str, chat_user_id: &str) -> HuddleResult<Account> {
        let conf = self.registry.resolve(workspace_id).await?;
        let account = self
            .registry
            .bridge()
            .get_or_create_account(&conf, chat_user_id, None)
            .await?;
        info!(conference = %conf.tenant_id(), account = %account.id, "Workspace member bridged");
        Ok(account)
    }

    pub async fn redeem(&self, handoff_token: &str) -> HuddleResult<Redemption> {
        self.handoff.redeem(handoff_token).await
    }

    /// Apply a provider lifecycle callback to the conference it
    /// belongs to.
    pub async fn process_call_event(&self, workspace_id: &str, event: CallEvent) -> HuddleResult<()> {
        let conf = self.registry.resolve(workspace_id).await?;
        self.registry.reconciler().apply_event(&conf, event).await
    }
}
