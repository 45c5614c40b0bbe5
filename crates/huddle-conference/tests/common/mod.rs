//! In-process fakes of the video provider and chat platform, plus a
//! harness wiring them to an in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use huddle_auth::config::HandoffConfig;
use huddle_auth::service::HandoffService;
use huddle_conference::{ConferenceRegistry, Gateway};
use huddle_core::chat::{ChatChannel, ChatMember, ChatMessage, ChatPlatform};
use huddle_core::config::{ConferenceConfig, ConfigDefaults};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::factory::ClientFactory;
use huddle_core::models::account::{Account, CreateAccount};
use huddle_core::models::privilege::{Grantee, PrivilegedActionKind};
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::session::CreateSession;
use huddle_core::models::tenant::{CreateTenant, Tenant};
use huddle_core::repository::{AccountRepository, SessionRepository, Store, TenantRepository};
use huddle_core::video::{
    CallParticipant, CallStatus, CreateCall, LiveCall, ParticipantStatus, VideoProvider,
};
use huddle_db::SurrealStore;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

pub type TestStore = SurrealStore<Db>;

pub const WORKSPACE: &str = "T0001";

// ---------------------------------------------------------------------------
// Video provider
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeVideo {
    calls: Mutex<Vec<LiveCall>>,
    participants: Mutex<HashMap<String, Vec<CallParticipant>>>,
    pub disconnected: Mutex<Vec<(String, String)>>,
    pub listing_fails: AtomicBool,
    next_id: AtomicUsize,
}

impl FakeVideo {
    /// Register a live call and return its id.
    pub fn start_call(&self, unique_name: &str) -> String {
        let call_id = format!("RM{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.calls.lock().unwrap().push(LiveCall {
            call_id: call_id.clone(),
            unique_name: unique_name.to_string(),
            status: CallStatus::InProgress,
            mode: huddle_core::models::room::RoomMode::Group,
        });
        call_id
    }

    pub fn end_call(&self, call_id: &str) {
        for call in self.calls.lock().unwrap().iter_mut() {
            if call.call_id == call_id {
                call.status = CallStatus::Completed;
            }
        }
    }

    pub fn set_participants(&self, call_id: &str, identities: &[String]) {
        let participants = identities
            .iter()
            .map(|identity| CallParticipant {
                identity: identity.clone(),
                status: ParticipantStatus::Connected,
            })
            .collect();
        self.participants
            .lock()
            .unwrap()
            .insert(call_id.to_string(), participants);
    }

    pub fn live_names(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.is_live())
            .map(|c| c.unique_name.clone())
            .collect()
    }
}

#[async_trait]
impl VideoProvider for FakeVideo {
    async fn list_live_calls(&self) -> HuddleResult<Vec<LiveCall>> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(HuddleError::external("video", "listing unavailable"));
        }
        Ok(self.calls.lock().unwrap().clone())
    }

    async fn create_call(&self, input: CreateCall) -> HuddleResult<LiveCall> {
        let mut calls = self.calls.lock().unwrap();
        if calls
            .iter()
            .any(|c| c.is_live() && c.unique_name == input.unique_name)
        {
            return Err(HuddleError::Conflict {
                entity: "call".into(),
                message: format!("{} is in use", input.unique_name),
            });
        }
        let call = LiveCall {
            call_id: format!("RM{:04}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            unique_name: input.unique_name,
            status: CallStatus::InProgress,
            mode: input.mode,
        };
        calls.push(call.clone());
        Ok(call)
    }

    async fn list_participants(&self, call_id: &str) -> HuddleResult<Vec<CallParticipant>> {
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(call_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn disconnect_participant(&self, call_id: &str, identity: &str) -> HuddleResult<()> {
        self.disconnected
            .lock()
            .unwrap()
            .push((call_id.to_string(), identity.to_string()));
        Ok(())
    }

    async fn fetch_call_by_name(&self, unique_name: &str) -> HuddleResult<LiveCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.is_live() && c.unique_name == unique_name)
            .cloned()
            .ok_or_else(|| HuddleError::not_found("call", unique_name))
    }

    fn access_token(&self, identity: &str, call_name: &str) -> HuddleResult<String> {
        Ok(format!("video-token:{identity}:{call_name}"))
    }
}

// ---------------------------------------------------------------------------
// Chat platform
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeChat {
    pub members: Mutex<Vec<ChatMember>>,
    pub channels: Vec<ChatChannel>,
    pub posted: Mutex<Vec<ChatMessage>>,
    pub responses: Mutex<Vec<(String, serde_json::Value)>>,
    pub homes: Mutex<Vec<(String, serde_json::Value)>>,
    pub user_info_calls: AtomicUsize,
}

impl FakeChat {
    pub fn with_moderators_channel() -> Self {
        Self {
            channels: vec![
                ChatChannel {
                    id: "C-GENERAL".into(),
                    name: "general".into(),
                },
                ChatChannel {
                    id: "C-MODS".into(),
                    name: "moderators".into(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn add_member(&self, id: &str, email: Option<&str>, real_name: &str) {
        self.members.lock().unwrap().push(member(id, email, real_name));
    }
}

pub fn member(id: &str, email: Option<&str>, real_name: &str) -> ChatMember {
    ChatMember {
        id: id.into(),
        email: email.map(Into::into),
        real_name: Some(real_name.into()),
        is_bot: false,
        deleted: false,
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn list_members(&self) -> HuddleResult<Vec<ChatMember>> {
        Ok(self.members.lock().unwrap().clone())
    }

    async fn user_info(&self, user_id: &str) -> HuddleResult<ChatMember> {
        self.user_info_calls.fetch_add(1, Ordering::SeqCst);
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == user_id)
            .cloned()
            .ok_or_else(|| HuddleError::not_found("chat user", user_id))
    }

    async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>> {
        Ok(self.channels.clone())
    }

    async fn post_message(&self, message: ChatMessage) -> HuddleResult<()> {
        self.posted.lock().unwrap().push(message);
        Ok(())
    }

    async fn respond(&self, response_url: &str, body: serde_json::Value) -> HuddleResult<()> {
        self.responses
            .lock()
            .unwrap()
            .push((response_url.to_string(), body));
        Ok(())
    }

    async fn publish_home(&self, user_id: &str, view: serde_json::Value) -> HuddleResult<()> {
        self.homes.lock().unwrap().push((user_id.to_string(), view));
        Ok(())
    }
}

pub struct FakeFactory {
    pub video: Arc<FakeVideo>,
    pub chat: Arc<FakeChat>,
}

impl ClientFactory for FakeFactory {
    fn video(&self, _: &ConferenceConfig) -> HuddleResult<Arc<dyn VideoProvider>> {
        Ok(self.video.clone())
    }

    fn chat(&self, _: &ConferenceConfig) -> HuddleResult<Arc<dyn ChatPlatform>> {
        Ok(self.chat.clone())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<TestStore>,
    pub video: Arc<FakeVideo>,
    pub chat: Arc<FakeChat>,
    pub registry: Arc<ConferenceRegistry<TestStore>>,
    pub handoff: Arc<HandoffService<TestStore>>,
    pub gateway: Gateway<TestStore>,
    pub tenant: Tenant,
}

pub async fn setup() -> Harness {
    setup_with(FakeVideo::default(), FakeChat::with_moderators_channel()).await
}

pub async fn setup_with(video: FakeVideo, chat: FakeChat) -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    huddle_db::run_migrations(&db).await.unwrap();
    let store = Arc::new(SurrealStore::new(db));

    let tenant = store
        .tenants()
        .create(CreateTenant {
            name: "Example Conf".into(),
            workspace_id: Some(WORKSPACE.into()),
            pending_workspace_name: None,
        })
        .await
        .unwrap();

    let video = Arc::new(video);
    let chat = Arc::new(chat);
    let factory = Arc::new(FakeFactory {
        video: video.clone(),
        chat: chat.clone(),
    });
    let registry = Arc::new(ConferenceRegistry::new(
        store.clone(),
        factory,
        ConfigDefaults {
            frontend_url: "https://video.example/".into(),
            video_callback_url: "https://api.example/twilio/event".into(),
        },
    ));
    registry.roles().create_privileges().await.unwrap();

    let handoff = Arc::new(HandoffService::new(
        store.clone(),
        HandoffConfig {
            signing_key: "conference-tests".into(),
            ..HandoffConfig::default()
        },
    ));
    let gateway = Gateway::new(registry.clone(), handoff.clone());

    Harness {
        store,
        video,
        chat,
        registry,
        handoff,
        gateway,
        tenant,
    }
}

impl Harness {
    pub async fn account(&self, email: &str) -> Account {
        self.store
            .accounts()
            .create(CreateAccount {
                username: email.into(),
                email: email.into(),
                display_name: email.split('@').next().unwrap_or(email).into(),
                password: "secret".into(),
            })
            .await
            .unwrap()
    }

    /// Raw session token for `account`.
    pub async fn session(&self, account: &Account) -> String {
        let raw = huddle_auth::token::generate_session_token();
        self.store
            .sessions()
            .create(CreateSession {
                account_id: account.id,
                token: huddle_auth::token::hash_session_token(&raw),
                created_with: "test".into(),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            })
            .await
            .unwrap();
        raw
    }

    /// Grant an action to every member of the tenant's conference role.
    pub async fn grant_to_members(&self, kind: PrivilegedActionKind) {
        let roles = self.registry.roles();
        let role = roles
            .get_or_create_role(self.tenant.id, RoleSuffix::Conference)
            .await
            .unwrap();
        roles
            .grant(self.tenant.id, kind, Grantee::Role(role.id))
            .await
            .unwrap();
    }

    pub async fn enroll(&self, account: &Account, suffix: RoleSuffix) {
        let roles = self.registry.roles();
        let role = roles.get_or_create_role(self.tenant.id, suffix).await.unwrap();
        roles.ensure_member(&role, account.id).await.unwrap();
    }
}
