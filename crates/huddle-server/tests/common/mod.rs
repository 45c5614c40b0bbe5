//! Router wired to an in-memory store and in-process collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, Response, header};
use huddle_auth::config::HandoffConfig;
use huddle_auth::service::HandoffService;
use huddle_conference::install::InstallService;
use huddle_conference::{ConferenceRegistry, Gateway};
use huddle_core::chat::{
    ChatChannel, ChatInstaller, ChatMember, ChatMessage, ChatPlatform, InstallGrant,
};
use huddle_core::config::{ConferenceConfig, ConfigDefaults};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::factory::ClientFactory;
use huddle_core::models::account::Account;
use huddle_core::models::privilege::{Grantee, PrivilegedActionKind};
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::session::CreateSession;
use huddle_core::models::tenant::{CreateTenant, Tenant};
use huddle_core::repository::{SessionRepository, Store, TenantRepository};
use huddle_core::video::{
    CallParticipant, CallStatus, CreateCall, LiveCall, ProvisionedVideoAccount,
    VideoAccountProvisioner, VideoProvider,
};
use huddle_db::SurrealStore;
use huddle_server::{AppState, router};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tower::ServiceExt;

pub type TestStore = SurrealStore<Db>;

pub const WORKSPACE: &str = "T0001";
pub const SIGNING_SECRET: &str = "test-signing-secret";

#[derive(Default)]
pub struct FakeVideo {
    calls: Mutex<Vec<LiveCall>>,
    participants: Mutex<HashMap<String, Vec<CallParticipant>>>,
    next_id: AtomicUsize,
}

#[async_trait]
impl VideoProvider for FakeVideo {
    async fn list_live_calls(&self) -> HuddleResult<Vec<LiveCall>> {
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

    async fn disconnect_participant(&self, _: &str, _: &str) -> HuddleResult<()> {
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

#[derive(Default)]
pub struct FakeChat {
    pub members: Mutex<Vec<ChatMember>>,
    pub responses: Mutex<Vec<(String, serde_json::Value)>>,
    pub homes: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn add_member(&self, id: &str, email: &str, real_name: &str) {
        self.members.lock().unwrap().push(ChatMember {
            id: id.into(),
            email: Some(email.into()),
            real_name: Some(real_name.into()),
            is_bot: false,
            deleted: false,
        });
    }
}

#[async_trait]
impl ChatPlatform for FakeChat {
    async fn list_members(&self) -> HuddleResult<Vec<ChatMember>> {
        Ok(self.members.lock().unwrap().clone())
    }

    async fn user_info(&self, user_id: &str) -> HuddleResult<ChatMember> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == user_id)
            .cloned()
            .ok_or_else(|| HuddleError::not_found("chat user", user_id))
    }

    async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>> {
        Ok(vec![ChatChannel {
            id: "C-MODS".into(),
            name: "moderators".into(),
        }])
    }

    async fn post_message(&self, _: ChatMessage) -> HuddleResult<()> {
        Ok(())
    }

    async fn respond(&self, response_url: &str, body: serde_json::Value) -> HuddleResult<()> {
        self.responses
            .lock()
            .unwrap()
            .push((response_url.to_string(), body));
        Ok(())
    }

    async fn publish_home(&self, user_id: &str, _: serde_json::Value) -> HuddleResult<()> {
        self.homes.lock().unwrap().push(user_id.to_string());
        Ok(())
    }
}

struct FakeFactory {
    video: Arc<FakeVideo>,
    chat: Arc<FakeChat>,
}

impl ClientFactory for FakeFactory {
    fn video(&self, _: &ConferenceConfig) -> HuddleResult<Arc<dyn VideoProvider>> {
        Ok(self.video.clone())
    }

    fn chat(&self, _: &ConferenceConfig) -> HuddleResult<Arc<dyn ChatPlatform>> {
        Ok(self.chat.clone())
    }
}

/// Grants every code for workspace `T0002`, except `denied`.
struct FakeInstaller;

#[async_trait]
impl ChatInstaller for FakeInstaller {
    async fn exchange_code(&self, code: &str) -> HuddleResult<InstallGrant> {
        if code == "denied" {
            return Err(HuddleError::external("slack", "invalid_code"));
        }
        Ok(InstallGrant {
            bot_token: format!("xoxb-{code}"),
            bot_user_id: "UBOT".into(),
            workspace_id: "T0002".into(),
            workspace_name: "Second Conf".into(),
        })
    }
}

struct FakeProvisioner;

#[async_trait]
impl VideoAccountProvisioner for FakeProvisioner {
    async fn provision_account(&self, _: &str) -> HuddleResult<ProvisionedVideoAccount> {
        Ok(ProvisionedVideoAccount {
            account_sid: "AC-sub".into(),
            auth_token: "sub-auth".into(),
            api_key: "SK-sub".into(),
            api_secret: "sub-secret".into(),
        })
    }
}

pub struct Harness {
    pub store: Arc<TestStore>,
    pub video: Arc<FakeVideo>,
    pub chat: Arc<FakeChat>,
    pub registry: Arc<ConferenceRegistry<TestStore>>,
    pub tenant: Tenant,
    pub app: Router,
}

pub async fn setup() -> Harness {
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

    let video = Arc::new(FakeVideo::default());
    let chat = Arc::new(FakeChat::default());
    let registry = Arc::new(ConferenceRegistry::new(
        store.clone(),
        Arc::new(FakeFactory {
            video: video.clone(),
            chat: chat.clone(),
        }),
        ConfigDefaults {
            frontend_url: "https://video.example".into(),
            video_callback_url: "https://api.example/twilio/event".into(),
        },
    ));
    registry.roles().create_privileges().await.unwrap();

    let handoff = Arc::new(HandoffService::new(
        store.clone(),
        HandoffConfig {
            signing_key: "server-tests".into(),
            ..HandoffConfig::default()
        },
    ));
    let gateway = Arc::new(Gateway::new(registry.clone(), handoff));
    let install = Arc::new(InstallService::new(
        store.clone(),
        Arc::new(FakeInstaller),
        Arc::new(FakeProvisioner),
        "https://huddle.example/installed",
    ));
    let app = router(AppState::new(gateway, install, SIGNING_SECRET));

    Harness {
        store,
        video,
        chat,
        registry,
        tenant,
        app,
    }
}

impl Harness {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Bridge a chat member into the conference.
    pub async fn chat_user(&self, chat_user_id: &str, email: &str, name: &str) -> Account {
        self.chat.add_member(chat_user_id, email, name);
        let conf = self.registry.resolve(WORKSPACE).await.unwrap();
        self.registry
            .bridge()
            .get_or_create_account(&conf, chat_user_id, None)
            .await
            .unwrap()
    }

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
}

pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Chat callback signed the way the platform signs it.
pub fn signed_post(uri: &str, content_type: &str, body: &str) -> Request<Body> {
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let signature =
        huddle_server::signature::sign(SIGNING_SECRET, &timestamp, body.as_bytes()).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .header(huddle_server::signature::TIMESTAMP_HEADER, timestamp)
        .header(huddle_server::signature::SIGNATURE_HEADER, signature)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
