//! Runtime view of one tenant.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use huddle_core::chat::{ChatChannel, ChatPlatform};
use huddle_core::config::ConferenceConfig;
use huddle_core::models::tenant::Tenant;
use huddle_core::video::VideoProvider;
use uuid::Uuid;

pub const MODERATORS_CHANNEL: &str = "moderators";
pub const TECH_SUPPORT_CHANNEL: &str = "technical-support";

/// Chat channels a conference posts to, looked up by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    pub moderators: Option<String>,
    pub technical_support: Option<String>,
}

impl ChannelBindings {
    pub fn from_channels(channels: &[ChatChannel]) -> Self {
        let find = |name: &str| {
            channels
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.id.clone())
        };
        Self {
            moderators: find(MODERATORS_CHANNEL),
            technical_support: find(TECH_SUPPORT_CHANNEL),
        }
    }
}

/// Configuration, collaborator clients and cached state of a tenant.
///
/// Built by the registry and shared behind an `Arc` for the rest of
/// the process lifetime.
pub struct Conference {
    tenant: Tenant,
    workspace_id: String,
    config: ConferenceConfig,
    video: Arc<dyn VideoProvider>,
    chat: Arc<dyn ChatPlatform>,
    channels: OnceLock<ChannelBindings>,
    /// Provider call id -> room id of every call seen live.
    calls: DashMap<String, Uuid>,
}

impl Conference {
    pub fn new(
        tenant: Tenant,
        workspace_id: impl Into<String>,
        config: ConferenceConfig,
        video: Arc<dyn VideoProvider>,
        chat: Arc<dyn ChatPlatform>,
    ) -> Self {
        Self {
            tenant,
            workspace_id: workspace_id.into(),
            config,
            video,
            chat,
            channels: OnceLock::new(),
            calls: DashMap::new(),
        }
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant.id
    }

    pub fn name(&self) -> &str {
        &self.tenant.name
    }

    pub fn workspace_id(&self) -> &str {
        &self.workspace_id
    }

    pub fn config(&self) -> &ConferenceConfig {
        &self.config
    }

    pub fn video(&self) -> &dyn VideoProvider {
        self.video.as_ref()
    }

    pub fn chat(&self) -> &dyn ChatPlatform {
        self.chat.as_ref()
    }

    /// Status callback URL handed to the provider for this tenant's
    /// calls. Carries the workspace id so callbacks can be routed back.
    pub fn status_callback(&self) -> String {
        let base = &self.config.video_callback_url;
        let sep = if base.contains('?') { '&' } else { '?' };
        format!(
            "{base}{sep}conference={}",
            urlencoding::encode(&self.workspace_id)
        )
    }

    /// Bind channels. Only the first call has any effect.
    pub fn bind_channels(&self, bindings: ChannelBindings) {
        let _ = self.channels.set(bindings);
    }

    pub fn moderator_channel(&self) -> Option<&str> {
        self.channels.get().and_then(|c| c.moderators.as_deref())
    }

    pub fn tech_support_channel(&self) -> Option<&str> {
        self.channels
            .get()
            .and_then(|c| c.technical_support.as_deref())
    }

    pub fn track_call(&self, call_id: &str, room_id: Uuid) {
        self.calls.insert(call_id.to_string(), room_id);
    }

    pub fn forget_call(&self, call_id: &str) {
        self.calls.remove(call_id);
    }

    pub fn room_for_call(&self, call_id: &str) -> Option<Uuid> {
        self.calls.get(call_id).map(|r| *r.value())
    }

    pub fn tracked_calls(&self) -> usize {
        self.calls.len()
    }
}

impl std::fmt::Debug for Conference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conference")
            .field("tenant", &self.tenant.id)
            .field("workspace_id", &self.workspace_id)
            .field("channels", &self.channels.get())
            .finish_non_exhaustive()
    }
}
