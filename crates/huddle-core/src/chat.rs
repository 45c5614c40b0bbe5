//! Contract of the team-messaging platform.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::HuddleResult;

/// A workspace member as reported by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMember {
    pub id: String,
    pub email: Option<String>,
    pub real_name: Option<String>,
    pub is_bot: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChannel {
    pub id: String,
    pub name: String,
}

/// Message posted to a channel; `blocks` is the platform's rich layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: String,
    pub text: String,
    pub blocks: serde_json::Value,
}

/// Result of the OAuth-style install exchange.
#[derive(Debug, Clone)]
pub struct InstallGrant {
    pub bot_token: String,
    pub bot_user_id: String,
    pub workspace_id: String,
    pub workspace_name: String,
}

/// Tenant-scoped client of the chat platform, authenticated with the
/// tenant's bot token.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn list_members(&self) -> HuddleResult<Vec<ChatMember>>;
    async fn user_info(&self, user_id: &str) -> HuddleResult<ChatMember>;
    async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>>;
    async fn post_message(&self, message: ChatMessage) -> HuddleResult<()>;
    /// Reply through a slash-command response URL.
    async fn respond(&self, response_url: &str, body: serde_json::Value) -> HuddleResult<()>;
    async fn publish_home(&self, user_id: &str, view: serde_json::Value) -> HuddleResult<()>;
}

/// App-level credentials used to complete an install.
#[async_trait]
pub trait ChatInstaller: Send + Sync {
    async fn exchange_code(&self, code: &str) -> HuddleResult<InstallGrant>;
}
