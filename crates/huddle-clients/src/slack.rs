//! Slack Web API client and OAuth install exchange.

use async_trait::async_trait;
use huddle_core::chat::{
    ChatChannel, ChatInstaller, ChatMember, ChatMessage, ChatPlatform, InstallGrant,
};
use huddle_core::error::HuddleResult;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::ClientError;

pub const API_BASE_URL: &str = "https://slack.com/api";

const SERVICE: &str = "slack";
const PAGE_LIMIT: &str = "200";

/// Every Web API response carries `ok`, and `error` when it is false.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    body: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMetadata {
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserProfile {
    email: Option<String>,
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    #[serde(default)]
    profile: UserProfile,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    deleted: bool,
}

impl From<User> for ChatMember {
    fn from(user: User) -> Self {
        ChatMember {
            id: user.id,
            email: user.profile.email,
            real_name: user.profile.real_name,
            is_bot: user.is_bot,
            deleted: user.deleted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    members: Vec<User>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: User,
}

#[derive(Debug, Deserialize)]
struct ChannelsPage {
    channels: Vec<ChatChannel>,
    #[serde(default)]
    response_metadata: ResponseMetadata,
}

#[derive(Debug, Deserialize)]
struct Team {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct OauthAccess {
    access_token: String,
    bot_user_id: String,
    team: Team,
}

async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await.map_err(ClientError::network(SERVICE))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Api {
            service: SERVICE,
            status: status.as_u16(),
            code: None,
            message: status.canonical_reason().unwrap_or("unknown").to_string(),
        });
    }
    let envelope: Envelope<T> = response.json().await.map_err(ClientError::decode(SERVICE))?;
    match (envelope.ok, envelope.body) {
        (true, Some(body)) => Ok(body),
        (true, None) => Err(ClientError::Decode {
            service: SERVICE,
            message: "empty response body".into(),
        }),
        (false, _) => Err(ClientError::Api {
            service: SERVICE,
            status: status.as_u16(),
            code: None,
            message: envelope.error.unwrap_or_else(|| "unknown_error".into()),
        }),
    }
}

/// Chat platform client authenticated with one conference's bot token.
pub struct SlackClient {
    http: Client,
    base_url: String,
    bot_token: String,
}

impl SlackClient {
    pub fn new(http: Client, bot_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: API_BASE_URL.to_string(),
            bot_token: bot_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, method: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.bot_token)
    }

    fn post(&self, method: &str, body: &Value) -> RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(&self.bot_token)
            .json(body)
    }
}

#[async_trait]
impl ChatPlatform for SlackClient {
    async fn list_members(&self) -> HuddleResult<Vec<ChatMember>> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let page: UsersPage = send(
                self.get("users.list")
                    .query(&[("limit", PAGE_LIMIT), ("cursor", cursor.as_str())]),
            )
            .await?;
            members.extend(page.members.into_iter().map(ChatMember::from));
            if page.response_metadata.next_cursor.is_empty() {
                break;
            }
            cursor = page.response_metadata.next_cursor;
        }
        debug!(count = members.len(), "Listed workspace members");
        Ok(members)
    }

    async fn user_info(&self, user_id: &str) -> HuddleResult<ChatMember> {
        let info: UserInfo = send(self.get("users.info").query(&[("user", user_id)])).await?;
        Ok(info.user.into())
    }

    async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>> {
        let mut channels = Vec::new();
        let mut cursor = String::new();
        loop {
            let page: ChannelsPage = send(self.get("conversations.list").query(&[
                ("types", "public_channel,private_channel"),
                ("exclude_archived", "true"),
                ("limit", PAGE_LIMIT),
                ("cursor", cursor.as_str()),
            ]))
            .await?;
            channels.extend(page.channels);
            if page.response_metadata.next_cursor.is_empty() {
                break;
            }
            cursor = page.response_metadata.next_cursor;
        }
        Ok(channels)
    }

    async fn post_message(&self, message: ChatMessage) -> HuddleResult<()> {
        let body = json!({
            "channel": message.channel,
            "text": message.text,
            "blocks": message.blocks,
        });
        let _: Value = send(self.post("chat.postMessage", &body)).await?;
        Ok(())
    }

    /// Response URLs reply with plain text, not the Web API envelope.
    async fn respond(&self, response_url: &str, body: Value) -> HuddleResult<()> {
        let response = self
            .http
            .post(response_url)
            .json(&body)
            .send()
            .await
            .map_err(ClientError::network(SERVICE))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                service: SERVICE,
                status: status.as_u16(),
                code: None,
                message: response.text().await.unwrap_or_default(),
            }
            .into());
        }
        Ok(())
    }

    async fn publish_home(&self, user_id: &str, view: Value) -> HuddleResult<()> {
        let body = json!({ "user_id": user_id, "view": view });
        let _: Value = send(self.post("views.publish", &body)).await?;
        Ok(())
    }
}

/// Exchanges install authorization codes with the app's credentials.
pub struct SlackInstaller {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
}

impl SlackInstaller {
    pub fn new(http: Client, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            http,
            base_url: API_BASE_URL.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ChatInstaller for SlackInstaller {
    async fn exchange_code(&self, code: &str) -> HuddleResult<InstallGrant> {
        let access: OauthAccess = send(
            self.http
                .post(format!("{}/oauth.v2.access", self.base_url))
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(&[("code", code)]),
        )
        .await?;
        Ok(InstallGrant {
            bot_token: access.access_token,
            bot_user_id: access.bot_user_id,
            workspace_id: access.team.id,
            workspace_name: access.team.name,
        })
    }
}
