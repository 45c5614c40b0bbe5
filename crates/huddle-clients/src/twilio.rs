//! Twilio Video REST client and master-account provisioning.

use std::collections::HashMap;

use async_trait::async_trait;
use huddle_core::config::VideoCredentials;
use huddle_core::error::HuddleResult;
use huddle_core::models::room::RoomMode;
use huddle_core::video::{
    CallParticipant, CallStatus, CreateCall, LiveCall, ParticipantStatus,
    ProvisionedVideoAccount, VideoAccountProvisioner, VideoProvider,
};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::access_token::video_access_token;
use crate::error::ClientError;

pub const VIDEO_BASE_URL: &str = "https://video.twilio.com/v1";
pub const API_BASE_URL: &str = "https://api.twilio.com/2010-04-01";

const SERVICE: &str = "twilio";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct TwilioApiError {
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageMeta {
    next_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RoomResource {
    sid: String,
    unique_name: String,
    status: String,
    #[serde(rename = "type")]
    room_type: Option<String>,
}

impl RoomResource {
    fn into_call(self) -> LiveCall {
        let status = match self.status.as_str() {
            "in-progress" => CallStatus::InProgress,
            "failed" => CallStatus::Failed,
            _ => CallStatus::Completed,
        };
        let mode = self
            .room_type
            .as_deref()
            .and_then(|t| t.parse::<RoomMode>().ok())
            .unwrap_or_default();
        LiveCall {
            call_id: self.sid,
            unique_name: self.unique_name,
            status,
            mode,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoomPage {
    rooms: Vec<RoomResource>,
    meta: Option<PageMeta>,
}

#[derive(Debug, Deserialize)]
struct ParticipantResource {
    identity: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ParticipantPage {
    participants: Vec<ParticipantResource>,
    meta: Option<PageMeta>,
}

/// Send a request and decode a JSON body, mapping Twilio's error
/// envelope onto [`ClientError::Api`].
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request.send().await.map_err(ClientError::network(SERVICE))?;
    let status = response.status();
    if !status.is_success() {
        let body: TwilioApiError = response.json().await.unwrap_or(TwilioApiError {
            code: None,
            message: None,
        });
        return Err(ClientError::Api {
            service: SERVICE,
            status: status.as_u16(),
            code: body.code,
            message: body
                .message
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
        });
    }
    response.json().await.map_err(ClientError::decode(SERVICE))
}

/// Video provider client bound to one conference's credentials.
pub struct TwilioVideo {
    http: Client,
    base_url: String,
    credentials: VideoCredentials,
}

impl TwilioVideo {
    pub fn new(http: Client, credentials: VideoCredentials) -> Self {
        Self {
            http,
            base_url: VIDEO_BASE_URL.to_string(),
            credentials,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
    }

    fn post(&self, url: &str) -> RequestBuilder {
        self.http
            .post(url)
            .basic_auth(&self.credentials.account_sid, Some(&self.credentials.auth_token))
    }

    fn room_url(&self, room: &str) -> String {
        format!("{}/Rooms/{}", self.base_url, urlencoding::encode(room))
    }
}

#[async_trait]
impl VideoProvider for TwilioVideo {
    async fn list_live_calls(&self) -> HuddleResult<Vec<LiveCall>> {
        let mut calls = Vec::new();
        let first = format!("{}/Rooms", self.base_url);
        let mut page: RoomPage = send(
            self.get(&first)
                .query(&[("Status", "in-progress"), ("PageSize", PAGE_SIZE)]),
        )
        .await?;
        loop {
            calls.extend(page.rooms.into_iter().map(RoomResource::into_call));
            match page.meta.and_then(|m| m.next_page_url) {
                Some(next) => page = send(self.get(&next)).await?,
                None => break,
            }
        }
        debug!(account = %self.credentials.account_sid, count = calls.len(), "Listed live calls");
        Ok(calls)
    }

    async fn create_call(&self, input: CreateCall) -> HuddleResult<LiveCall> {
        let mut form: HashMap<&str, String> = HashMap::new();
        form.insert("UniqueName", input.unique_name.clone());
        form.insert("Type", input.mode.as_str().to_string());
        form.insert("MaxParticipants", input.max_participants.to_string());
        if let Some(callback) = input.status_callback {
            form.insert("StatusCallback", callback);
            form.insert("StatusCallbackMethod", "POST".to_string());
        }

        let url = format!("{}/Rooms", self.base_url);
        let room: RoomResource = send(self.post(&url).form(&form)).await?;
        info!(call = %room.sid, name = %room.unique_name, "Provider call created");
        Ok(room.into_call())
    }

    async fn list_participants(&self, call_id: &str) -> HuddleResult<Vec<CallParticipant>> {
        let mut participants = Vec::new();
        let first = format!("{}/Participants", self.room_url(call_id));
        let mut page: ParticipantPage = send(
            self.get(&first)
                .query(&[("Status", "connected"), ("PageSize", PAGE_SIZE)]),
        )
        .await?;
        loop {
            participants.extend(page.participants.into_iter().map(|p| CallParticipant {
                status: if p.status == "connected" {
                    ParticipantStatus::Connected
                } else {
                    ParticipantStatus::Disconnected
                },
                identity: p.identity,
            }));
            match page.meta.and_then(|m| m.next_page_url) {
                Some(next) => page = send(self.get(&next)).await?,
                None => break,
            }
        }
        Ok(participants)
    }

    async fn disconnect_participant(&self, call_id: &str, identity: &str) -> HuddleResult<()> {
        let url = format!(
            "{}/Participants/{}",
            self.room_url(call_id),
            urlencoding::encode(identity)
        );
        let _: serde_json::Value =
            send(self.post(&url).form(&[("Status", "disconnected")])).await?;
        info!(call = %call_id, identity = %identity, "Participant disconnected");
        Ok(())
    }

    async fn fetch_call_by_name(&self, unique_name: &str) -> HuddleResult<LiveCall> {
        let room: RoomResource = send(self.get(&self.room_url(unique_name))).await?;
        Ok(room.into_call())
    }

    fn access_token(&self, identity: &str, call_name: &str) -> HuddleResult<String> {
        Ok(video_access_token(
            &self.credentials.account_sid,
            &self.credentials.api_key,
            &self.credentials.api_secret,
            identity,
            call_name,
        )?)
    }
}

#[derive(Debug, Deserialize)]
struct AccountResource {
    sid: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct KeyResource {
    sid: String,
    secret: String,
}

/// Creates a dedicated sub-account and API key per conference using the
/// master account credentials.
pub struct TwilioProvisioner {
    http: Client,
    base_url: String,
    master_sid: String,
    master_auth_token: String,
}

impl TwilioProvisioner {
    pub fn new(http: Client, master_sid: impl Into<String>, master_auth_token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: API_BASE_URL.to_string(),
            master_sid: master_sid.into(),
            master_auth_token: master_auth_token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl VideoAccountProvisioner for TwilioProvisioner {
    async fn provision_account(&self, friendly_name: &str) -> HuddleResult<ProvisionedVideoAccount> {
        let account: AccountResource = send(
            self.http
                .post(format!("{}/Accounts.json", self.base_url))
                .basic_auth(&self.master_sid, Some(&self.master_auth_token))
                .form(&[("FriendlyName", friendly_name)]),
        )
        .await?;

        let key: KeyResource = send(
            self.http
                .post(format!("{}/Accounts/{}/Keys.json", self.base_url, account.sid))
                .basic_auth(&account.sid, Some(&account.auth_token))
                .form(&[("FriendlyName", friendly_name)]),
        )
        .await?;

        info!(account = %account.sid, name = %friendly_name, "Provider sub-account provisioned");
        Ok(ProvisionedVideoAccount {
            account_sid: account.sid,
            auth_token: account.auth_token,
            api_key: key.sid,
            api_secret: key.secret,
        })
    }
}
