//! Contract of the video-conferencing provider.
//!
//! The provider owns live call state. Huddle only ever observes it
//! (list calls, list participants) or asks for narrow changes (create
//! a call, disconnect a participant).

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HuddleError, HuddleResult};
use crate::models::room::RoomMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    InProgress,
    Completed,
    Failed,
}

/// A call as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveCall {
    pub call_id: String,
    pub unique_name: String,
    pub status: CallStatus,
    pub mode: RoomMode,
}

impl LiveCall {
    pub fn is_live(&self) -> bool {
        self.status == CallStatus::InProgress
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    Connected,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParticipant {
    /// `<profileID>:<displayName>` as minted in the access token.
    pub identity: String,
    pub status: ParticipantStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCall {
    pub unique_name: String,
    pub mode: RoomMode,
    pub max_participants: u32,
    pub status_callback: Option<String>,
}

/// Parsed participant identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantIdentity {
    pub profile_id: Uuid,
    pub display_name: String,
}

impl ParticipantIdentity {
    pub fn new(profile_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            profile_id,
            display_name: display_name.into(),
        }
    }
}

impl FromStr for ParticipantIdentity {
    type Err = HuddleError;

    /// Splits at the first `:`; the display name may itself contain
    /// colons.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (id, name) = raw.split_once(':').ok_or_else(|| {
            HuddleError::validation(format!("participant identity without separator: {raw}"))
        })?;
        let profile_id = Uuid::parse_str(id).map_err(|e| {
            HuddleError::validation(format!("participant identity with bad profile id: {e}"))
        })?;
        Ok(Self {
            profile_id,
            display_name: name.to_string(),
        })
    }
}

impl std::fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.profile_id, self.display_name)
    }
}

/// Lifecycle notifications delivered by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEventKind {
    ParticipantConnected,
    ParticipantDisconnected,
    RoomEnded,
    Other(String),
}

impl From<&str> for CallEventKind {
    fn from(s: &str) -> Self {
        match s {
            "participant-connected" => Self::ParticipantConnected,
            "participant-disconnected" => Self::ParticipantDisconnected,
            "room-ended" => Self::RoomEnded,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallEvent {
    pub kind: CallEventKind,
    pub call_id: String,
    pub identity: Option<String>,
}

/// Tenant-scoped client of the video provider.
#[async_trait]
pub trait VideoProvider: Send + Sync {
    async fn list_live_calls(&self) -> HuddleResult<Vec<LiveCall>>;
    /// Fails with `Conflict` when `unique_name` is already in use.
    async fn create_call(&self, input: CreateCall) -> HuddleResult<LiveCall>;
    async fn list_participants(&self, call_id: &str) -> HuddleResult<Vec<CallParticipant>>;
    async fn disconnect_participant(&self, call_id: &str, identity: &str) -> HuddleResult<()>;
    async fn fetch_call_by_name(&self, unique_name: &str) -> HuddleResult<LiveCall>;
    /// Signed credential letting `identity` join `call_name`.
    fn access_token(&self, identity: &str, call_name: &str) -> HuddleResult<String>;
}

/// Credentials of a freshly provisioned provider sub-account.
#[derive(Debug, Clone)]
pub struct ProvisionedVideoAccount {
    pub account_sid: String,
    pub auth_token: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Master-account operations used when installing a new tenant.
#[async_trait]
pub trait VideoAccountProvisioner: Send + Sync {
    async fn provision_account(&self, friendly_name: &str) -> HuddleResult<ProvisionedVideoAccount>;
}
