//! Video room domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HuddleError;
use crate::models::acl::Acl;

/// Whether a room outlives its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Persistence {
    /// Deleted when its call ends.
    #[default]
    Ephemeral,
    /// Kept with its call reference cleared when its call ends.
    Persistent,
}

impl Persistence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ephemeral => "ephemeral",
            Self::Persistent => "persistent",
        }
    }
}

impl FromStr for Persistence {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ephemeral" => Ok(Self::Ephemeral),
            "persistent" => Ok(Self::Persistent),
            other => Err(HuddleError::validation(format!(
                "unknown room persistence: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
        }
    }
}

impl FromStr for Visibility {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            other => Err(HuddleError::validation(format!(
                "unknown room visibility: {other}"
            ))),
        }
    }
}

/// Provider call topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RoomMode {
    #[default]
    Group,
    GroupSmall,
    PeerToPeer,
    Go,
}

impl RoomMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::GroupSmall => "group-small",
            Self::PeerToPeer => "peer-to-peer",
            Self::Go => "go",
        }
    }

    /// Maximum participants requested from the provider.
    pub fn capacity(&self) -> u32 {
        match self {
            Self::PeerToPeer => 10,
            Self::GroupSmall => 4,
            Self::Group => 24,
            Self::Go => 2,
        }
    }
}

impl fmt::Display for RoomMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomMode {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "group" => Ok(Self::Group),
            "group-small" | "small-group" => Ok(Self::GroupSmall),
            "peer-to-peer" => Ok(Self::PeerToPeer),
            "go" => Ok(Self::Go),
            other => Err(HuddleError::validation(format!("unknown room mode: {other}"))),
        }
    }
}

/// A video-call resource whose identity is independent of whether a
/// call is currently live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique per tenant; doubles as the provider's unique call name.
    pub title: String,
    /// Provider call id, `None` when no call is live.
    pub call_id: Option<String>,
    pub persistence: Persistence,
    pub visibility: Visibility,
    pub mode: RoomMode,
    pub capacity: Option<u32>,
    /// Profile ids of connected participants.
    pub members: Vec<Uuid>,
    pub acl: Acl,
    pub last_observed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn is_live(&self) -> bool {
        self.call_id.is_some()
    }

    /// Persistent room with no call: already in its resting state.
    pub fn is_dormant(&self) -> bool {
        self.call_id.is_none() && self.persistence != Persistence::Ephemeral
    }

    pub fn has_member(&self, profile_id: Uuid) -> bool {
        self.members.contains(&profile_id)
    }

    /// Returns `true` if the member was added.
    pub fn add_member(&mut self, profile_id: Uuid) -> bool {
        if self.has_member(profile_id) {
            return false;
        }
        self.members.push(profile_id);
        true
    }

    /// Returns `true` if the member was present.
    pub fn remove_member(&mut self, profile_id: Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != profile_id);
        before != self.members.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoom {
    pub tenant_id: Uuid,
    pub title: String,
    pub call_id: Option<String>,
    pub persistence: Persistence,
    pub visibility: Visibility,
    pub mode: RoomMode,
    pub capacity: Option<u32>,
    pub acl: Acl,
}
