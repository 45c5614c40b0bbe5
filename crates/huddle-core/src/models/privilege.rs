//! Privileged actions and the grants that confer them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::HuddleError;

/// Capabilities checked before privileged operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivilegedActionKind {
    CreateVideoRoom,
    Chat,
    AccessFromChat,
    CreatePersistentRoom,
    CreateGroupRoom,
    CreateSmallGroupRoom,
    CreatePeerToPeerRoom,
    CreatePrivateRoom,
}

impl PrivilegedActionKind {
    pub const ALL: [PrivilegedActionKind; 8] = [
        Self::CreateVideoRoom,
        Self::Chat,
        Self::AccessFromChat,
        Self::CreatePersistentRoom,
        Self::CreateGroupRoom,
        Self::CreateSmallGroupRoom,
        Self::CreatePeerToPeerRoom,
        Self::CreatePrivateRoom,
    ];

    /// Stored action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateVideoRoom => "createVideoRoom",
            Self::Chat => "chat",
            Self::AccessFromChat => "access-from-slack",
            Self::CreatePersistentRoom => "createVideoRoom-persistent",
            Self::CreateGroupRoom => "createVideoRoom-group",
            Self::CreateSmallGroupRoom => "createVideoRoom-smallgroup",
            Self::CreatePeerToPeerRoom => "createVideoRoom-peer-to-peer",
            Self::CreatePrivateRoom => "createVideoRoom-private",
        }
    }
}

impl fmt::Display for PrivilegedActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivilegedActionKind {
    type Err = HuddleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| HuddleError::validation(format!("unknown privileged action: {s}")))
    }
}

/// Persisted record of a named capability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrivilegedAction {
    pub id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

/// Who a permission grant applies to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grantee {
    Role(Uuid),
    Account(Uuid),
}

/// Links a tenant, an action and a grantee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub action_id: Uuid,
    pub grantee: Grantee,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermissionGrant {
    pub tenant_id: Uuid,
    pub action_id: Uuid,
    pub grantee: Grantee,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_roundtrip() {
        for kind in PrivilegedActionKind::ALL {
            assert_eq!(kind.as_str().parse::<PrivilegedActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        assert!("launchRockets".parse::<PrivilegedActionKind>().is_err());
    }
}
