//! Role domain model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the process-wide administrator role. Every tenant role is
/// granted to it, so its members hold every tenant role.
pub const SYSTEM_ADMIN_ROLE: &str = "huddle-sysadmin";

/// A named authorization group, tenant-scoped except for the system
/// administrator role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub name: String,
    /// Roles whose members also hold this role.
    pub granted_to: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRole {
    pub tenant_id: Option<Uuid>,
    pub name: String,
    pub granted_to: Vec<Uuid>,
}

/// The fixed set of tenant role kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleSuffix {
    Conference,
    Moderator,
    Manager,
    Admin,
}

impl RoleSuffix {
    /// Roles every tenant is bootstrapped with.
    pub const ALL: [RoleSuffix; 4] = [
        RoleSuffix::Conference,
        RoleSuffix::Moderator,
        RoleSuffix::Manager,
        RoleSuffix::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conference => "conference",
            Self::Moderator => "moderator",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Stored role name for this suffix within a tenant.
    pub fn role_name(&self, tenant_id: Uuid) -> String {
        format!("{tenant_id}-{}", self.as_str())
    }
}

impl fmt::Display for RoleSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
