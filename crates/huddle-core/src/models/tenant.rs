//! Tenant (conference) domain model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::acl::Acl;

/// One workspace-scoped instance of the system.
///
/// Created by the chat install handshake and never deleted by the
/// service itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    /// External chat workspace identifier, unset until install completes.
    pub workspace_id: Option<String>,
    /// Workspace name an operator pre-registered before install.
    pub pending_workspace_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub name: String,
    pub workspace_id: Option<String>,
    pub pending_workspace_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub workspace_id: Option<Option<String>>,
    pub pending_workspace_name: Option<Option<String>>,
}

/// A single key/value configuration row of a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Collapse configuration rows into a key/value map.
pub fn config_map(entries: Vec<ConfigEntry>) -> BTreeMap<String, String> {
    entries.into_iter().map(|e| (e.key, e.value)).collect()
}

/// Bootstrap record proving a tenant is open for enrollment. Readable
/// by the tenant's `conference` role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantAccess {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub acl: Acl,
    pub created_at: DateTime<Utc>,
}
