//! Tenant-scoped profile of an account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::acl::Acl;

/// Projection of an [`Account`](crate::models::account::Account) into
/// one tenant, carrying the external chat identity.
///
/// `(tenant_id, chat_user_id)` and `(tenant_id, account_id)` are both
/// unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub account_id: Uuid,
    pub tenant_id: Uuid,
    pub chat_user_id: String,
    pub display_name: Option<String>,
    pub acl: Acl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Identity string presented to the video provider.
    pub fn call_identity(&self, fallback_name: &str) -> String {
        let name = self.display_name.as_deref().unwrap_or(fallback_name);
        format!("{}:{}", self.id, name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProfile {
    pub account_id: Uuid,
    pub tenant_id: Uuid,
    pub chat_user_id: String,
    pub display_name: Option<String>,
    pub acl: Acl,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub display_name: Option<String>,
}
