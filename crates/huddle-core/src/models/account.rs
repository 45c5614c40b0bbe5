//! Account domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::acl::Acl;

/// Cross-tenant identity. One account may carry a profile in many
/// tenants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Rotating secret embedded in handoff tokens.
    #[serde(skip_serializing)]
    pub login_key: Option<String>,
    pub login_expires_at: Option<DateTime<Utc>>,
    pub acl: Acl,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    pub username: String,
    pub email: String,
    pub display_name: String,
    /// Plaintext; hashed by the repository before storage.
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateAccount {
    pub display_name: Option<String>,
    pub acl: Option<Acl>,
}
