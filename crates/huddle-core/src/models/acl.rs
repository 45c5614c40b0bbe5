//! Record-level access control lists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Access control attached to a persisted record.
///
/// Reads are granted publicly, to whole roles, or to individual
/// accounts. Writes are only ever granted to individual accounts;
/// server-side code bypasses the list entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acl {
    pub public_read: bool,
    pub public_write: bool,
    pub read_roles: BTreeSet<Uuid>,
    pub read_accounts: BTreeSet<Uuid>,
    pub write_accounts: BTreeSet<Uuid>,
}

impl Acl {
    /// Nobody but server-side code can read or write.
    pub fn private() -> Self {
        Self::default()
    }

    /// Readable and writable by a single account.
    pub fn owner_only(account_id: Uuid) -> Self {
        let mut acl = Self::default();
        acl.read_accounts.insert(account_id);
        acl.write_accounts.insert(account_id);
        acl
    }

    pub fn with_role_read(mut self, role_id: Uuid) -> Self {
        self.read_roles.insert(role_id);
        self
    }

    pub fn with_account_read(mut self, account_id: Uuid) -> Self {
        self.read_accounts.insert(account_id);
        self
    }

    pub fn with_account_write(mut self, account_id: Uuid) -> Self {
        self.write_accounts.insert(account_id);
        self
    }

    pub fn can_read(&self, account_id: Uuid, role_ids: &[Uuid]) -> bool {
        self.public_read
            || self.read_accounts.contains(&account_id)
            || role_ids.iter().any(|r| self.read_roles.contains(r))
    }

    pub fn can_write(&self, account_id: Uuid) -> bool {
        self.public_write || self.write_accounts.contains(&account_id)
    }
}
