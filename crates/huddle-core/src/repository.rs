//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. `get_*` lookups fail with
//! [`HuddleError::NotFound`](crate::error::HuddleError::NotFound) when
//! the record is absent; `find_*` lookups return `None` instead.
//! Creates that hit a uniqueness constraint fail with
//! [`HuddleError::Conflict`](crate::error::HuddleError::Conflict).

use uuid::Uuid;

use crate::error::HuddleResult;
use crate::models::{
    account::{Account, CreateAccount, UpdateAccount},
    acl::Acl,
    activity::LiveActivity,
    privilege::{CreatePermissionGrant, PermissionGrant, PrivilegedAction},
    profile::{CreateProfile, Profile, UpdateProfile},
    role::{CreateRole, Role},
    room::{CreateRoom, Room},
    session::{CreateSession, Session},
    tenant::{ConfigEntry, CreateTenant, Tenant, TenantAccess, UpdateTenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 1000,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    /// Pagination for the page following this one, if any remain.
    pub fn next_page(&self) -> Option<Pagination> {
        let next = self.offset + self.items.len() as u64;
        (next < self.total && !self.items.is_empty()).then_some(Pagination {
            offset: next,
            limit: self.limit,
        })
    }
}

// ---------------------------------------------------------------------------
// Tenants
// ---------------------------------------------------------------------------

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = HuddleResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HuddleResult<Tenant>> + Send;
    fn find_by_workspace(
        &self,
        workspace_id: &str,
    ) -> impl Future<Output = HuddleResult<Option<Tenant>>> + Send;
    /// Tenant pre-registered under `pending_name`, or already bound to
    /// `workspace_id`.
    fn find_for_install(
        &self,
        workspace_id: &str,
        pending_name: &str,
    ) -> impl Future<Output = HuddleResult<Option<Tenant>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateTenant,
    ) -> impl Future<Output = HuddleResult<Tenant>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HuddleResult<PaginatedResult<Tenant>>> + Send;

    fn find_access(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = HuddleResult<Option<TenantAccess>>> + Send;
    fn create_access(
        &self,
        tenant_id: Uuid,
        acl: Acl,
    ) -> impl Future<Output = HuddleResult<TenantAccess>> + Send;
}

pub trait ConfigRepository: Send + Sync {
    fn list(&self, tenant_id: Uuid) -> impl Future<Output = HuddleResult<Vec<ConfigEntry>>> + Send;
    /// Add or replace a single key.
    fn upsert(
        &self,
        tenant_id: Uuid,
        key: &str,
        value: &str,
    ) -> impl Future<Output = HuddleResult<ConfigEntry>> + Send;
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    fn create(&self, input: CreateAccount) -> impl Future<Output = HuddleResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HuddleResult<Account>> + Send;
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = HuddleResult<Option<Account>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = HuddleResult<Account>> + Send;
    /// Store a rotated handoff secret.
    fn set_login_key(
        &self,
        id: Uuid,
        login_key: &str,
        expires_at: chrono::DateTime<chrono::Utc>,
    ) -> impl Future<Output = HuddleResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = HuddleResult<PaginatedResult<Account>>> + Send;
}

pub trait ProfileRepository: Send + Sync {
    fn create(&self, input: CreateProfile) -> impl Future<Output = HuddleResult<Profile>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = HuddleResult<Profile>> + Send;
    fn find_by_chat_user(
        &self,
        tenant_id: Uuid,
        chat_user_id: &str,
    ) -> impl Future<Output = HuddleResult<Option<Profile>>> + Send;
    fn find_by_account(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = HuddleResult<Option<Profile>>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> impl Future<Output = HuddleResult<Profile>> + Send;
    fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = HuddleResult<PaginatedResult<Profile>>> + Send;
    /// Every profile of an account, across tenants.
    fn list_by_account(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = HuddleResult<Vec<Profile>>> + Send;
}

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = HuddleResult<Role>> + Send;
    fn find_by_name(&self, name: &str)
    -> impl Future<Output = HuddleResult<Option<Role>>> + Send;
    /// Idempotent: adding an existing member is a no-op.
    fn add_member(
        &self,
        role_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = HuddleResult<()>> + Send;
    fn has_member(
        &self,
        role_id: Uuid,
        account_id: Uuid,
    ) -> impl Future<Output = HuddleResult<bool>> + Send;
    fn list_members(&self, role_id: Uuid) -> impl Future<Output = HuddleResult<Vec<Uuid>>> + Send;
    /// Roles held directly plus roles granted to those roles.
    fn roles_for_account(
        &self,
        account_id: Uuid,
    ) -> impl Future<Output = HuddleResult<Vec<Role>>> + Send;
}

pub trait PrivilegeRepository: Send + Sync {
    fn find_action(
        &self,
        action: &str,
    ) -> impl Future<Output = HuddleResult<Option<PrivilegedAction>>> + Send;
    fn create_action(
        &self,
        action: &str,
    ) -> impl Future<Output = HuddleResult<PrivilegedAction>> + Send;
    fn create_grant(
        &self,
        input: CreatePermissionGrant,
    ) -> impl Future<Output = HuddleResult<PermissionGrant>> + Send;
    /// Whether a grant links the tenant and action to the account
    /// directly or to any of `role_ids`.
    fn grant_exists(
        &self,
        tenant_id: Uuid,
        action_id: Uuid,
        account_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = HuddleResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Rooms, sessions, activity
// ---------------------------------------------------------------------------

pub trait RoomRepository: Send + Sync {
    fn create(&self, input: CreateRoom) -> impl Future<Output = HuddleResult<Room>> + Send;
    fn get_by_id(&self, tenant_id: Uuid, id: Uuid)
    -> impl Future<Output = HuddleResult<Room>> + Send;
    fn find_by_call_id(
        &self,
        tenant_id: Uuid,
        call_id: &str,
    ) -> impl Future<Output = HuddleResult<Option<Room>>> + Send;
    fn find_by_title(
        &self,
        tenant_id: Uuid,
        title: &str,
    ) -> impl Future<Output = HuddleResult<Option<Room>>> + Send;
    fn list_by_tenant(&self, tenant_id: Uuid)
    -> impl Future<Output = HuddleResult<Vec<Room>>> + Send;
    /// Persist the mutable fields of a room (call id, members, ACL,
    /// last-observed marker).
    fn save(&self, room: &Room) -> impl Future<Output = HuddleResult<Room>> + Send;
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = HuddleResult<()>> + Send;
}

pub trait SessionRepository: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = HuddleResult<Session>> + Send;
    fn find_by_token(
        &self,
        token: &str,
    ) -> impl Future<Output = HuddleResult<Option<Session>>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = HuddleResult<()>> + Send;
}

pub trait ActivityRepository: Send + Sync {
    /// Create the marker if missing, then bump its timestamp.
    fn touch(
        &self,
        account_id: Uuid,
        tenant_id: Uuid,
        topic: &str,
    ) -> impl Future<Output = HuddleResult<LiveActivity>> + Send;
}

/// Bundle of every repository, implemented once per storage backend.
pub trait Store: Send + Sync + 'static {
    type Tenants: TenantRepository;
    type Config: ConfigRepository;
    type Accounts: AccountRepository;
    type Profiles: ProfileRepository;
    type Roles: RoleRepository;
    type Privileges: PrivilegeRepository;
    type Rooms: RoomRepository;
    type Sessions: SessionRepository;
    type Activity: ActivityRepository;

    fn tenants(&self) -> &Self::Tenants;
    fn config(&self) -> &Self::Config;
    fn accounts(&self) -> &Self::Accounts;
    fn profiles(&self) -> &Self::Profiles;
    fn roles(&self) -> &Self::Roles;
    fn privileges(&self) -> &Self::Privileges;
    fn rooms(&self) -> &Self::Rooms;
    fn sessions(&self) -> &Self::Sessions;
    fn activity(&self) -> &Self::Activity;
}
