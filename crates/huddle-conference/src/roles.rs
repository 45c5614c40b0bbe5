//! Role & permission cache.
//!
//! Tenant roles are created lazily and cached by `(tenant, suffix)`.
//! Privileged actions are resolved once at startup and read-only
//! afterwards. Nothing here is ever evicted.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use futures::future::try_join_all;
use huddle_core::cache::KeyedCache;
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::privilege::{
    CreatePermissionGrant, Grantee, PermissionGrant, PrivilegedAction, PrivilegedActionKind,
};
use huddle_core::models::role::{CreateRole, Role, RoleSuffix, SYSTEM_ADMIN_ROLE};
use huddle_core::repository::{PrivilegeRepository, RoleRepository, Store};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

pub struct RoleCache<S: Store> {
    store: Arc<S>,
    admin: OnceCell<Role>,
    roles: KeyedCache<(Uuid, RoleSuffix), Role>,
    actions: DashMap<PrivilegedActionKind, PrivilegedAction>,
    /// `(role, account)` pairs known to be enrolled.
    enrolled: DashSet<(Uuid, Uuid)>,
}

impl<S: Store> RoleCache<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            admin: OnceCell::new(),
            roles: KeyedCache::new(),
            actions: DashMap::new(),
            enrolled: DashSet::new(),
        }
    }

    /// The process-wide administrator role, created on first use.
    pub async fn system_admin_role(&self) -> HuddleResult<Role> {
        self.admin
            .get_or_try_init(|| self.find_or_create(None, SYSTEM_ADMIN_ROLE, Vec::new()))
            .await
            .cloned()
    }

    /// Resolve a tenant role. New roles are granted to the system
    /// administrator role.
    pub async fn get_or_create_role(&self, tenant_id: Uuid, suffix: RoleSuffix) -> HuddleResult<Role> {
        if let Some(role) = self.roles.get(&(tenant_id, suffix)) {
            debug!(tenant = %tenant_id, role = %suffix, "Role cache hit");
            return Ok(role);
        }
        self.roles
            .get_or_try_init((tenant_id, suffix), || async move {
                let admin = self.system_admin_role().await?;
                self.find_or_create(Some(tenant_id), &suffix.role_name(tenant_id), vec![admin.id])
                    .await
            })
            .await
    }

    /// Resolve every default role of a tenant, in [`RoleSuffix::ALL`] order.
    pub async fn ensure_default_roles(&self, tenant_id: Uuid) -> HuddleResult<Vec<Role>> {
        try_join_all(
            RoleSuffix::ALL
                .into_iter()
                .map(|suffix| self.get_or_create_role(tenant_id, suffix)),
        )
        .await
    }

    async fn find_or_create(
        &self,
        tenant_id: Option<Uuid>,
        name: &str,
        granted_to: Vec<Uuid>,
    ) -> HuddleResult<Role> {
        let roles = self.store.roles();
        if let Some(role) = roles.find_by_name(name).await? {
            return Ok(role);
        }
        match roles
            .create(CreateRole {
                tenant_id,
                name: name.to_string(),
                granted_to,
            })
            .await
        {
            Ok(role) => {
                info!(role = %role.name, "Role created");
                Ok(role)
            }
            // Another process won the race.
            Err(e) if e.is_conflict() => roles
                .find_by_name(name)
                .await?
                .ok_or_else(|| HuddleError::not_found("role", name)),
            Err(e) => Err(e),
        }
    }

    /// Enroll an account in a role unless it is already known to be a
    /// member.
    pub async fn ensure_member(&self, role: &Role, account_id: Uuid) -> HuddleResult<()> {
        if self.enrolled.contains(&(role.id, account_id)) {
            return Ok(());
        }
        let roles = self.store.roles();
        if !roles.has_member(role.id, account_id).await? {
            roles.add_member(role.id, account_id).await?;
            debug!(role = %role.name, account = %account_id, "Account enrolled");
        }
        self.enrolled.insert((role.id, account_id));
        Ok(())
    }

    /// Find or create every privileged action record and cache it.
    pub async fn create_privileges(&self) -> HuddleResult<()> {
        let privileges = self.store.privileges();
        let resolved = try_join_all(PrivilegedActionKind::ALL.into_iter().map(|kind| async move {
            let action = match privileges.find_action(kind.as_str()).await? {
                Some(action) => action,
                None => match privileges.create_action(kind.as_str()).await {
                    Ok(action) => action,
                    Err(e) if e.is_conflict() => privileges
                        .find_action(kind.as_str())
                        .await?
                        .ok_or_else(|| HuddleError::not_found("privileged_action", kind))?,
                    Err(e) => return Err(e),
                },
            };
            Ok::<_, HuddleError>((kind, action))
        }))
        .await?;

        for (kind, action) in resolved {
            self.actions.insert(kind, action);
        }
        info!(count = self.actions.len(), "Privileged actions resolved");
        Ok(())
    }

    pub fn action(&self, kind: PrivilegedActionKind) -> HuddleResult<PrivilegedAction> {
        self.actions
            .get(&kind)
            .map(|a| a.value().clone())
            .ok_or_else(|| HuddleError::Internal(format!("privileged action {kind} not resolved")))
    }

    /// Whether the account holds `kind` in the tenant, directly or
    /// through any of its effective roles.
    pub async fn has_permission(
        &self,
        account_id: Uuid,
        tenant_id: Uuid,
        kind: PrivilegedActionKind,
    ) -> HuddleResult<bool> {
        let action = self.action(kind)?;
        let role_ids = self.effective_role_ids(account_id).await?;
        self.store
            .privileges()
            .grant_exists(tenant_id, action.id, account_id, &role_ids)
            .await
    }

    pub async fn effective_role_ids(&self, account_id: Uuid) -> HuddleResult<Vec<Uuid>> {
        Ok(self
            .store
            .roles()
            .roles_for_account(account_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Grant `kind` in a tenant to a role or an account.
    pub async fn grant(
        &self,
        tenant_id: Uuid,
        kind: PrivilegedActionKind,
        grantee: Grantee,
    ) -> HuddleResult<PermissionGrant> {
        let action = self.action(kind)?;
        self.store
            .privileges()
            .create_grant(CreatePermissionGrant {
                tenant_id,
                action_id: action.id,
                grantee,
            })
            .await
    }
}
