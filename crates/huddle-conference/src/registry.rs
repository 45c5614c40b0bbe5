//! Conference registry: per-workspace conferences, built on first
//! touch and cached until the process exits.

use std::sync::Arc;
use std::time::Duration;

use huddle_core::batch::{BatchReport, settle};
use huddle_core::cache::KeyedCache;
use huddle_core::config::{ConferenceConfig, ConfigDefaults};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::factory::ClientFactory;
use huddle_core::models::acl::Acl;
use huddle_core::models::role::RoleSuffix;
use huddle_core::models::tenant::{Tenant, config_map};
use huddle_core::repository::{
    ConfigRepository, Pagination, RoleRepository, Store, TenantRepository,
};
use tracing::{debug, info, warn};

use crate::bounded::{BoundedChat, BoundedVideo};
use crate::conference::{ChannelBindings, Conference};
use crate::identity::IdentityBridge;
use crate::reconcile::RoomReconciler;
use crate::roles::RoleCache;

/// Default deadline for a single collaborator call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ConferenceRegistry<S: Store> {
    store: Arc<S>,
    roles: Arc<RoleCache<S>>,
    bridge: Arc<IdentityBridge<S>>,
    reconciler: Arc<RoomReconciler<S>>,
    clients: Arc<dyn ClientFactory>,
    defaults: ConfigDefaults,
    call_timeout: Duration,
    conferences: KeyedCache<String, Arc<Conference>>,
}

impl<S: Store> ConferenceRegistry<S> {
    pub fn new(store: Arc<S>, clients: Arc<dyn ClientFactory>, defaults: ConfigDefaults) -> Self {
        let roles = Arc::new(RoleCache::new(store.clone()));
        Self {
            bridge: Arc::new(IdentityBridge::new(store.clone(), roles.clone())),
            reconciler: Arc::new(RoomReconciler::new(store.clone(), roles.clone())),
            roles,
            store,
            clients,
            defaults,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            conferences: KeyedCache::new(),
        }
    }

    pub fn with_call_timeout(mut self, limit: Duration) -> Self {
        self.call_timeout = limit;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn roles(&self) -> &RoleCache<S> {
        &self.roles
    }

    pub fn bridge(&self) -> &IdentityBridge<S> {
        &self.bridge
    }

    pub fn reconciler(&self) -> &RoomReconciler<S> {
        &self.reconciler
    }

    /// The conference bound to `workspace_id`, building it on first
    /// use. Concurrent first resolves share one build; a failed build
    /// is retried by the next caller.
    pub async fn resolve(&self, workspace_id: &str) -> HuddleResult<Arc<Conference>> {
        if let Some(conf) = self.conferences.get(&workspace_id.to_string()) {
            debug!(workspace = workspace_id, "Conference cache hit");
            return Ok(conf);
        }
        self.conferences
            .get_or_try_init(workspace_id.to_string(), || self.build(workspace_id))
            .await
    }

    /// Already-built conference, without triggering a build.
    pub fn cached(&self, workspace_id: &str) -> Option<Arc<Conference>> {
        self.conferences.get(&workspace_id.to_string())
    }

    async fn build(&self, workspace_id: &str) -> HuddleResult<Arc<Conference>> {
        let tenant = self
            .store
            .tenants()
            .find_by_workspace(workspace_id)
            .await?
            .ok_or_else(|| HuddleError::not_found("conference", workspace_id))?;

        let config = self.load_config(&tenant).await?;
        let video = BoundedVideo::wrap(self.clients.video(&config)?, self.call_timeout);
        let chat = BoundedChat::wrap(self.clients.chat(&config)?, self.call_timeout);
        self.ensure_access(&tenant).await?;

        let conf = Conference::new(tenant, workspace_id, config, video, chat);

        // Everything below is best effort: the conference resolves with
        // whatever state could be gathered.
        if let Err(e) = self.reconciler.reconcile(&conf).await {
            warn!(conference = %conf.tenant_id(), error = %e, "Room reconciliation skipped");
        }
        if let Err(e) = self.bridge.provision_all(&conf).await {
            warn!(conference = %conf.tenant_id(), error = %e, "Member provisioning skipped");
        }
        if let Err(e) = self.backfill_admins(&conf).await {
            warn!(conference = %conf.tenant_id(), error = %e, "Administrator backfill skipped");
        }
        match conf.chat().list_channels().await {
            Ok(channels) => conf.bind_channels(ChannelBindings::from_channels(&channels)),
            Err(e) => {
                warn!(conference = %conf.tenant_id(), error = %e, "Channel lookup failed");
            }
        }

        info!(
            conference = %conf.tenant_id(),
            workspace = workspace_id,
            name = %conf.name(),
            moderators = conf.moderator_channel().is_some(),
            "Conference resolved"
        );
        Ok(Arc::new(conf))
    }

    pub async fn load_config(&self, tenant: &Tenant) -> HuddleResult<ConferenceConfig> {
        let entries = self.store.config().list(tenant.id).await?;
        Ok(ConferenceConfig::from_entries(
            config_map(entries),
            &self.defaults,
        ))
    }

    /// Make sure the tenant's default roles and enrollment record exist.
    async fn ensure_access(&self, tenant: &Tenant) -> HuddleResult<()> {
        self.roles.ensure_default_roles(tenant.id).await?;
        let tenants = self.store.tenants();
        if tenants.find_access(tenant.id).await?.is_some() {
            return Ok(());
        }
        let role = self
            .roles
            .get_or_create_role(tenant.id, RoleSuffix::Conference)
            .await?;
        match tenants
            .create_access(tenant.id, Acl::private().with_role_read(role.id))
            .await
        {
            Ok(_) => {
                info!(conference = %tenant.id, "Conference access record created");
                Ok(())
            }
            Err(e) if e.is_conflict() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Enroll every system administrator in the conference role.
    pub async fn backfill_admins(&self, conf: &Conference) -> HuddleResult<BatchReport<()>> {
        let admin = self.roles.system_admin_role().await?;
        let role = self
            .roles
            .get_or_create_role(conf.tenant_id(), RoleSuffix::Conference)
            .await?;
        let admins = self.store.roles().list_members(admin.id).await?;

        let work = admins
            .into_iter()
            .map(|account_id| (account_id.to_string(), self.roles.ensure_member(&role, account_id)));
        Ok(settle("admin-backfill", work).await)
    }

    /// Resolve privileged actions, then every installed conference.
    pub async fn warm_up(&self) -> HuddleResult<BatchReport<Arc<Conference>>> {
        self.roles.create_privileges().await?;

        let mut workspaces = Vec::new();
        let mut page = Pagination::default();
        loop {
            let result = self.store.tenants().list(page).await?;
            workspaces.extend(result.items.iter().filter_map(|t| t.workspace_id.clone()));
            match result.next_page() {
                Some(next) => page = next,
                None => break,
            }
        }

        let report = settle(
            "warm-up",
            workspaces
                .iter()
                .map(|ws| (ws.clone(), self.resolve(ws))),
        )
        .await;
        info!(
            resolved = report.succeeded.len(),
            failed = report.failed.len(),
            "Conferences warmed up"
        );
        Ok(report)
    }
}
