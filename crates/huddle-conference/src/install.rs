//! Chat install handshake.

use std::sync::Arc;

use huddle_core::chat::ChatInstaller;
use huddle_core::config::{
    SLACK_BOT_TOKEN, SLACK_BOT_USER_ID, TWILIO_ACCOUNT_SID, TWILIO_API_KEY, TWILIO_API_SECRET,
    TWILIO_AUTH_TOKEN, TWILIO_ROOM_TYPE,
};
use huddle_core::error::HuddleResult;
use huddle_core::models::room::RoomMode;
use huddle_core::models::tenant::{CreateTenant, Tenant, UpdateTenant};
use huddle_core::repository::{ConfigRepository, Store, TenantRepository};
use huddle_core::video::VideoAccountProvisioner;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub tenant: Tenant,
    /// Whether the install created the tenant.
    pub created: bool,
    /// Where to send the installing user's browser.
    pub redirect: String,
}

pub struct InstallService<S: Store> {
    store: Arc<S>,
    installer: Arc<dyn ChatInstaller>,
    provisioner: Arc<dyn VideoAccountProvisioner>,
    success_url: String,
}

impl<S: Store> InstallService<S> {
    pub fn new(
        store: Arc<S>,
        installer: Arc<dyn ChatInstaller>,
        provisioner: Arc<dyn VideoAccountProvisioner>,
        success_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            installer,
            provisioner,
            success_url: success_url.into(),
        }
    }

    /// Exchange the authorization code and bind the workspace to a
    /// tenant, creating the tenant and its video sub-account on first
    /// install.
    pub async fn complete_install(&self, code: &str) -> HuddleResult<InstallOutcome> {
        let grant = self.installer.exchange_code(code).await?;
        let tenants = self.store.tenants();
        let config = self.store.config();

        let existing = tenants
            .find_for_install(&grant.workspace_id, &grant.workspace_name)
            .await?;
        let (tenant, created) = match existing {
            Some(tenant) => (tenant, false),
            None => {
                let created = tenants
                    .create(CreateTenant {
                        name: grant.workspace_name.clone(),
                        workspace_id: Some(grant.workspace_id.clone()),
                        pending_workspace_name: None,
                    })
                    .await;
                match created {
                    Ok(tenant) => {
                        self.provision_video(&tenant, &grant.workspace_name).await?;
                        info!(conference = %tenant.id, workspace = %grant.workspace_id, "Conference created by install");
                        (tenant, true)
                    }
                    // A concurrent install created it first.
                    Err(e) if e.is_conflict() => {
                        let tenant = tenants
                            .find_by_workspace(&grant.workspace_id)
                            .await?
                            .ok_or(e)?;
                        (tenant, false)
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        let tenant = tenants
            .update(
                tenant.id,
                UpdateTenant {
                    workspace_id: Some(Some(grant.workspace_id.clone())),
                    pending_workspace_name: Some(None),
                    ..UpdateTenant::default()
                },
            )
            .await?;
        config
            .upsert(tenant.id, SLACK_BOT_TOKEN, &grant.bot_token)
            .await?;
        config
            .upsert(tenant.id, SLACK_BOT_USER_ID, &grant.bot_user_id)
            .await?;

        info!(conference = %tenant.id, workspace = %grant.workspace_id, created, "Install completed");
        Ok(InstallOutcome {
            tenant,
            created,
            redirect: self.success_url.clone(),
        })
    }

    /// Give a new tenant its own video sub-account.
    async fn provision_video(&self, tenant: &Tenant, workspace_name: &str) -> HuddleResult<()> {
        let account = self
            .provisioner
            .provision_account(&format!("{}: {}", tenant.id, workspace_name))
            .await?;
        let config = self.store.config();
        for (key, value) in [
            (TWILIO_API_KEY, account.api_key.as_str()),
            (TWILIO_API_SECRET, account.api_secret.as_str()),
            (TWILIO_ACCOUNT_SID, account.account_sid.as_str()),
            (TWILIO_AUTH_TOKEN, account.auth_token.as_str()),
            (TWILIO_ROOM_TYPE, RoomMode::PeerToPeer.as_str()),
        ] {
            config.upsert(tenant.id, key, value).await?;
        }
        Ok(())
    }
}
