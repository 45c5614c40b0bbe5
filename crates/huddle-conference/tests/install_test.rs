mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use common::{Harness, WORKSPACE, setup};
use futures::future::join;
use huddle_conference::install::InstallService;
use huddle_core::chat::{ChatInstaller, InstallGrant};
use huddle_core::config::{
    SLACK_BOT_TOKEN, SLACK_BOT_USER_ID, TWILIO_ACCOUNT_SID, TWILIO_API_KEY, TWILIO_API_SECRET,
    TWILIO_AUTH_TOKEN, TWILIO_ROOM_TYPE,
};
use huddle_core::error::HuddleResult;
use huddle_core::models::tenant::{CreateTenant, config_map};
use huddle_core::repository::{ConfigRepository, Store, TenantRepository};
use huddle_core::video::{ProvisionedVideoAccount, VideoAccountProvisioner};
use uuid::Uuid;

struct FakeInstaller {
    workspace_id: String,
    workspace_name: String,
}

#[async_trait]
impl ChatInstaller for FakeInstaller {
    async fn exchange_code(&self, code: &str) -> HuddleResult<InstallGrant> {
        Ok(InstallGrant {
            bot_token: format!("xoxb-{code}"),
            bot_user_id: "UBOT".into(),
            workspace_id: self.workspace_id.clone(),
            workspace_name: self.workspace_name.clone(),
        })
    }
}

#[derive(Default)]
struct FakeProvisioner {
    provisioned: Mutex<Vec<String>>,
}

#[async_trait]
impl VideoAccountProvisioner for FakeProvisioner {
    async fn provision_account(&self, friendly_name: &str) -> HuddleResult<ProvisionedVideoAccount> {
        self.provisioned.lock().unwrap().push(friendly_name.to_string());
        Ok(ProvisionedVideoAccount {
            account_sid: "AC-sub".into(),
            auth_token: "sub-auth".into(),
            api_key: "SK-sub".into(),
            api_secret: "sub-secret".into(),
        })
    }
}

fn service(
    h: &Harness,
    workspace_id: &str,
    workspace_name: &str,
) -> (InstallService<common::TestStore>, Arc<FakeProvisioner>) {
    let provisioner = Arc::new(FakeProvisioner::default());
    let service = InstallService::new(
        h.store.clone(),
        Arc::new(FakeInstaller {
            workspace_id: workspace_id.into(),
            workspace_name: workspace_name.into(),
        }),
        provisioner.clone(),
        "https://video.example/installed",
    );
    (service, provisioner)
}

async fn config_of(h: &Harness, tenant_id: Uuid) -> BTreeMap<String, String> {
    config_map(h.store.config().list(tenant_id).await.unwrap())
}

#[tokio::test]
async fn first_install_creates_conference_and_video_account() {
    let h = setup().await;
    let (install, provisioner) = service(&h, "T0002", "New Conf");

    let outcome = install.complete_install("code-1").await.unwrap();
    assert!(outcome.created);
    assert_eq!(outcome.redirect, "https://video.example/installed");
    assert_eq!(outcome.tenant.name, "New Conf");
    assert_eq!(outcome.tenant.workspace_id.as_deref(), Some("T0002"));

    assert_eq!(
        *provisioner.provisioned.lock().unwrap(),
        vec![format!("{}: New Conf", outcome.tenant.id)]
    );

    let config = config_of(&h, outcome.tenant.id).await;
    assert_eq!(config[TWILIO_ACCOUNT_SID], "AC-sub");
    assert_eq!(config[TWILIO_AUTH_TOKEN], "sub-auth");
    assert_eq!(config[TWILIO_API_KEY], "SK-sub");
    assert_eq!(config[TWILIO_API_SECRET], "sub-secret");
    assert_eq!(config[TWILIO_ROOM_TYPE], "peer-to-peer");
    assert_eq!(config[SLACK_BOT_TOKEN], "xoxb-code-1");
    assert_eq!(config[SLACK_BOT_USER_ID], "UBOT");
}

#[tokio::test]
async fn reinstall_only_refreshes_chat_credentials() {
    let h = setup().await;
    let (install, provisioner) = service(&h, WORKSPACE, "Example Conf");

    let outcome = install.complete_install("code-2").await.unwrap();
    assert!(!outcome.created);
    assert_eq!(outcome.tenant.id, h.tenant.id);
    assert!(provisioner.provisioned.lock().unwrap().is_empty());

    let config = config_of(&h, h.tenant.id).await;
    assert_eq!(config[SLACK_BOT_TOKEN], "xoxb-code-2");
    assert!(!config.contains_key(TWILIO_API_KEY));
}

#[tokio::test]
async fn install_binds_a_preregistered_conference() {
    let h = setup().await;
    let pending = h
        .store
        .tenants()
        .create(CreateTenant {
            name: "Future Conf 2027".into(),
            workspace_id: None,
            pending_workspace_name: Some("Future Conf".into()),
        })
        .await
        .unwrap();
    let (install, provisioner) = service(&h, "T0003", "Future Conf");

    let outcome = install.complete_install("code-3").await.unwrap();
    assert!(!outcome.created);
    assert_eq!(outcome.tenant.id, pending.id);
    assert_eq!(outcome.tenant.workspace_id.as_deref(), Some("T0003"));
    assert_eq!(outcome.tenant.pending_workspace_name, None);
    assert!(provisioner.provisioned.lock().unwrap().is_empty());

    let bound = h
        .store
        .tenants()
        .find_by_workspace("T0003")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bound.id, pending.id);
}

#[tokio::test]
async fn concurrent_installs_share_one_conference() {
    let h = setup().await;
    let (install, provisioner) = service(&h, "T0003", "Twin Conf");

    let (a, b) = join(
        install.complete_install("code-a"),
        install.complete_install("code-b"),
    )
    .await;
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.tenant.id, b.tenant.id);
    assert!(a.created != b.created);
    assert_eq!(provisioner.provisioned.lock().unwrap().len(), 1);
    let found = h.store.tenants().find_by_workspace("T0003").await.unwrap().unwrap();
    assert_eq!(found.id, a.tenant.id);
}
