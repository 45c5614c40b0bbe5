//! Identity bridge: chat users to accounts and tenant profiles.
//!
//! Every path is a two-phase get-or-create. A uniqueness conflict on
//! create means a concurrent caller got there first, so the existing
//! record is loaded and reused.

use std::collections::HashSet;
use std::sync::Arc;

use huddle_core::batch::{BatchReport, settle};
use huddle_core::chat::ChatMember;
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::account::{Account, CreateAccount, UpdateAccount};
use huddle_core::models::acl::Acl;
use huddle_core::models::profile::{CreateProfile, Profile, UpdateProfile};
use huddle_core::models::role::{Role, RoleSuffix};
use huddle_core::repository::{AccountRepository, ProfileRepository, RoleRepository, Store};
use rand::RngCore;
use tracing::{debug, info};

use crate::conference::Conference;
use crate::roles::RoleCache;

pub struct IdentityBridge<S: Store> {
    store: Arc<S>,
    roles: Arc<RoleCache<S>>,
}

impl<S: Store> IdentityBridge<S> {
    pub fn new(store: Arc<S>, roles: Arc<RoleCache<S>>) -> Self {
        Self { store, roles }
    }

    /// Account behind a chat user, creating the account and its
    /// profile on first sight. `member` skips the profile lookup on the
    /// chat platform when the caller already has it.
    pub async fn get_or_create_account(
        &self,
        conf: &Conference,
        chat_user_id: &str,
        member: Option<&ChatMember>,
    ) -> HuddleResult<Account> {
        let tenant_id = conf.tenant_id();
        let conference_role = self
            .roles
            .get_or_create_role(tenant_id, RoleSuffix::Conference)
            .await?;

        if let Some(profile) = self
            .store
            .profiles()
            .find_by_chat_user(tenant_id, chat_user_id)
            .await?
        {
            self.roles
                .ensure_member(&conference_role, profile.account_id)
                .await?;
            return self.store.accounts().get_by_id(profile.account_id).await;
        }

        let fetched;
        let member = match member {
            Some(m) => m,
            None => {
                fetched = conf.chat().user_info(chat_user_id).await?;
                &fetched
            }
        };
        let email = member.email.as_deref().ok_or_else(|| {
            HuddleError::validation(format!("chat user {chat_user_id} has no email address"))
        })?;

        let account = match self.store.accounts().find_by_email(email).await? {
            Some(account) => account,
            None if conf.config().auto_create_user => self.create_account(member, email).await?,
            None => {
                info!(conference = %tenant_id, email, "Account auto-creation disabled");
                return Err(HuddleError::not_found("account", email));
            }
        };

        let profile = self
            .link_profile(&conference_role, &account, chat_user_id, member)
            .await?;
        self.roles.ensure_member(&conference_role, account.id).await?;

        if profile.account_id != account.id {
            // The chat user was linked to another account concurrently.
            return self.store.accounts().get_by_id(profile.account_id).await;
        }
        Ok(account)
    }

    async fn create_account(&self, member: &ChatMember, email: &str) -> HuddleResult<Account> {
        let accounts = self.store.accounts();
        let created = accounts
            .create(CreateAccount {
                username: email.to_string(),
                email: email.to_string(),
                display_name: member.real_name.clone().unwrap_or_else(|| email.to_string()),
                password: random_password(),
            })
            .await;

        match created {
            Ok(account) => {
                let account = accounts
                    .update(
                        account.id,
                        UpdateAccount {
                            acl: Some(Acl::owner_only(account.id)),
                            ..UpdateAccount::default()
                        },
                    )
                    .await?;
                info!(account = %account.id, chat_user = %member.id, "Account created from chat identity");
                Ok(account)
            }
            Err(e) if e.is_conflict() => {
                debug!(email, "Account created concurrently, reusing");
                accounts
                    .find_by_email(email)
                    .await?
                    .ok_or_else(|| HuddleError::not_found("account", email))
            }
            Err(e) => Err(e),
        }
    }

    async fn link_profile(
        &self,
        conference_role: &Role,
        account: &Account,
        chat_user_id: &str,
        member: &ChatMember,
    ) -> HuddleResult<Profile> {
        let tenant_id = conference_role.tenant_id.ok_or_else(|| {
            HuddleError::Internal(format!("role {} has no tenant", conference_role.name))
        })?;
        let profiles = self.store.profiles();
        let created = profiles
            .create(CreateProfile {
                account_id: account.id,
                tenant_id,
                chat_user_id: chat_user_id.to_string(),
                display_name: member.real_name.clone(),
                acl: Acl::private()
                    .with_role_read(conference_role.id)
                    .with_account_write(account.id),
            })
            .await;

        match created {
            Ok(profile) => Ok(profile),
            Err(e) if e.is_conflict() => {
                if let Some(profile) = profiles.find_by_chat_user(tenant_id, chat_user_id).await? {
                    return Ok(profile);
                }
                profiles
                    .find_by_account(tenant_id, account.id)
                    .await?
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Bring every chat workspace member into the tenant.
    ///
    /// Unseen members are bridged. Members already bridged get an
    /// overly public account ACL tightened, a moderator role if they
    /// are not yet enrolled, and a missing display name backfilled.
    pub async fn provision_all(&self, conf: &Conference) -> HuddleResult<BatchReport<()>> {
        let members = conf.chat().list_members().await?;
        let conference_role = self
            .roles
            .get_or_create_role(conf.tenant_id(), RoleSuffix::Conference)
            .await?;
        let enrolled: HashSet<_> = self
            .store
            .roles()
            .list_members(conference_role.id)
            .await?
            .into_iter()
            .collect();

        let work = members
            .iter()
            .filter(|m| m.email.is_some() && !m.deleted)
            .map(|m| (m.id.clone(), self.sync_member(conf, m, &enrolled)));
        let report = settle("provision", work).await;

        info!(
            conference = %conf.tenant_id(),
            synced = report.succeeded.len(),
            failed = report.failed.len(),
            "Workspace members provisioned"
        );
        Ok(report)
    }

    async fn sync_member(
        &self,
        conf: &Conference,
        member: &ChatMember,
        enrolled: &HashSet<uuid::Uuid>,
    ) -> HuddleResult<()> {
        let email = member.email.as_deref().unwrap_or_default();
        let existing = match self.store.accounts().find_by_email(email).await? {
            Some(account) => self
                .store
                .profiles()
                .find_by_account(conf.tenant_id(), account.id)
                .await?
                .map(|profile| (account, profile)),
            None => None,
        };

        let Some((account, profile)) = existing else {
            self.get_or_create_account(conf, &member.id, Some(member))
                .await?;
            return Ok(());
        };

        if account.acl.public_read {
            let acl = Acl {
                public_read: false,
                ..account.acl.clone()
            };
            self.store
                .accounts()
                .update(
                    account.id,
                    UpdateAccount {
                        acl: Some(acl),
                        ..UpdateAccount::default()
                    },
                )
                .await?;
        }

        if !enrolled.contains(&account.id) {
            let moderator = self
                .roles
                .get_or_create_role(conf.tenant_id(), RoleSuffix::Moderator)
                .await?;
            self.roles.ensure_member(&moderator, account.id).await?;
        }

        if profile.display_name.is_none() && member.real_name.is_some() {
            self.store
                .profiles()
                .update(
                    profile.id,
                    UpdateProfile {
                        display_name: member.real_name.clone(),
                    },
                )
                .await?;
        }
        Ok(())
    }
}

fn random_password() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
