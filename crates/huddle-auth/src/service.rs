//! Handoff service: minting, redemption and session authentication.

use std::sync::Arc;

use chrono::{Duration, Utc};
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::models::account::Account;
use huddle_core::models::session::{CreateSession, Session};
use huddle_core::repository::{AccountRepository, SessionRepository, Store};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::HandoffConfig;
use crate::error::AuthError;
use crate::token;

/// Result of redeeming a handoff token.
#[derive(Debug)]
pub struct Redemption {
    /// Raw session token, returned to the client and never stored.
    pub session_token: String,
    pub session: Session,
    /// Conference workspace key the token was minted for.
    pub workspace_id: String,
    /// Room the user was heading to.
    pub room_name: String,
}

/// Handoff token issuer/redeemer.
///
/// Generic over the storage bundle so that the auth layer has no
/// dependency on the database crate.
pub struct HandoffService<S: Store> {
    store: Arc<S>,
    config: HandoffConfig,
}

impl<S: Store> HandoffService<S> {
    pub fn new(store: Arc<S>, config: HandoffConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &HandoffConfig {
        &self.config
    }

    /// Sign a handoff token for `account_id`, reusing its login key
    /// while that key is still fresh.
    pub async fn mint(
        &self,
        account_id: Uuid,
        workspace_id: &str,
        room_name: &str,
    ) -> HuddleResult<String> {
        let account = self.store.accounts().get_by_id(account_id).await?;
        let login_key = match current_login_key(&account) {
            Some(key) => key.to_string(),
            None => self.rotate_login_key(account_id).await?,
        };

        Ok(token::issue_handoff_token(
            account_id,
            workspace_id,
            &login_key,
            room_name,
            &self.config,
        )?)
    }

    /// Replace the account's login key. Every token minted under the
    /// previous key stops being redeemable.
    pub async fn rotate_login_key(&self, account_id: Uuid) -> HuddleResult<String> {
        let login_key = token::generate_login_key();
        let expires_at = Utc::now() + Duration::seconds(self.config.token_lifetime_secs as i64);
        self.store
            .accounts()
            .set_login_key(account_id, &login_key, expires_at)
            .await?;
        debug!(account = %account_id, "Login key rotated");
        Ok(login_key)
    }

    /// Exchange a handoff token for a new session.
    pub async fn redeem(&self, raw: &str) -> HuddleResult<Redemption> {
        let claims = token::decode_handoff_token(raw, &self.config)?;

        let account_id = Uuid::parse_str(&claims.uid)
            .map_err(|e| AuthError::TokenInvalid(format!("bad account id: {e}")))?;
        let account = match self.store.accounts().get_by_id(account_id).await {
            Ok(account) => account,
            Err(HuddleError::NotFound { .. }) => {
                return Err(AuthError::TokenInvalid("unknown account".into()).into());
            }
            Err(e) => return Err(e),
        };

        if account.login_key.as_deref() != Some(claims.secret.as_str()) {
            return Err(AuthError::StaleLoginKey.into());
        }

        let session_token = token::generate_session_token();
        let session = self
            .store
            .sessions()
            .create(CreateSession {
                account_id,
                token: token::hash_session_token(&session_token),
                created_with: "handoff".into(),
                expires_at: Utc::now()
                    + Duration::seconds(self.config.session_lifetime_secs as i64),
            })
            .await?;

        info!(account = %account_id, workspace = %claims.team, "Handoff redeemed");

        Ok(Redemption {
            session_token,
            session,
            workspace_id: claims.team,
            room_name: claims.room_name,
        })
    }

    /// Resolve a raw session token to its live session and account.
    pub async fn authenticate(&self, raw: &str) -> HuddleResult<(Session, Account)> {
        let session = self
            .store
            .sessions()
            .find_by_token(&token::hash_session_token(raw))
            .await?
            .ok_or(AuthError::SessionUnknown)?;

        if session.is_expired(Utc::now()) {
            // Best effort; an expired row is useless either way.
            let _ = self.store.sessions().delete(session.id).await;
            return Err(AuthError::SessionExpired.into());
        }

        let account = self.store.accounts().get_by_id(session.account_id).await?;
        Ok((session, account))
    }
}

fn current_login_key(account: &Account) -> Option<&str> {
    let fresh = account
        .login_expires_at
        .is_some_and(|expires| expires > Utc::now());
    if fresh { account.login_key.as_deref() } else { None }
}
