//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use huddle_auth::config::HandoffConfig;
use huddle_core::config::ConfigDefaults;
use huddle_db::DbConfig;

const DEFAULT_BIND: &str = "0.0.0.0:3001";
const DEFAULT_CALL_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INSTALL_SUCCESS_URL: &str = "http://localhost:3000/install/success";

/// App credentials for the chat platform's install exchange and
/// request signing.
#[derive(Debug, Clone, Default)]
pub struct ChatAppConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Empty disables signature checks on chat callbacks.
    pub signing_secret: String,
}

/// Master account used to provision per-conference video accounts.
#[derive(Debug, Clone, Default)]
pub struct VideoMasterConfig {
    pub account_sid: String,
    pub auth_token: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub db: DbConfig,
    pub handoff: HandoffConfig,
    pub defaults: ConfigDefaults,
    pub install_success_url: String,
    pub chat: ChatAppConfig,
    pub video_master: VideoMasterConfig,
    pub call_timeout: Duration,
    /// Skip privilege creation and tenant warm-up at startup.
    pub skip_init: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count
    /// as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = get("HUDDLE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.into())
            .parse::<SocketAddr>()
            .context("HUDDLE_BIND must be a socket address")?;

        let db_defaults = DbConfig::default();
        let connect_attempts = match get("HUDDLE_DB_CONNECT_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .with_context(|| format!("HUDDLE_DB_CONNECT_ATTEMPTS is not a number: {raw}"))?,
            None => db_defaults.connect_attempts,
        };
        let db = DbConfig {
            url: get("HUDDLE_DB_URL").unwrap_or(db_defaults.url),
            namespace: get("HUDDLE_DB_NAMESPACE").unwrap_or(db_defaults.namespace),
            database: get("HUDDLE_DB_DATABASE").unwrap_or(db_defaults.database),
            username: get("HUDDLE_DB_USER").unwrap_or(db_defaults.username),
            password: get("HUDDLE_DB_PASSWORD").unwrap_or(db_defaults.password),
            connect_attempts,
            retry_delay: db_defaults.retry_delay,
        };

        let Some(signing_key) = get("HUDDLE_HANDOFF_KEY") else {
            bail!("HUDDLE_HANDOFF_KEY is required");
        };
        let handoff = HandoffConfig {
            signing_key,
            ..HandoffConfig::default()
        };

        let fallback = ConfigDefaults::default();
        let defaults = ConfigDefaults {
            frontend_url: get("HUDDLE_FRONTEND_URL").unwrap_or(fallback.frontend_url),
            video_callback_url: get("HUDDLE_VIDEO_CALLBACK_URL")
                .unwrap_or(fallback.video_callback_url),
        };

        let call_timeout = match get("HUDDLE_CALL_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("HUDDLE_CALL_TIMEOUT_SECS is not a number: {raw}"))?,
            None => DEFAULT_CALL_TIMEOUT_SECS,
        };

        let skip_init = get("HUDDLE_SKIP_INIT")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bind,
            db,
            handoff,
            defaults,
            install_success_url: get("HUDDLE_INSTALL_SUCCESS_URL")
                .unwrap_or_else(|| DEFAULT_INSTALL_SUCCESS_URL.into()),
            chat: ChatAppConfig {
                client_id: get("SLACK_CLIENT_ID").unwrap_or_default(),
                client_secret: get("SLACK_CLIENT_SECRET").unwrap_or_default(),
                signing_secret: get("SLACK_SIGNING_SECRET").unwrap_or_default(),
            },
            video_master: VideoMasterConfig {
                account_sid: get("TWILIO_MASTER_SID").unwrap_or_default(),
                auth_token: get("TWILIO_MASTER_AUTH_TOKEN").unwrap_or_default(),
            },
            call_timeout: Duration::from_secs(call_timeout),
            skip_init,
        })
    }
}
