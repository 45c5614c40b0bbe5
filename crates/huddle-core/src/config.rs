//! Typed view of a conference's key/value configuration rows.

use std::collections::BTreeMap;

use crate::error::{HuddleError, HuddleResult};
use crate::models::room::RoomMode;

pub const FRONTEND_URL: &str = "FRONTEND_URL";
pub const TWILIO_CALLBACK_URL: &str = "TWILIO_CALLBACK_URL";
pub const TWILIO_ROOM_TYPE: &str = "TWILIO_ROOM_TYPE";
pub const TWILIO_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
pub const TWILIO_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
pub const TWILIO_API_KEY: &str = "TWILIO_API_KEY";
pub const TWILIO_API_SECRET: &str = "TWILIO_API_SECRET";
pub const AUTO_CREATE_USER: &str = "AUTO_CREATE_USER";
pub const SLACK_BOT_TOKEN: &str = "SLACK_BOT_TOKEN";
pub const SLACK_BOT_USER_ID: &str = "SLACK_BOT_USER_ID";

/// Process-level fallbacks for keys a conference has not set.
#[derive(Debug, Clone)]
pub struct ConfigDefaults {
    pub frontend_url: String,
    pub video_callback_url: String,
}

impl Default for ConfigDefaults {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".into(),
            video_callback_url: "http://localhost:3001/twilio/event".into(),
        }
    }
}

/// Provider credentials of one conference.
#[derive(Debug, Clone)]
pub struct VideoCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct ConferenceConfig {
    pub frontend_url: String,
    pub video_callback_url: String,
    pub room_mode: RoomMode,
    pub auto_create_user: bool,
    /// Every row as stored, including keys this type does not model.
    pub raw: BTreeMap<String, String>,
}

impl ConferenceConfig {
    pub fn from_entries(raw: BTreeMap<String, String>, defaults: &ConfigDefaults) -> Self {
        let frontend_url = raw
            .get(FRONTEND_URL)
            .cloned()
            .unwrap_or_else(|| defaults.frontend_url.clone());
        let video_callback_url = raw
            .get(TWILIO_CALLBACK_URL)
            .cloned()
            .unwrap_or_else(|| defaults.video_callback_url.clone());
        let room_mode = match raw.get(TWILIO_ROOM_TYPE) {
            None => RoomMode::default(),
            Some(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %value, "unknown room type, using default");
                RoomMode::default()
            }),
        };
        let auto_create_user = raw
            .get(AUTO_CREATE_USER)
            .map(|v| !v.eq_ignore_ascii_case("false"))
            .unwrap_or(true);

        Self {
            frontend_url,
            video_callback_url,
            room_mode,
            auto_create_user,
            raw,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> HuddleResult<&str> {
        self.get(key)
            .ok_or_else(|| HuddleError::validation(format!("conference is missing {key}")))
    }

    pub fn video_credentials(&self) -> HuddleResult<VideoCredentials> {
        Ok(VideoCredentials {
            account_sid: self.require(TWILIO_ACCOUNT_SID)?.to_string(),
            auth_token: self.require(TWILIO_AUTH_TOKEN)?.to_string(),
            api_key: self.require(TWILIO_API_KEY)?.to_string(),
            api_secret: self.require(TWILIO_API_SECRET)?.to_string(),
        })
    }

    pub fn chat_bot_token(&self) -> HuddleResult<&str> {
        self.require(SLACK_BOT_TOKEN)
    }

    pub fn chat_bot_user_id(&self) -> Option<&str> {
        self.get(SLACK_BOT_USER_ID)
    }
}
