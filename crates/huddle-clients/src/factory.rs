//! Builds per-conference provider and chat clients over one shared
//! HTTP connection pool.

use std::sync::Arc;

use huddle_core::chat::ChatPlatform;
use huddle_core::config::ConferenceConfig;
use huddle_core::error::HuddleResult;
use huddle_core::factory::ClientFactory;
use huddle_core::video::VideoProvider;
use reqwest::Client;

use crate::slack::{self, SlackClient};
use crate::twilio::{self, TwilioVideo};

#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: Client,
    video_base_url: String,
    chat_base_url: String,
}

impl HttpClientFactory {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            video_base_url: twilio::VIDEO_BASE_URL.to_string(),
            chat_base_url: slack::API_BASE_URL.to_string(),
        }
    }

    pub fn with_base_urls(mut self, video: impl Into<String>, chat: impl Into<String>) -> Self {
        self.video_base_url = video.into();
        self.chat_base_url = chat.into();
        self
    }
}

impl ClientFactory for HttpClientFactory {
    fn video(&self, config: &ConferenceConfig) -> HuddleResult<Arc<dyn VideoProvider>> {
        let credentials = config.video_credentials()?;
        Ok(Arc::new(
            TwilioVideo::new(self.http.clone(), credentials).with_base_url(&self.video_base_url),
        ))
    }

    fn chat(&self, config: &ConferenceConfig) -> HuddleResult<Arc<dyn ChatPlatform>> {
        let token = config.chat_bot_token()?;
        Ok(Arc::new(
            SlackClient::new(self.http.clone(), token).with_base_url(&self.chat_base_url),
        ))
    }
}
