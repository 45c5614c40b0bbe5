//! Builds tenant-scoped collaborator clients from a conference's config.

use std::sync::Arc;

use crate::chat::ChatPlatform;
use crate::config::ConferenceConfig;
use crate::error::HuddleResult;
use crate::video::VideoProvider;

pub trait ClientFactory: Send + Sync {
    fn video(&self, config: &ConferenceConfig) -> HuddleResult<Arc<dyn VideoProvider>>;
    fn chat(&self, config: &ConferenceConfig) -> HuddleResult<Arc<dyn ChatPlatform>>;
}
