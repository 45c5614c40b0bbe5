//! Collaborator decorators that put a deadline on every remote call.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use huddle_core::batch::with_timeout;
use huddle_core::chat::{ChatChannel, ChatMember, ChatMessage, ChatPlatform};
use huddle_core::error::HuddleResult;
use huddle_core::video::{CallParticipant, CreateCall, LiveCall, VideoProvider};

pub struct BoundedVideo {
    inner: Arc<dyn VideoProvider>,
    limit: Duration,
}

impl BoundedVideo {
    pub fn wrap(inner: Arc<dyn VideoProvider>, limit: Duration) -> Arc<dyn VideoProvider> {
        Arc::new(Self { inner, limit })
    }
}

#[async_trait]
impl VideoProvider for BoundedVideo {
    async fn list_live_calls(&self) -> HuddleResult<Vec<LiveCall>> {
        with_timeout("video", self.limit, self.inner.list_live_calls()).await
    }

    async fn create_call(&self, input: CreateCall) -> HuddleResult<LiveCall> {
        with_timeout("video", self.limit, self.inner.create_call(input)).await
    }

    async fn list_participants(&self, call_id: &str) -> HuddleResult<Vec<CallParticipant>> {
        with_timeout("video", self.limit, self.inner.list_participants(call_id)).await
    }

    async fn disconnect_participant(&self, call_id: &str, identity: &str) -> HuddleResult<()> {
        with_timeout(
            "video",
            self.limit,
            self.inner.disconnect_participant(call_id, identity),
        )
        .await
    }

    async fn fetch_call_by_name(&self, unique_name: &str) -> HuddleResult<LiveCall> {
        with_timeout("video", self.limit, self.inner.fetch_call_by_name(unique_name)).await
    }

    fn access_token(&self, identity: &str, call_name: &str) -> HuddleResult<String> {
        self.inner.access_token(identity, call_name)
    }
}

pub struct BoundedChat {
    inner: Arc<dyn ChatPlatform>,
    limit: Duration,
}

impl BoundedChat {
    pub fn wrap(inner: Arc<dyn ChatPlatform>, limit: Duration) -> Arc<dyn ChatPlatform> {
        Arc::new(Self { inner, limit })
    }
}

#[async_trait]
impl ChatPlatform for BoundedChat {
    async fn list_members(&self) -> HuddleResult<Vec<ChatMember>> {
        with_timeout("chat", self.limit, self.inner.list_members()).await
    }

    async fn user_info(&self, user_id: &str) -> HuddleResult<ChatMember> {
        with_timeout("chat", self.limit, self.inner.user_info(user_id)).await
    }

    async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>> {
        with_timeout("chat", self.limit, self.inner.list_channels()).await
    }

    async fn post_message(&self, message: ChatMessage) -> HuddleResult<()> {
        with_timeout("chat", self.limit, self.inner.post_message(message)).await
    }

    async fn respond(&self, response_url: &str, body: serde_json::Value) -> HuddleResult<()> {
        with_timeout("chat", self.limit, self.inner.respond(response_url, body)).await
    }

    async fn publish_home(&self, user_id: &str, view: serde_json::Value) -> HuddleResult<()> {
        with_timeout("chat", self.limit, self.inner.publish_home(user_id, view)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::error::HuddleError;

    struct Stalled;

    #[async_trait]
    impl ChatPlatform for Stalled {
        async fn list_members(&self) -> HuddleResult<Vec<ChatMember>> {
            futures::future::pending().await
        }
        async fn user_info(&self, _: &str) -> HuddleResult<ChatMember> {
            futures::future::pending().await
        }
        async fn list_channels(&self) -> HuddleResult<Vec<ChatChannel>> {
            Ok(Vec::new())
        }
        async fn post_message(&self, _: ChatMessage) -> HuddleResult<()> {
            Ok(())
        }
        async fn respond(&self, _: &str, _: serde_json::Value) -> HuddleResult<()> {
            Ok(())
        }
        async fn publish_home(&self, _: &str, _: serde_json::Value) -> HuddleResult<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_call_becomes_external_unavailable() {
        let chat = BoundedChat::wrap(Arc::new(Stalled), Duration::from_secs(10));
        let err = chat.list_members().await.unwrap_err();
        assert!(matches!(err, HuddleError::ExternalUnavailable { ref service, .. } if service == "chat"));

        // Fast calls pass straight through.
        assert!(chat.list_channels().await.unwrap().is_empty());
    }
}
