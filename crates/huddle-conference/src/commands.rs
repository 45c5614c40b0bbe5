//! Slash command dispatch.
//!
//! Commands are acknowledged by the HTTP layer straight away; the reply
//! is delivered later through the command's response URL.

use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::repository::Store;
use serde::Deserialize;
use tracing::warn;

use crate::gateway::Gateway;
use crate::messages;

/// Form body of a slash command invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct SlashCommand {
    pub command: String,
    #[serde(default)]
    pub text: String,
    pub user_id: String,
    pub team_id: String,
    pub response_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Moderator,
    Video,
}

impl CommandKind {
    pub fn parse(command: &str) -> Option<Self> {
        match command {
            "/moderator" | "/saysomething" => Some(Self::Moderator),
            "/video" | "/videoprivate" | "/videolist" | "/video_t" => Some(Self::Video),
            _ => None,
        }
    }
}

impl<S: Store> Gateway<S> {
    /// Run a slash command and reply through its response URL.
    pub async fn handle_slash_command(&self, cmd: SlashCommand) -> HuddleResult<()> {
        let kind = CommandKind::parse(&cmd.command)
            .ok_or_else(|| HuddleError::validation(format!("unknown command {}", cmd.command)))?;
        let conf = self.registry().resolve(&cmd.team_id).await?;
        let support = conf.tech_support_channel();

        let reply = match kind {
            CommandKind::Moderator => {
                match self
                    .moderator_from_chat(&cmd.team_id, &cmd.user_id, &cmd.text)
                    .await
                {
                    Ok(()) => messages::moderation_received_reply(support),
                    Err(e) => {
                        warn!(workspace = %cmd.team_id, error = %e, "Moderation request failed");
                        messages::link_reply(
                            "An internal error occurred while sending your message. Please try again or email the organizers.",
                            None,
                            support,
                        )
                    }
                }
            }
            CommandKind::Video if cmd.text.trim().is_empty() => {
                match self.list_rooms_for_chat(&cmd.team_id, &cmd.user_id).await {
                    Ok(listing) => messages::room_listing_reply(&listing),
                    Err(e) => messages::error_reply(&e.user_message()),
                }
            }
            CommandKind::Video => {
                let room_name = cmd.text.trim();
                match self
                    .chat_join_link(&cmd.team_id, &cmd.user_id, room_name)
                    .await
                {
                    Ok(link) => messages::join_link_reply(room_name, &link, support),
                    Err(e) => messages::error_reply(&e.user_message()),
                }
            }
        };

        conf.chat().respond(&cmd.response_url, reply).await
    }
}
