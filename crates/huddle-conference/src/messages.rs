//! Chat message layouts (Block Kit JSON).

use serde_json::{Value, json};

use huddle_core::chat::ChatMessage;

pub const NOT_ENABLED: &str = "Sorry, this feature is not yet enabled.";

/// A room as shown in chat listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRoom {
    pub title: String,
    pub member_chat_ids: Vec<String>,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomListing {
    NotEnabled,
    Rooms(Vec<ListedRoom>),
}

fn section(text: impl Into<String>) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": text.into() }
    })
}

fn mention(chat_user_id: &str) -> String {
    format!("<@{chat_user_id}>")
}

/// Ephemeral slash-command reply reporting a failure.
pub fn error_reply(reason: &str) -> Value {
    json!({
        "text": format!("Sorry, I was unable to process your request. {reason}"),
        "response_type": "ephemeral",
    })
}

/// Ephemeral slash-command reply, optionally carrying a link.
pub fn link_reply(
    text: &str,
    link: Option<(&str, &str)>,
    support_channel: Option<&str>,
) -> Value {
    let body = match link {
        Some((label, url)) => format!("{text} <{url}|{label}>"),
        None => text.to_string(),
    };
    let mut hint = String::new();
    if link.is_some() {
        hint.push_str(
            "Please make sure to open this link in Chrome or Safari; embedded mobile browsers will not work. ",
        );
    }
    if let Some(channel) = support_channel {
        hint.push_str(&format!("Having trouble with technical issues? Come join <#{channel}>."));
    }
    json!({
        "text": text,
        "response_type": "ephemeral",
        "blocks": [section(body)],
        "attachments": [{ "text": hint }],
    })
}

pub fn join_link_reply(room_name: &str, link: &str, support_channel: Option<&str>) -> Value {
    link_reply(
        &format!(
            "Finish creating or joining the live video call '{room_name}' here! :tv: Remember to keep Slack open too to keep the conversation going here!"
        ),
        Some(("Join Call", link)),
        support_channel,
    )
}

pub fn moderation_received_reply(support_channel: Option<&str>) -> Value {
    link_reply(
        "Your message has been received by the moderators. They will contact you ASAP to follow up. \
         Moderators are volunteers and cannot provide around-the-clock service, but every report will be followed up.",
        None,
        support_channel,
    )
}

/// Blocks describing the rooms a user can join.
pub fn room_listing_blocks(listing: &RoomListing) -> Vec<Value> {
    let rooms = match listing {
        RoomListing::NotEnabled => return vec![section(NOT_ENABLED)],
        RoomListing::Rooms(rooms) => rooms,
    };
    if rooms.is_empty() {
        return vec![section(
            "Nobody is in a video call yet. To create a new room, send a new message `/video [name of room to join or create]`",
        )];
    }

    let header = format!(
        "{} video room{} up right now (this list includes all public rooms and all private rooms to which you have access). \
         Join one of these, or create a new room by sending a new message `/video [name of room to join or create]`",
        rooms.len(),
        if rooms.len() > 1 { "s are" } else { " is" }
    );
    let mut blocks = vec![section(header)];
    for room in rooms {
        let members = if room.member_chat_ids.is_empty() {
            "(Empty)".to_string()
        } else {
            room.member_chat_ids
                .iter()
                .map(|id| mention(id))
                .collect::<Vec<_>>()
                .join(",")
        };
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("{}: {members}", room.title) },
            "accessory": {
                "type": "button",
                "action_id": "join_video",
                "url": room.link,
                "text": { "type": "plain_text", "text": "Join Video" }
            }
        }));
    }
    blocks
}

pub fn room_listing_reply(listing: &RoomListing) -> Value {
    json!({
        "text": "Live video information",
        "response_type": "ephemeral",
        "blocks": room_listing_blocks(listing),
    })
}

/// App home view of a conference.
pub fn home_view(conference_name: &str, listing: &RoomListing) -> Value {
    let mut blocks = vec![json!({ "type": "divider" })];
    blocks.extend(room_listing_blocks(listing));
    json!({
        "type": "home",
        "title": { "type": "plain_text", "text": format!("{conference_name} LIVE") },
        "blocks": blocks,
    })
}

/// Quote every line of a user-supplied message.
fn quote(message: &str) -> String {
    message
        .lines()
        .map(|line| format!(">{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn moderation_from_chat(channel: &str, reporter_chat_id: &str, message: &str) -> ChatMessage {
    ChatMessage {
        channel: channel.to_string(),
        text: "Moderation request from slack".into(),
        blocks: json!([
            section(format!(
                "A moderation request was received from {} in slack:",
                mention(reporter_chat_id)
            )),
            section(quote(message)),
        ]),
    }
}

pub fn moderation_from_web(
    channel: &str,
    reporter_chat_id: &str,
    room_title: &str,
    participant_chat_ids: &[String],
    message: &str,
) -> ChatMessage {
    let participants = participant_chat_ids
        .iter()
        .map(|id| mention(id))
        .collect::<Vec<_>>()
        .join(", ");
    ChatMessage {
        channel: channel.to_string(),
        text: "Moderation request from web".into(),
        blocks: json!([
            section(format!(
                "A moderation request was received from {} while in the web chat room titled: '{room_title}', \
                 which contained at the time the following users: {participants}. Message follows:",
                mention(reporter_chat_id)
            )),
            section(quote(message)),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiline_messages_are_fully_quoted() {
        let msg = moderation_from_chat("C1", "U1", "first\nsecond");
        assert_eq!(msg.blocks[1]["text"]["text"], ">first\n>second");
        assert_eq!(msg.channel, "C1");
    }

    #[test]
    fn empty_rooms_are_labelled() {
        let listing = RoomListing::Rooms(vec![ListedRoom {
            title: "standup".into(),
            member_chat_ids: Vec::new(),
            link: "https://video.example/x".into(),
        }]);
        let blocks = room_listing_blocks(&listing);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1]["text"]["text"], "standup: (Empty)");
        assert_eq!(blocks[1]["accessory"]["url"], "https://video.example/x");
    }

    #[test]
    fn disabled_listing_says_so() {
        let blocks = room_listing_blocks(&RoomListing::NotEnabled);
        assert_eq!(blocks[0]["text"]["text"], NOT_ENABLED);
    }
}
