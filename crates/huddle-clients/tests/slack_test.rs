use huddle_clients::slack::{SlackClient, SlackInstaller};
use huddle_core::chat::{ChatInstaller, ChatMessage, ChatPlatform};
use huddle_core::error::HuddleError;
use mockito::{Matcher, Server};
use serde_json::json;

fn client(server: &Server) -> SlackClient {
    SlackClient::new(reqwest::Client::new(), "xoxb-test").with_base_url(server.url())
}

#[tokio::test]
async fn members_are_listed_across_cursors() {
    let mut server = Server::new_async().await;
    let first = server
        .mock("GET", "/users.list")
        .match_header("authorization", "Bearer xoxb-test")
        .match_query(Matcher::UrlEncoded("cursor".into(), "".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ok": true,
                "members": [
                    { "id": "U1", "profile": { "email": "ada@example.com", "real_name": "Ada" } },
                    { "id": "UBOT", "is_bot": true, "profile": {} }
                ],
                "response_metadata": { "next_cursor": "page2" }
            })
            .to_string(),
        )
        .create_async()
        .await;
    let second = server
        .mock("GET", "/users.list")
        .match_query(Matcher::UrlEncoded("cursor".into(), "page2".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ok": true,
                "members": [
                    { "id": "U2", "deleted": true, "profile": { "email": "gone@example.com" } }
                ],
                "response_metadata": { "next_cursor": "" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let members = client(&server).list_members().await.unwrap();
    first.assert_async().await;
    second.assert_async().await;

    assert_eq!(members.len(), 3);
    assert_eq!(members[0].email.as_deref(), Some("ada@example.com"));
    assert_eq!(members[0].real_name.as_deref(), Some("Ada"));
    assert!(members[1].is_bot);
    assert!(members[2].deleted);
}

#[tokio::test]
async fn api_level_failures_are_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/users.info")
        .match_query(Matcher::UrlEncoded("user".into(), "U404".into()))
        .with_header("content-type", "application/json")
        .with_body(json!({ "ok": false, "error": "user_not_found" }).to_string())
        .create_async()
        .await;

    let err = client(&server).user_info("U404").await.unwrap_err();
    match err {
        HuddleError::ExternalUnavailable { service, message } => {
            assert_eq!(service, "slack");
            assert!(message.contains("user_not_found"));
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn messages_and_home_views_are_posted_as_json() {
    let mut server = Server::new_async().await;
    let post = server
        .mock("POST", "/chat.postMessage")
        .match_header("authorization", "Bearer xoxb-test")
        .match_body(Matcher::PartialJson(json!({ "channel": "C-MODS", "text": "help" })))
        .with_header("content-type", "application/json")
        .with_body(json!({ "ok": true, "ts": "1.2" }).to_string())
        .create_async()
        .await;
    let home = server
        .mock("POST", "/views.publish")
        .match_body(Matcher::PartialJson(json!({ "user_id": "U1", "view": { "type": "home" } })))
        .with_header("content-type", "application/json")
        .with_body(json!({ "ok": true, "view": {} }).to_string())
        .create_async()
        .await;
    let respond = server
        .mock("POST", "/commands/respond")
        .match_body(Matcher::PartialJson(json!({ "response_type": "ephemeral" })))
        .with_body("ok")
        .create_async()
        .await;

    let slack = client(&server);
    slack
        .post_message(ChatMessage {
            channel: "C-MODS".into(),
            text: "help".into(),
            blocks: json!([]),
        })
        .await
        .unwrap();
    slack
        .publish_home("U1", json!({ "type": "home", "blocks": [] }))
        .await
        .unwrap();
    slack
        .respond(
            &format!("{}/commands/respond", server.url()),
            json!({ "text": "hi", "response_type": "ephemeral" }),
        )
        .await
        .unwrap();

    post.assert_async().await;
    home.assert_async().await;
    respond.assert_async().await;
}

#[tokio::test]
async fn channels_are_listed() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/conversations.list")
        .match_query(Matcher::Any)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ok": true,
                "channels": [
                    { "id": "C1", "name": "general", "is_private": false },
                    { "id": "C2", "name": "moderators", "is_private": true }
                ],
                "response_metadata": { "next_cursor": "" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let channels = client(&server).list_channels().await.unwrap();
    let names: Vec<_> = channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["general", "moderators"]);
}

#[tokio::test]
async fn install_code_is_exchanged_for_a_bot_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/oauth.v2.access")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_body(Matcher::UrlEncoded("code".into(), "abc".into()))
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "ok": true,
                "access_token": "xoxb-new",
                "bot_user_id": "UBOT",
                "team": { "id": "T9", "name": "New Conf" }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let grant = SlackInstaller::new(reqwest::Client::new(), "client-id", "client-secret")
        .with_base_url(server.url())
        .exchange_code("abc")
        .await
        .unwrap();
    mock.assert_async().await;

    assert_eq!(grant.bot_token, "xoxb-new");
    assert_eq!(grant.bot_user_id, "UBOT");
    assert_eq!(grant.workspace_id, "T9");
    assert_eq!(grant.workspace_name, "New Conf");
}
