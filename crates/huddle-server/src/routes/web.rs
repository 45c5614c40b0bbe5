//! JSON API used by the web client.

use std::str::FromStr;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use huddle_conference::gateway::NewRoom;
use huddle_core::error::{HuddleError, HuddleResult};
use huddle_core::repository::Store;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error};
use uuid::Uuid;

use crate::state::AppState;

/// `{"status":"error","message":...}` with a status code matching the
/// failure. Internal details stay in the log.
pub fn error_response(err: &HuddleError) -> Response {
    let status = match err {
        HuddleError::NotFound { .. } => StatusCode::NOT_FOUND,
        HuddleError::Unauthorized { .. } | HuddleError::InvalidToken(_) => StatusCode::FORBIDDEN,
        HuddleError::Conflict { .. } => StatusCode::CONFLICT,
        HuddleError::Validation { .. } => StatusCode::BAD_REQUEST,
        HuddleError::ExternalUnavailable { .. }
        | HuddleError::Database(_)
        | HuddleError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        debug!(error = %err, "Request refused");
    }
    (
        status,
        Json(json!({ "status": "error", "message": err.user_message() })),
    )
        .into_response()
}

fn ok() -> Response {
    Json(json!({ "status": "OK" })).into_response()
}

fn parse_optional<T: FromStr<Err = HuddleError>>(raw: Option<String>) -> HuddleResult<Option<T>> {
    raw.filter(|v| !v.is_empty()).map(|v| v.parse()).transpose()
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    /// Session token.
    pub identity: String,
    #[serde(alias = "slackTeam")]
    pub conference: String,
    pub room: String,
    pub mode: Option<String>,
    pub persistence: Option<String>,
    pub visibility: Option<String>,
}

impl CreateRoomRequest {
    fn to_new_room(&self) -> HuddleResult<NewRoom> {
        Ok(NewRoom {
            name: self.room.clone(),
            mode: parse_optional(self.mode.clone())?,
            persistence: parse_optional(self.persistence.clone())?,
            visibility: parse_optional(self.visibility.clone())?,
        })
    }
}

pub async fn create_room<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<CreateRoomRequest>,
) -> Response {
    let request = match req.to_new_room() {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    match state
        .gateway
        .create_room(&req.identity, &req.conference, request)
        .await
    {
        Ok(_) => ok(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct AclRequest {
    pub identity: String,
    #[serde(alias = "slackTeam")]
    pub conference: String,
    #[serde(rename = "roomID")]
    pub room_id: Uuid,
    /// Accounts allowed to read the room.
    pub users: Vec<Uuid>,
}

pub async fn update_acl<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<AclRequest>,
) -> Response {
    match state
        .gateway
        .update_acl(&req.identity, &req.conference, req.room_id, req.users)
        .await
    {
        Ok(_) => ok(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub identity: String,
    #[serde(alias = "conf", alias = "slackTeam")]
    pub conference: String,
    pub room: Uuid,
}

pub async fn video_token<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<TokenRequest>,
) -> Response {
    match state
        .gateway
        .mint_video_token(&req.identity, &req.conference, req.room)
        .await
    {
        Ok(grant) => Json(json!({
            "status": "OK",
            "token": grant.token,
            "roomTitle": grant.room_title,
            "identity": grant.identity,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ModeratorRequest {
    pub identity: String,
    #[serde(alias = "slackTeam")]
    pub conference: String,
    #[serde(rename = "roomID")]
    pub room_id: Uuid,
    /// Profile ids of the participants being reported.
    #[serde(default)]
    pub participants: Vec<Uuid>,
    pub message: String,
}

pub async fn moderator_from_video<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<ModeratorRequest>,
) -> Response {
    match state
        .gateway
        .escalate_to_moderators(
            &req.identity,
            &req.conference,
            req.room_id,
            req.participants,
            &req.message,
        )
        .await
    {
        Ok(()) => ok(),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub token: String,
}

/// Exchange a handoff token from a chat link for a web session.
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    Json(req): Json<LoginRequest>,
) -> Response {
    match state.gateway.redeem(&req.token).await {
        Ok(redemption) => Json(json!({
            "status": "OK",
            "token": redemption.session_token,
            "team": redemption.workspace_id,
            "roomName": redemption.room_name,
        }))
        .into_response(),
        Err(e) => error_response(&e),
    }
}
