//! Chat platform callbacks: slash commands, workspace events,
//! interactive actions and the install redirect.
//!
//! The platform expects an answer within a few seconds, so commands and
//! events are acknowledged straight away and run on a spawned task.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use huddle_conference::commands::SlashCommand;
use huddle_core::repository::Store;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::routes::web::error_response;
use crate::state::AppState;

pub async fn command<S: Store>(
    State(state): State<AppState<S>>,
    Form(cmd): Form<SlashCommand>,
) -> StatusCode {
    debug!(command = %cmd.command, workspace = %cmd.team_id, "Slash command received");
    let gateway = state.gateway.clone();
    tokio::spawn(async move {
        let (command, workspace) = (cmd.command.clone(), cmd.team_id.clone());
        if let Err(e) = gateway.handle_slash_command(cmd).await {
            warn!(command = %command, workspace = %workspace, error = %e, "Slash command failed");
        }
    });
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventEnvelope {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        team_id: String,
        event: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub struct EventUser {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkspaceEvent {
    TeamJoin { user: EventUser },
    AppHomeOpened { user: String },
    #[serde(other)]
    Other,
}

/// Always 200; unreadable bodies are logged and dropped.
pub async fn event<S: Store>(State(state): State<AppState<S>>, body: Bytes) -> Response {
    let envelope: EventEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Unreadable event envelope");
            return StatusCode::OK.into_response();
        }
    };
    let (team_id, raw) = match envelope {
        EventEnvelope::UrlVerification { challenge } => {
            return Json(json!({ "challenge": challenge })).into_response();
        }
        EventEnvelope::EventCallback { team_id, event } => (team_id, event),
        EventEnvelope::Other => return StatusCode::OK.into_response(),
    };

    let event: WorkspaceEvent = match serde_json::from_value(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(workspace = %team_id, error = %e, "Unreadable workspace event");
            return StatusCode::OK.into_response();
        }
    };

    let gateway = state.gateway.clone();
    tokio::spawn(async move {
        let outcome = match event {
            WorkspaceEvent::TeamJoin { user } => {
                gateway.team_join(&team_id, &user.id).await.map(|_| ())
            }
            WorkspaceEvent::AppHomeOpened { user } => gateway.publish_home(&team_id, &user).await,
            WorkspaceEvent::Other => Ok(()),
        };
        if let Err(e) = outcome {
            warn!(workspace = %team_id, error = %e, "Workspace event failed");
        }
    });
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
pub struct InteractionForm {
    pub payload: String,
}

/// Join buttons are plain links; the action only needs acknowledging.
pub async fn interaction(Form(form): Form<InteractionForm>) -> StatusCode {
    match serde_json::from_str::<Value>(&form.payload) {
        Ok(payload) => debug!(
            kind = payload["type"].as_str().unwrap_or_default(),
            "Interaction acknowledged"
        ),
        Err(e) => warn!(error = %e, "Unreadable interaction payload"),
    }
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct InstallQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// OAuth redirect target of the chat app install.
pub async fn install<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<InstallQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        warn!(error = ?query.error, "Install redirect without a code");
        return (StatusCode::BAD_REQUEST, "Installation was not authorized").into_response();
    };

    match state.install.complete_install(&code).await {
        Ok(outcome) => {
            info!(
                conference = %outcome.tenant.id,
                created = outcome.created,
                "Install completed"
            );
            Redirect::to(&outcome.redirect).into_response()
        }
        Err(e) => {
            let mut response = error_response(&e);
            if response.status().is_server_error() {
                *response.status_mut() = StatusCode::FORBIDDEN;
            }
            response
        }
    }
}
