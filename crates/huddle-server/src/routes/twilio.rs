//! Video provider status callbacks.

use axum::extract::{FromRequest, Query, Request, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use huddle_core::repository::Store;
use huddle_core::video::{CallEvent, CallEventKind};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusCallback {
    pub status_callback_event: String,
    pub room_sid: String,
    pub participant_identity: Option<String>,
}

impl From<StatusCallback> for CallEvent {
    fn from(cb: StatusCallback) -> Self {
        CallEvent {
            kind: CallEventKind::from(cb.status_callback_event.as_str()),
            call_id: cb.room_sid,
            identity: cb.participant_identity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    /// Workspace the callback URL was registered for.
    pub conference: Option<String>,
}

/// Callbacks arrive form-encoded; JSON is accepted as well.
async fn decode(request: Request) -> Option<StatusCallback> {
    let is_json = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"));
    if is_json {
        Json::<StatusCallback>::from_request(request, &())
            .await
            .ok()
            .map(|Json(cb)| cb)
    } else {
        Form::<StatusCallback>::from_request(request, &())
            .await
            .ok()
            .map(|Form(cb)| cb)
    }
}

/// Always acknowledged: the provider retries anything but a success.
pub async fn call_event<S: Store>(
    State(state): State<AppState<S>>,
    Query(query): Query<EventQuery>,
    request: Request,
) -> StatusCode {
    let Some(workspace) = query.conference.filter(|c| !c.is_empty()) else {
        warn!("Call event without a conference");
        return StatusCode::OK;
    };
    let Some(callback) = decode(request).await else {
        warn!(workspace = %workspace, "Unreadable call event");
        return StatusCode::OK;
    };

    debug!(
        workspace = %workspace,
        event = %callback.status_callback_event,
        call = %callback.room_sid,
        "Call event received"
    );
    if let Err(e) = state
        .gateway
        .process_call_event(&workspace, callback.into())
        .await
    {
        warn!(workspace = %workspace, error = %e, "Call event not applied");
    }
    StatusCode::OK
}
