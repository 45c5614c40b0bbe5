//! HTTP routes.

pub mod slack;
pub mod twilio;
pub mod web;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use huddle_core::repository::Store;

use crate::signature::require_chat_signature;
use crate::state::AppState;

async fn health() -> &'static str {
    "ok"
}

pub fn router<S: Store>(state: AppState<S>) -> Router {
    let signed = Router::<AppState<S>>::new()
        .route("/slack/commands", post(slack::command::<S>))
        .route("/slack/events", post(slack::event::<S>))
        .route("/slack/interaction", post(slack::interaction))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_chat_signature::<S>,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/slack/auth", get(slack::install::<S>))
        .route("/slack/login", post(web::login::<S>))
        .route("/video/new", post(web::create_room::<S>))
        .route("/video/acl", post(web::update_acl::<S>))
        .route("/video/token", post(web::video_token::<S>))
        .route("/moderator/fromVideo", post(web::moderator_from_video::<S>))
        .route("/twilio/event", post(twilio::call_event::<S>))
        .merge(signed)
        .with_state(state)
}
