//! Huddle Server: HTTP surface of the conference runtime.
//!
//! [`routes::router`] mounts the web client API, the chat platform
//! callbacks (behind [`signature::require_chat_signature`]) and the
//! video provider's status webhook over a shared [`AppState`].

pub mod config;
pub mod routes;
pub mod signature;
pub mod state;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
