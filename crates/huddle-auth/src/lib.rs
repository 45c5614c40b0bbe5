//! Huddle Auth: cross-surface handoff tokens and session
//! authentication.
//!
//! A user authenticated on the chat platform receives a link carrying
//! a signed handoff token. Redeeming it on the web frontend yields a
//! session without a login form.

pub mod config;
pub mod error;
pub mod service;
pub mod token;

pub use config::HandoffConfig;
pub use error::AuthError;
pub use service::{HandoffService, Redemption};
pub use token::HandoffClaims;
