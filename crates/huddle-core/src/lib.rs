//! Huddle Core: domain models, error taxonomy, repository traits and
//! the contracts of the external collaborators (video provider, chat
//! platform).
//!
//! Every other crate in the workspace builds on these types; the core
//! itself has no knowledge of storage engines or HTTP.

pub mod batch;
pub mod cache;
pub mod chat;
pub mod config;
pub mod error;
pub mod factory;
pub mod models;
pub mod repository;
pub mod video;

pub use error::{HuddleError, HuddleResult};
