//! Domain models for huddle.
//!
//! These are the typed entities shared across all crates. Storage rows
//! are converted into these at the repository boundary.

pub mod account;
pub mod acl;
pub mod activity;
pub mod privilege;
pub mod profile;
pub mod role;
pub mod room;
pub mod session;
pub mod tenant;
