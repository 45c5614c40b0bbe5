//! Huddle Conference: the per-tenant runtime.
//!
//! - [`registry::ConferenceRegistry`] materialises a [`Conference`] per
//!   workspace on first touch and caches it for the process lifetime.
//! - [`reconcile::RoomReconciler`] converges persisted rooms with the
//!   video provider's live calls.
//! - [`identity::IdentityBridge`] maps chat users onto accounts and
//!   tenant profiles.
//! - [`roles::RoleCache`] resolves tenant roles and privileged actions.
//! - [`gateway::Gateway`] is the entry point of every request flow.
//! - [`install::InstallService`] completes the chat install handshake.

pub mod bounded;
pub mod commands;
pub mod conference;
pub mod gateway;
pub mod identity;
pub mod install;
pub mod messages;
pub mod reconcile;
pub mod registry;
pub mod roles;

pub use conference::Conference;
pub use gateway::Gateway;
pub use registry::ConferenceRegistry;
