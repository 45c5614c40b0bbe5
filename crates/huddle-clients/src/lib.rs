//! Huddle Clients: `reqwest` implementations of the collaborator
//! contracts declared in `huddle-core`.
//!
//! - [`twilio::TwilioVideo`]: Twilio Video REST API, per conference.
//! - [`twilio::TwilioProvisioner`]: sub-account provisioning through the
//!   master account.
//! - [`slack::SlackClient`]: Slack Web API with a conference's bot token.
//! - [`slack::SlackInstaller`]: OAuth v2 code exchange.
//! - [`factory::HttpClientFactory`]: builds the per-conference clients.

pub mod access_token;
pub mod error;
pub mod factory;
pub mod slack;
pub mod twilio;

pub use error::ClientError;
pub use factory::HttpClientFactory;
