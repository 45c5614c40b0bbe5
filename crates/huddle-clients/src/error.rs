//! HTTP client error types and conversions.

use huddle_core::error::HuddleError;
use thiserror::Error;

/// Twilio's "room exists" error code for a duplicate unique name.
pub const TWILIO_ROOM_EXISTS: i64 = 53113;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} API error {status} (code {code:?}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("{service} response could not be decoded: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("signing failed: {0}")]
    Signing(String),
}

impl ClientError {
    pub fn service(&self) -> &'static str {
        match self {
            ClientError::Network { service, .. }
            | ClientError::Api { service, .. }
            | ClientError::Decode { service, .. } => *service,
            ClientError::Signing(_) => "signing",
        }
    }

    pub(crate) fn network(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ClientError::Network { service, source }
    }

    pub(crate) fn decode(service: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |e| ClientError::Decode {
            service,
            message: e.to_string(),
        }
    }
}

impl From<ClientError> for HuddleError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api {
                service,
                code: Some(TWILIO_ROOM_EXISTS),
                message,
                ..
            } => HuddleError::Conflict {
                entity: format!("{service} call"),
                message,
            },
            ClientError::Api {
                service,
                status: 404,
                message,
                ..
            } => HuddleError::NotFound {
                entity: service.to_string(),
                id: message,
            },
            ClientError::Signing(message) => HuddleError::Internal(message),
            other => HuddleError::external(other.service(), other),
        }
    }
}
