//! Authentication error types.

use huddle_core::error::HuddleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("token was minted for an older login key")]
    StaleLoginKey,

    #[error("session not found")]
    SessionUnknown,

    #[error("session has expired")]
    SessionExpired,

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for HuddleError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired | AuthError::TokenInvalid(_) | AuthError::StaleLoginKey => {
                HuddleError::InvalidToken(err.to_string())
            }
            AuthError::SessionUnknown | AuthError::SessionExpired => HuddleError::Unauthorized {
                reason: err.to_string(),
            },
            AuthError::Crypto(msg) => HuddleError::Internal(msg),
        }
    }
}
