//! Error types for the huddle system.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum HuddleError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("Conflict on {entity}: {message}")]
    Conflict { entity: String, message: String },

    #[error("External service {service} unavailable: {message}")]
    ExternalUnavailable { service: String, message: String },

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type HuddleResult<T> = Result<T, HuddleError>;

impl HuddleError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn external(service: impl Into<String>, message: impl ToString) -> Self {
        Self::ExternalUnavailable {
            service: service.into(),
            message: message.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Message safe to show to the caller of a request.
    ///
    /// Request-level failures keep their detail; storage, collaborator
    /// and internal failures collapse to a generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { entity, .. } => format!("No such {entity}"),
            Self::Unauthorized { reason } => reason.clone(),
            Self::Conflict { message, .. } => message.clone(),
            Self::InvalidToken(_) => "Invalid or expired token".into(),
            Self::Validation { message } => message.clone(),
            Self::ExternalUnavailable { .. } | Self::Database(_) | Self::Internal(_) => {
                "Internal server error".into()
            }
        }
    }
}
