//! Database-specific error types and conversions.

use huddle_core::error::HuddleError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Duplicate {entity}: {message}")]
    Duplicate { entity: String, message: String },

    #[error("Malformed {entity} row: {message}")]
    Decode { entity: String, message: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl DbError {
    /// Classify the failure of a single statement. Unique-index and
    /// record-id collisions become [`DbError::Duplicate`], as do
    /// transaction conflicts: two writers racing for the same index key
    /// surface as one of these depending on commit order.
    pub(crate) fn statement(entity: &str, err: surrealdb::Error) -> Self {
        let message = err.to_string();
        if message.contains("already contains")
            || message.contains("already exists")
            || message.contains("read or write conflict")
        {
            DbError::Duplicate {
                entity: entity.into(),
                message,
            }
        } else {
            DbError::Query(message)
        }
    }

    pub(crate) fn decode(entity: &str, message: impl ToString) -> Self {
        DbError::Decode {
            entity: entity.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DbError> for HuddleError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HuddleError::NotFound { entity, id },
            DbError::Duplicate { entity, message } => HuddleError::Conflict { entity, message },
            other => HuddleError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_surface_as_conflict() {
        let err: HuddleError = DbError::Duplicate {
            entity: "room".into(),
            message: "index already contains 'standup'".into(),
        }
        .into();
        assert!(err.is_conflict());
    }

    #[test]
    fn decode_failures_are_database_errors() {
        let err: HuddleError = DbError::decode("room", "bad mode").into();
        assert!(matches!(err, HuddleError::Database(_)));
    }
}
