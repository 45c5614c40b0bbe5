//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::session::{CreateSession, Session};
use huddle_core::repository::SessionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SessionRowWithId {
    record_id: String,
    account_id: String,
    token: String,
    created_with: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl SessionRowWithId {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid("session", &self.record_id)?,
            account_id: parse_uuid("session", &self.account_id)?,
            token: self.token,
            created_with: self.created_with,
            expires_at: self.expires_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> HuddleResult<Session> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('session', $id) SET \
                 account_id = $account_id, token = $session_token, \
                 created_with = $created_with, expires_at = $expires_at; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('session', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("account_id", input.account_id.to_string()))
            .bind(("session_token", input.token))
            .bind(("created_with", input.created_with))
            .bind(("expires_at", input.expires_at))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("session", e))?;

        let rows: Vec<SessionRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("session", id))?;
        Ok(row.try_into_session()?)
    }

    async fn find_by_token(&self, token: &str) -> HuddleResult<Option<Session>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM session \
                 WHERE token = $session_token LIMIT 1",
            )
            .bind(("session_token", token.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_session())
            .transpose()?)
    }

    async fn delete(&self, id: Uuid) -> HuddleResult<()> {
        self.db
            .query("DELETE type::record('session', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
