//! SurrealDB implementation of [`ConfigRepository`].
//!
//! Each key is its own row so concurrent writers of different keys
//! never overwrite each other.

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::tenant::ConfigEntry;
use huddle_core::repository::ConfigRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ConfigRowWithId {
    record_id: String,
    conference_id: String,
    key: String,
    value: String,
    updated_at: DateTime<Utc>,
}

impl ConfigRowWithId {
    fn try_into_entry(self) -> Result<ConfigEntry, DbError> {
        Ok(ConfigEntry {
            id: parse_uuid("conference_config", &self.record_id)?,
            tenant_id: parse_uuid("conference_config", &self.conference_id)?,
            key: self.key,
            value: self.value,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealConfigRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealConfigRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn update_existing(
        &self,
        tenant_id: Uuid,
        key: &str,
        value: &str,
    ) -> Result<Option<ConfigEntry>, DbError> {
        let mut result = self
            .db
            .query(
                "UPDATE conference_config SET value = $value, \
                 updated_at = time::now() \
                 WHERE conference_id = $conference_id AND key = $key; \
                 SELECT meta::id(id) AS record_id, * FROM conference_config \
                 WHERE conference_id = $conference_id AND key = $key;",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("key", key.to_string()))
            .bind(("value", value.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("conference_config", e))?;

        let rows: Vec<ConfigRowWithId> = result.take(1)?;
        rows.into_iter()
            .next()
            .map(|r| r.try_into_entry())
            .transpose()
    }

    async fn insert(&self, tenant_id: Uuid, key: &str, value: &str) -> Result<ConfigEntry, DbError> {
        let id = Uuid::new_v4();
        let mut result = self
            .db
            .query(
                "CREATE type::record('conference_config', $id) SET \
                 conference_id = $conference_id, key = $key, value = $value; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('conference_config', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("key", key.to_string()))
            .bind(("value", value.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("conference_config", e))?;

        let rows: Vec<ConfigRowWithId> = result.take(1)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("conference_config", id))?
            .try_into_entry()
    }
}

impl<C: Connection> ConfigRepository for SurrealConfigRepository<C> {
    async fn list(&self, tenant_id: Uuid) -> HuddleResult<Vec<ConfigEntry>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conference_config \
                 WHERE conference_id = $conference_id ORDER BY key ASC",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConfigRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|r| r.try_into_entry())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn upsert(&self, tenant_id: Uuid, key: &str, value: &str) -> HuddleResult<ConfigEntry> {
        if let Some(entry) = self.update_existing(tenant_id, key, value).await? {
            return Ok(entry);
        }
        match self.insert(tenant_id, key, value).await {
            Ok(entry) => Ok(entry),
            // Another writer created the key in between; overwrite it.
            Err(DbError::Duplicate { .. }) => self
                .update_existing(tenant_id, key, value)
                .await?
                .ok_or_else(|| DbError::not_found("conference_config", key).into()),
            Err(e) => Err(e.into()),
        }
    }
}
