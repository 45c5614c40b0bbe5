//! SurrealDB implementation of [`ActivityRepository`].
//!
//! Live-activity markers carry no payload; frontends subscribe to them
//! and refetch whatever the topic names when `updated_at` moves.

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::activity::LiveActivity;
use huddle_core::repository::ActivityRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::parse_uuid;
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActivityRowWithId {
    record_id: String,
    account_id: String,
    conference_id: String,
    topic: String,
    updated_at: DateTime<Utc>,
}

impl ActivityRowWithId {
    fn try_into_activity(self) -> Result<LiveActivity, DbError> {
        Ok(LiveActivity {
            id: parse_uuid("live_activity", &self.record_id)?,
            account_id: parse_uuid("live_activity", &self.account_id)?,
            tenant_id: parse_uuid("live_activity", &self.conference_id)?,
            topic: self.topic,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SurrealActivityRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealActivityRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn bump(
        &self,
        account_id: &str,
        conference_id: &str,
        topic: &str,
    ) -> Result<Option<LiveActivity>, DbError> {
        let mut result = self
            .db
            .query(
                "UPDATE live_activity SET updated_at = time::now() \
                 WHERE account_id = $account_id \
                 AND conference_id = $conference_id AND topic = $topic; \
                 SELECT meta::id(id) AS record_id, * FROM live_activity \
                 WHERE account_id = $account_id \
                 AND conference_id = $conference_id AND topic = $topic;",
            )
            .bind(("account_id", account_id.to_string()))
            .bind(("conference_id", conference_id.to_string()))
            .bind(("topic", topic.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("live_activity", e))?;

        let rows: Vec<ActivityRowWithId> = result.take(1)?;
        rows.into_iter()
            .next()
            .map(|r| r.try_into_activity())
            .transpose()
    }
}

impl<C: Connection> ActivityRepository for SurrealActivityRepository<C> {
    async fn touch(
        &self,
        account_id: Uuid,
        tenant_id: Uuid,
        topic: &str,
    ) -> HuddleResult<LiveActivity> {
        let account = account_id.to_string();
        let conference = tenant_id.to_string();

        if let Some(activity) = self.bump(&account, &conference, topic).await? {
            return Ok(activity);
        }

        let id = Uuid::new_v4();
        let created = self
            .db
            .query(
                "CREATE type::record('live_activity', $id) SET \
                 account_id = $account_id, conference_id = $conference_id, \
                 topic = $topic; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('live_activity', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("account_id", account.clone()))
            .bind(("conference_id", conference.clone()))
            .bind(("topic", topic.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("live_activity", e));

        match created {
            Ok(mut result) => {
                let rows: Vec<ActivityRowWithId> = result.take(1).map_err(DbError::from)?;
                let row = rows
                    .into_iter()
                    .next()
                    .ok_or_else(|| DbError::not_found("live_activity", id))?;
                Ok(row.try_into_activity()?)
            }
            // Created concurrently; bumping it is all that is left.
            Err(DbError::Duplicate { .. }) => Ok(self
                .bump(&account, &conference, topic)
                .await?
                .ok_or_else(|| DbError::not_found("live_activity", id))?),
            Err(e) => Err(e.into()),
        }
    }
}
