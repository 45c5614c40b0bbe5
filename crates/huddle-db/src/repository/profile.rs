//! SurrealDB implementation of [`ProfileRepository`].

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::profile::{CreateProfile, Profile, UpdateProfile};
use huddle_core::repository::{PaginatedResult, Pagination, ProfileRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, acl_from_value, acl_to_value, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ProfileRowWithId {
    record_id: String,
    account_id: String,
    conference_id: String,
    chat_user_id: String,
    display_name: Option<String>,
    acl: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRowWithId {
    fn try_into_profile(self) -> Result<Profile, DbError> {
        Ok(Profile {
            id: parse_uuid("profile", &self.record_id)?,
            account_id: parse_uuid("profile", &self.account_id)?,
            tenant_id: parse_uuid("profile", &self.conference_id)?,
            chat_user_id: self.chat_user_id,
            display_name: self.display_name,
            acl: acl_from_value(self.acl)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn first_profile(rows: Vec<ProfileRowWithId>) -> Result<Option<Profile>, DbError> {
    rows.into_iter()
        .next()
        .map(|r| r.try_into_profile())
        .transpose()
}

#[derive(Clone)]
pub struct SurrealProfileRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealProfileRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ProfileRepository for SurrealProfileRepository<C> {
    async fn create(&self, input: CreateProfile) -> HuddleResult<Profile> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('profile', $id) SET \
                 account_id = $account_id, conference_id = $conference_id, \
                 chat_user_id = $chat_user_id, display_name = $display_name, \
                 acl = $acl; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('profile', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("account_id", input.account_id.to_string()))
            .bind(("conference_id", input.tenant_id.to_string()))
            .bind(("chat_user_id", input.chat_user_id))
            .bind(("display_name", input.display_name))
            .bind(("acl", acl_to_value(&input.acl)?))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("profile", e))?;

        let rows: Vec<ProfileRowWithId> = result.take(1).map_err(DbError::from)?;
        Ok(first_profile(rows)?.ok_or_else(|| DbError::not_found("profile", id))?)
    }

    async fn get_by_id(&self, id: Uuid) -> HuddleResult<Profile> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('profile', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_profile(rows)?.ok_or_else(|| DbError::not_found("profile", id))?)
    }

    async fn find_by_chat_user(
        &self,
        tenant_id: Uuid,
        chat_user_id: &str,
    ) -> HuddleResult<Option<Profile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE conference_id = $conference_id \
                 AND chat_user_id = $chat_user_id LIMIT 1",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("chat_user_id", chat_user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_profile(rows)?)
    }

    async fn find_by_account(
        &self,
        tenant_id: Uuid,
        account_id: Uuid,
    ) -> HuddleResult<Option<Profile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE conference_id = $conference_id \
                 AND account_id = $account_id LIMIT 1",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(first_profile(rows)?)
    }

    async fn update(&self, id: Uuid, input: UpdateProfile) -> HuddleResult<Profile> {
        let mut sets = Vec::new();
        if input.display_name.is_some() {
            sets.push("display_name = $display_name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('profile', $id) SET {}; \
             SELECT meta::id(id) AS record_id, * FROM type::record('profile', $id);",
            sets.join(", ")
        );
        let mut builder = self.db.query(&query).bind(("id", id.to_string()));
        if let Some(display_name) = input.display_name {
            builder = builder.bind(("display_name", display_name));
        }

        let mut result = builder
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("profile", e))?;

        let rows: Vec<ProfileRowWithId> = result.take(1).map_err(DbError::from)?;
        Ok(first_profile(rows)?.ok_or_else(|| DbError::not_found("profile", id))?)
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> HuddleResult<PaginatedResult<Profile>> {
        let tenant_id_str = tenant_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM profile \
                 WHERE conference_id = $conference_id GROUP ALL",
            )
            .bind(("conference_id", tenant_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE conference_id = $conference_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("conference_id", tenant_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_profile())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_account(&self, account_id: Uuid) -> HuddleResult<Vec<Profile>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM profile \
                 WHERE account_id = $account_id ORDER BY created_at ASC",
            )
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ProfileRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_profile())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
