//! SurrealDB implementation of [`RoleRepository`].
//!
//! Membership is a `has_role` edge from account to role. A role's
//! `granted_to` list names the roles whose members inherit it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::role::{CreateRole, Role};
use huddle_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, parse_uuids, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    conference_id: Option<String>,
    name: String,
    granted_to: Vec<String>,
    created_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        Ok(Role {
            id: parse_uuid("role", &self.record_id)?,
            tenant_id: self
                .conference_id
                .as_deref()
                .map(|c| parse_uuid("role", c))
                .transpose()?,
            name: self.name,
            granted_to: parse_uuids("role", &self.granted_to)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> HuddleResult<Role> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('role', $id) SET \
                 conference_id = $conference_id, name = $name, \
                 granted_to = $granted_to; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('role', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", input.tenant_id.map(|t| t.to_string())))
            .bind(("name", input.name))
            .bind(("granted_to", uuid_strings(&input.granted_to)))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("role", e))?;

        let rows: Vec<RoleRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id))?;
        Ok(row.try_into_role()?)
    }

    async fn find_by_name(&self, name: &str) -> HuddleResult<Option<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE name = $name LIMIT 1",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_role())
            .transpose()?)
    }

    async fn add_member(&self, role_id: Uuid, account_id: Uuid) -> HuddleResult<()> {
        if self.has_member(role_id, account_id).await? {
            return Ok(());
        }

        let query = format!(
            "RELATE account:`{account_id}` -> has_role -> role:`{role_id}`;"
        );
        let outcome = self
            .db
            .query(query)
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("has_role", e));

        match outcome {
            Ok(_) | Err(DbError::Duplicate { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn has_member(&self, role_id: Uuid, account_id: Uuid) -> HuddleResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM has_role WHERE \
                 in = type::record('account', $account_id) AND \
                 out = type::record('role', $role_id) GROUP ALL",
            )
            .bind(("account_id", account_id.to_string()))
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn list_members(&self, role_id: Uuid) -> HuddleResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE meta::id(in) FROM has_role \
                 WHERE out = type::record('role', $role_id)",
            )
            .bind(("role_id", role_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        Ok(parse_uuids("has_role", &ids)?)
    }

    async fn roles_for_account(&self, account_id: Uuid) -> HuddleResult<Vec<Role>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM role \
                 WHERE id IN (\
                     SELECT VALUE out FROM has_role \
                     WHERE in = type::record('account', $account_id)\
                 )",
            )
            .bind(("account_id", account_id.to_string()))
            .await
            .map_err(DbError::from)?;
        let direct: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;

        let direct_ids: Vec<String> = direct.iter().map(|r| r.record_id.clone()).collect();
        let inherited: Vec<RoleRowWithId> = if direct_ids.is_empty() {
            Vec::new()
        } else {
            let mut result = self
                .db
                .query(
                    "SELECT meta::id(id) AS record_id, * FROM role \
                     WHERE granted_to CONTAINSANY $direct_ids",
                )
                .bind(("direct_ids", direct_ids))
                .await
                .map_err(DbError::from)?;
            result.take(0).map_err(DbError::from)?
        };

        // Merge and deduplicate by record_id.
        let mut seen = HashSet::new();
        let mut roles = Vec::new();
        for row in direct.into_iter().chain(inherited) {
            if seen.insert(row.record_id.clone()) {
                roles.push(row.try_into_role()?);
            }
        }

        Ok(roles)
    }
}
