//! SurrealDB implementation of [`PrivilegeRepository`].

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::privilege::{
    CreatePermissionGrant, Grantee, PermissionGrant, PrivilegedAction,
};
use huddle_core::repository::PrivilegeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, parse_uuid, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ActionRowWithId {
    record_id: String,
    action: String,
    created_at: DateTime<Utc>,
}

impl ActionRowWithId {
    fn try_into_action(self) -> Result<PrivilegedAction, DbError> {
        Ok(PrivilegedAction {
            id: parse_uuid("privileged_action", &self.record_id)?,
            action: self.action,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct GrantRowWithId {
    record_id: String,
    conference_id: String,
    action_id: String,
    grantee_kind: String,
    grantee_id: String,
    created_at: DateTime<Utc>,
}

impl GrantRowWithId {
    fn try_into_grant(self) -> Result<PermissionGrant, DbError> {
        let grantee_id = parse_uuid("permission_grant", &self.grantee_id)?;
        let grantee = match self.grantee_kind.as_str() {
            "role" => Grantee::Role(grantee_id),
            "account" => Grantee::Account(grantee_id),
            other => {
                return Err(DbError::decode(
                    "permission_grant",
                    format!("unknown grantee kind: {other}"),
                ));
            }
        };
        Ok(PermissionGrant {
            id: parse_uuid("permission_grant", &self.record_id)?,
            tenant_id: parse_uuid("permission_grant", &self.conference_id)?,
            action_id: parse_uuid("permission_grant", &self.action_id)?,
            grantee,
            created_at: self.created_at,
        })
    }
}

fn grantee_parts(grantee: &Grantee) -> (&'static str, String) {
    match grantee {
        Grantee::Role(id) => ("role", id.to_string()),
        Grantee::Account(id) => ("account", id.to_string()),
    }
}

#[derive(Clone)]
pub struct SurrealPrivilegeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPrivilegeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PrivilegeRepository for SurrealPrivilegeRepository<C> {
    async fn find_action(&self, action: &str) -> HuddleResult<Option<PrivilegedAction>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM privileged_action \
                 WHERE action = $action LIMIT 1",
            )
            .bind(("action", action.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ActionRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_action())
            .transpose()?)
    }

    async fn create_action(&self, action: &str) -> HuddleResult<PrivilegedAction> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('privileged_action', $id) SET action = $action; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('privileged_action', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("action", action.to_string()))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("privileged_action", e))?;

        let rows: Vec<ActionRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("privileged_action", id))?;
        Ok(row.try_into_action()?)
    }

    async fn create_grant(&self, input: CreatePermissionGrant) -> HuddleResult<PermissionGrant> {
        let id = Uuid::new_v4();
        let (kind, grantee_id) = grantee_parts(&input.grantee);

        let mut result = self
            .db
            .query(
                "CREATE type::record('permission_grant', $id) SET \
                 conference_id = $conference_id, action_id = $action_id, \
                 grantee_kind = $grantee_kind, grantee_id = $grantee_id; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('permission_grant', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", input.tenant_id.to_string()))
            .bind(("action_id", input.action_id.to_string()))
            .bind(("grantee_kind", kind.to_string()))
            .bind(("grantee_id", grantee_id))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("permission_grant", e))?;

        let rows: Vec<GrantRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission_grant", id))?;
        Ok(row.try_into_grant()?)
    }

    async fn grant_exists(
        &self,
        tenant_id: Uuid,
        action_id: Uuid,
        account_id: Uuid,
        role_ids: &[Uuid],
    ) -> HuddleResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM permission_grant \
                 WHERE conference_id = $conference_id \
                 AND action_id = $action_id \
                 AND ((grantee_kind = 'account' AND grantee_id = $account_id) \
                   OR (grantee_kind = 'role' AND grantee_id IN $role_ids)) \
                 GROUP ALL",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("action_id", action_id.to_string()))
            .bind(("account_id", account_id.to_string()))
            .bind(("role_ids", uuid_strings(role_ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
