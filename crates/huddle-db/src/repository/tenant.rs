//! SurrealDB implementation of [`TenantRepository`].

use chrono::{DateTime, Utc};
use huddle_core::error::HuddleResult;
use huddle_core::models::acl::Acl;
use huddle_core::models::tenant::{CreateTenant, Tenant, TenantAccess, UpdateTenant};
use huddle_core::repository::{PaginatedResult, Pagination, TenantRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{CountRow, acl_from_value, acl_to_value, parse_uuid};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct ConferenceRow {
    name: String,
    workspace_id: Option<String>,
    pending_workspace_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct ConferenceRowWithId {
    record_id: String,
    name: String,
    workspace_id: Option<String>,
    pending_workspace_name: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConferenceRow {
    fn into_tenant(self, id: Uuid) -> Tenant {
        Tenant {
            id,
            name: self.name,
            workspace_id: self.workspace_id,
            pending_workspace_name: self.pending_workspace_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl ConferenceRowWithId {
    fn try_into_tenant(self) -> Result<Tenant, DbError> {
        Ok(Tenant {
            id: parse_uuid("conference", &self.record_id)?,
            name: self.name,
            workspace_id: self.workspace_id,
            pending_workspace_name: self.pending_workspace_name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct AccessRowWithId {
    record_id: String,
    conference_id: String,
    acl: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl AccessRowWithId {
    fn try_into_access(self) -> Result<TenantAccess, DbError> {
        Ok(TenantAccess {
            id: parse_uuid("conference_access", &self.record_id)?,
            tenant_id: parse_uuid("conference_access", &self.conference_id)?,
            acl: acl_from_value(self.acl)?,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the conference (tenant) repository.
#[derive(Clone)]
pub struct SurrealTenantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTenantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TenantRepository for SurrealTenantRepository<C> {
    async fn create(&self, input: CreateTenant) -> HuddleResult<Tenant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('conference', $id) SET \
                 name = $name, workspace_id = $workspace_id, \
                 pending_workspace_name = $pending_workspace_name",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("workspace_id", input.workspace_id))
            .bind(("pending_workspace_name", input.pending_workspace_name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::statement("conference", e))?;

        let rows: Vec<ConferenceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("conference", &id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn get_by_id(&self, id: Uuid) -> HuddleResult<Tenant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('conference', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConferenceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("conference", &id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn find_by_workspace(&self, workspace_id: &str) -> HuddleResult<Option<Tenant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conference \
                 WHERE workspace_id = $workspace_id \
                 ORDER BY created_at ASC LIMIT 1",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConferenceRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_tenant())
            .transpose()?)
    }

    async fn find_for_install(
        &self,
        workspace_id: &str,
        pending_name: &str,
    ) -> HuddleResult<Option<Tenant>> {
        // A pre-registered name wins over an existing binding.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conference \
                 WHERE pending_workspace_name = $pending_name \
                 ORDER BY created_at ASC LIMIT 1; \
                 SELECT meta::id(id) AS record_id, * FROM conference \
                 WHERE workspace_id = $workspace_id \
                 ORDER BY created_at ASC LIMIT 1;",
            )
            .bind(("pending_name", pending_name.to_string()))
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let pending: Vec<ConferenceRowWithId> = result.take(0).map_err(DbError::from)?;
        let bound: Vec<ConferenceRowWithId> = result.take(1).map_err(DbError::from)?;

        Ok(pending
            .into_iter()
            .chain(bound)
            .next()
            .map(|r| r.try_into_tenant())
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdateTenant) -> HuddleResult<Tenant> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.workspace_id.is_some() {
            sets.push("workspace_id = $workspace_id");
        }
        if input.pending_workspace_name.is_some() {
            sets.push("pending_workspace_name = $pending_workspace_name");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('conference', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        // Some(None) clears the field.
        if let Some(workspace_id) = input.workspace_id {
            builder = builder.bind(("workspace_id", workspace_id));
        }
        if let Some(pending) = input.pending_workspace_name {
            builder = builder.bind(("pending_workspace_name", pending));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::statement("conference", e))?;

        let rows: Vec<ConferenceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("conference", &id_str))?;

        Ok(row.into_tenant(id))
    }

    async fn list(&self, pagination: Pagination) -> HuddleResult<PaginatedResult<Tenant>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM conference GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conference \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConferenceRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_tenant())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn find_access(&self, tenant_id: Uuid) -> HuddleResult<Option<TenantAccess>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM conference_access \
                 WHERE conference_id = $conference_id LIMIT 1",
            )
            .bind(("conference_id", tenant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccessRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|r| r.try_into_access())
            .transpose()?)
    }

    async fn create_access(&self, tenant_id: Uuid, acl: Acl) -> HuddleResult<TenantAccess> {
        let id = Uuid::new_v4();

        let mut result = self
            .db
            .query(
                "CREATE type::record('conference_access', $id) SET \
                 conference_id = $conference_id, acl = $acl; \
                 SELECT meta::id(id) AS record_id, * FROM \
                 type::record('conference_access', $id);",
            )
            .bind(("id", id.to_string()))
            .bind(("conference_id", tenant_id.to_string()))
            .bind(("acl", acl_to_value(&acl)?))
            .await
            .and_then(|r| r.check())
            .map_err(|e| DbError::statement("conference_access", e))?;

        let rows: Vec<AccessRowWithId> = result.take(1).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("conference_access", id))?;

        Ok(row.try_into_access()?)
    }
}
