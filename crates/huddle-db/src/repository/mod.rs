//! SurrealDB repository implementations.

mod account;
mod activity;
mod config;
mod privilege;
mod profile;
mod role;
mod room;
mod session;
mod tenant;

pub use account::SurrealAccountRepository;
pub use activity::SurrealActivityRepository;
pub use config::SurrealConfigRepository;
pub use privilege::SurrealPrivilegeRepository;
pub use profile::SurrealProfileRepository;
pub use role::SurrealRoleRepository;
pub use room::SurrealRoomRepository;
pub use session::SurrealSessionRepository;
pub use tenant::SurrealTenantRepository;

use huddle_core::models::acl::Acl;
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(entity: &str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::decode(entity, format!("invalid UUID '{raw}': {e}")))
}

pub(crate) fn parse_uuids(entity: &str, raw: &[String]) -> Result<Vec<Uuid>, DbError> {
    raw.iter().map(|s| parse_uuid(entity, s)).collect()
}

pub(crate) fn uuid_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

pub(crate) fn acl_to_value(acl: &Acl) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(acl).map_err(|e| DbError::decode("acl", e))
}

pub(crate) fn acl_from_value(value: serde_json::Value) -> Result<Acl, DbError> {
    serde_json::from_value(value).map_err(|e| DbError::decode("acl", e))
}
