//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables are SCHEMAFULL. UUIDs are stored as strings, enums as
//! strings with ASSERT constraints, access control lists as flexible
//! objects.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Conferences (one per chat workspace)
-- =======================================================================
DEFINE TABLE conference SCHEMAFULL;
DEFINE FIELD name ON TABLE conference TYPE string;
DEFINE FIELD workspace_id ON TABLE conference TYPE option<string>;
DEFINE FIELD pending_workspace_name ON TABLE conference \
    TYPE option<string>;
DEFINE FIELD created_at ON TABLE conference TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE conference TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_conference_workspace ON TABLE conference \
    COLUMNS workspace_id UNIQUE;

DEFINE TABLE conference_config SCHEMAFULL;
DEFINE FIELD conference_id ON TABLE conference_config TYPE string;
DEFINE FIELD key ON TABLE conference_config TYPE string;
DEFINE FIELD value ON TABLE conference_config TYPE string;
DEFINE FIELD updated_at ON TABLE conference_config TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_config_conference_key ON TABLE conference_config \
    COLUMNS conference_id, key UNIQUE;

DEFINE TABLE conference_access SCHEMAFULL;
DEFINE FIELD conference_id ON TABLE conference_access TYPE string;
DEFINE FIELD acl ON TABLE conference_access TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE conference_access TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_access_conference ON TABLE conference_access \
    COLUMNS conference_id UNIQUE;

-- =======================================================================
-- Accounts (global) and profiles (conference scope)
-- =======================================================================
DEFINE TABLE account SCHEMAFULL;
DEFINE FIELD username ON TABLE account TYPE string;
DEFINE FIELD email ON TABLE account TYPE string;
DEFINE FIELD display_name ON TABLE account TYPE string;
DEFINE FIELD password_hash ON TABLE account TYPE string;
DEFINE FIELD login_key ON TABLE account TYPE option<string>;
DEFINE FIELD login_expires_at ON TABLE account TYPE option<datetime>;
DEFINE FIELD acl ON TABLE account TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE account TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_account_email ON TABLE account COLUMNS email UNIQUE;
DEFINE INDEX idx_account_username ON TABLE account \
    COLUMNS username UNIQUE;

DEFINE TABLE profile SCHEMAFULL;
DEFINE FIELD account_id ON TABLE profile TYPE string;
DEFINE FIELD conference_id ON TABLE profile TYPE string;
DEFINE FIELD chat_user_id ON TABLE profile TYPE string;
DEFINE FIELD display_name ON TABLE profile TYPE option<string>;
DEFINE FIELD acl ON TABLE profile TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD created_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE profile TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_profile_conference_chat_user ON TABLE profile \
    COLUMNS conference_id, chat_user_id UNIQUE;
DEFINE INDEX idx_profile_conference_account ON TABLE profile \
    COLUMNS conference_id, account_id UNIQUE;
DEFINE INDEX idx_profile_account ON TABLE profile COLUMNS account_id;

-- =======================================================================
-- Roles and privileges
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD conference_id ON TABLE role TYPE option<string>;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD granted_to ON TABLE role TYPE array DEFAULT [];
DEFINE FIELD granted_to.* ON TABLE role TYPE string;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_name ON TABLE role COLUMNS name UNIQUE;

-- Account -> Role membership
DEFINE TABLE has_role TYPE RELATION FROM account TO role SCHEMAFULL;
DEFINE INDEX idx_has_role_pair ON TABLE has_role COLUMNS in, out UNIQUE;

DEFINE TABLE privileged_action SCHEMAFULL;
DEFINE FIELD action ON TABLE privileged_action TYPE string;
DEFINE FIELD created_at ON TABLE privileged_action TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_privileged_action_name ON TABLE privileged_action \
    COLUMNS action UNIQUE;

DEFINE TABLE permission_grant SCHEMAFULL;
DEFINE FIELD conference_id ON TABLE permission_grant TYPE string;
DEFINE FIELD action_id ON TABLE permission_grant TYPE string;
DEFINE FIELD grantee_kind ON TABLE permission_grant TYPE string \
    ASSERT $value IN ['role', 'account'];
DEFINE FIELD grantee_id ON TABLE permission_grant TYPE string;
DEFINE FIELD created_at ON TABLE permission_grant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grant_unique ON TABLE permission_grant \
    COLUMNS conference_id, action_id, grantee_kind, grantee_id UNIQUE;

-- =======================================================================
-- Rooms
-- =======================================================================
DEFINE TABLE room SCHEMAFULL;
DEFINE FIELD conference_id ON TABLE room TYPE string;
DEFINE FIELD title ON TABLE room TYPE string;
DEFINE FIELD call_id ON TABLE room TYPE option<string>;
DEFINE FIELD persistence ON TABLE room TYPE string \
    ASSERT $value IN ['ephemeral', 'persistent'];
DEFINE FIELD visibility ON TABLE room TYPE string \
    ASSERT $value IN ['public', 'unlisted'];
DEFINE FIELD mode ON TABLE room TYPE string \
    ASSERT $value IN ['group', 'group-small', 'peer-to-peer', 'go'];
DEFINE FIELD capacity ON TABLE room TYPE option<int>;
DEFINE FIELD members ON TABLE room TYPE array DEFAULT [];
DEFINE FIELD members.* ON TABLE room TYPE string;
DEFINE FIELD acl ON TABLE room TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD last_observed_at ON TABLE room TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE room TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE room TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_room_conference_title ON TABLE room \
    COLUMNS conference_id, title UNIQUE;
DEFINE INDEX idx_room_call ON TABLE room COLUMNS conference_id, call_id;

-- =======================================================================
-- Sessions and live-activity markers
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD account_id ON TABLE session TYPE string;
DEFINE FIELD token ON TABLE session TYPE string;
DEFINE FIELD created_with ON TABLE session TYPE string;
DEFINE FIELD expires_at ON TABLE session TYPE datetime;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_token ON TABLE session COLUMNS token UNIQUE;

DEFINE TABLE live_activity SCHEMAFULL;
DEFINE FIELD account_id ON TABLE live_activity TYPE string;
DEFINE FIELD conference_id ON TABLE live_activity TYPE string;
DEFINE FIELD topic ON TABLE live_activity TYPE string;
DEFINE FIELD updated_at ON TABLE live_activity TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_activity_unique ON TABLE live_activity \
    COLUMNS account_id, conference_id, topic UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates the `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "v{} '{}': {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "failed to record v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Raw DDL of schema version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
