//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

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
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "membership_lookup_indexes",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: teams, groups, grants, audit log
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Teams and direct membership
-- =======================================================================
DEFINE TABLE team SCHEMAFULL;
DEFINE FIELD name ON TABLE team TYPE string;
DEFINE FIELD created_at ON TABLE team TYPE datetime DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team TYPE datetime DEFAULT time::now();

DEFINE TABLE team_member SCHEMAFULL;
DEFINE FIELD team_id ON TABLE team_member TYPE string;
DEFINE FIELD user_id ON TABLE team_member TYPE string;
DEFINE FIELD role ON TABLE team_member TYPE string \
    ASSERT $value IN ['OWNER', 'EDITOR', 'VIEWER'];
DEFINE FIELD created_at ON TABLE team_member TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE team_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_team_member_unique ON TABLE team_member \
    COLUMNS team_id, user_id UNIQUE;

-- =======================================================================
-- User groups
-- =======================================================================
DEFINE TABLE user_group SCHEMAFULL;
DEFINE FIELD name ON TABLE user_group TYPE string;
DEFINE FIELD description ON TABLE user_group TYPE option<string>;
DEFINE FIELD role ON TABLE user_group TYPE string \
    ASSERT $value IN ['OWNER', 'EDITOR', 'VIEWER'];
DEFINE FIELD created_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user_group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_group_name ON TABLE user_group \
    COLUMNS name UNIQUE;

DEFINE TABLE group_member SCHEMAFULL;
DEFINE FIELD group_id ON TABLE group_member TYPE string;
DEFINE FIELD user_id ON TABLE group_member TYPE string;
DEFINE FIELD is_admin ON TABLE group_member TYPE bool DEFAULT false;
DEFINE FIELD added_by ON TABLE group_member TYPE string;
DEFINE FIELD added_at ON TABLE group_member TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_member_unique ON TABLE group_member \
    COLUMNS group_id, user_id UNIQUE;

DEFINE TABLE group_team_access SCHEMAFULL;
DEFINE FIELD group_id ON TABLE group_team_access TYPE string;
DEFINE FIELD team_id ON TABLE group_team_access TYPE string;
DEFINE FIELD role ON TABLE group_team_access TYPE string \
    ASSERT $value IN ['OWNER', 'EDITOR', 'VIEWER'];
DEFINE FIELD assigned_by ON TABLE group_team_access TYPE string;
DEFINE FIELD assigned_at ON TABLE group_team_access TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_team_access_unique ON TABLE group_team_access \
    COLUMNS group_id, team_id UNIQUE;

-- =======================================================================
-- Audit Log (append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD group_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD action ON TABLE audit_log TYPE string \
    ASSERT $value IN ['GROUP_CREATED', 'GROUP_UPDATED', 'GROUP_DELETED', \
        'MEMBER_ADDED', 'MEMBER_REMOVED', 'MEMBER_ADMIN_GRANTED', \
        'MEMBER_ADMIN_REVOKED', 'TEAM_ACCESS_GRANTED', \
        'TEAM_ACCESS_REVOKED', 'INVITATION_SENT', 'INVITATION_ACCEPTED', \
        'INVITATION_EXPIRED'];
DEFINE FIELD target_type ON TABLE audit_log TYPE string \
    ASSERT $value IN ['group', 'member', 'team_access', 'invitation'];
DEFINE FIELD target_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD details ON TABLE audit_log TYPE object FLEXIBLE DEFAULT {};
DEFINE FIELD performed_by ON TABLE audit_log TYPE string;
DEFINE FIELD ip_address ON TABLE audit_log TYPE option<string>;
DEFINE FIELD user_agent ON TABLE audit_log TYPE option<string>;
DEFINE FIELD performed_at ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_group_time ON TABLE audit_log \
    COLUMNS group_id, performed_at;
DEFINE INDEX idx_audit_actor ON TABLE audit_log \
    COLUMNS performed_by;
";

// -----------------------------------------------------------------------
// Schema v2: reverse lookups used by the resolver
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE INDEX idx_team_member_user ON TABLE team_member COLUMNS user_id;
DEFINE INDEX idx_group_member_user ON TABLE group_member COLUMNS user_id;
DEFINE INDEX idx_group_team_access_team ON TABLE group_team_access \
    COLUMNS team_id;
";

/// Run all pending migrations against the given SurrealDB instance.
///
/// Creates the `_migration` tracking table if it does not exist, then
/// applies every migration newer than the recorded version, in order.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in pending(current_version) {
        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

fn pending(current_version: u32) -> impl Iterator<Item = &'static Migration> {
    MIGRATIONS.iter().filter(move |m| m.version > current_version)
}
