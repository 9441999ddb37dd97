//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings; enums are stored as strings guarded by ASSERT constraints.
//! Uniqueness invariants live in UNIQUE indexes or in deterministic
//! record ids so that concurrent writers cannot create duplicates.

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

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "identity_and_catalog",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "roles_assignments_overrides",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// v1: principals, tenants, memberships, permission catalog
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Principals (global scope)
-- =======================================================================
DEFINE TABLE principal SCHEMAFULL;
DEFINE FIELD email ON TABLE principal TYPE string;
DEFINE FIELD platform_admin ON TABLE principal TYPE bool DEFAULT false;
DEFINE FIELD superuser ON TABLE principal TYPE bool DEFAULT false;
DEFINE FIELD owns_tenant ON TABLE principal TYPE option<string>;
DEFINE FIELD is_delegate_capable ON TABLE principal TYPE bool \
    DEFAULT false;
DEFINE FIELD last_active_tenant_id ON TABLE principal \
    TYPE option<string>;
DEFINE FIELD active ON TABLE principal TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE principal TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_principal_email ON TABLE principal \
    COLUMNS email UNIQUE;

-- =======================================================================
-- Tenants (global scope)
-- =======================================================================
DEFINE TABLE tenant SCHEMAFULL;
DEFINE FIELD name ON TABLE tenant TYPE string;
DEFINE FIELD store_locator ON TABLE tenant TYPE option<string>;
DEFINE FIELD active ON TABLE tenant TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE tenant TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Memberships (principal <-> tenant, never hard-deleted)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL
    PERMISSIONS
        FOR create, select, update FULL
        FOR delete NONE;
DEFINE FIELD principal_id ON TABLE membership TYPE string;
DEFINE FIELD tenant_id ON TABLE membership TYPE string;
DEFINE FIELD status ON TABLE membership TYPE string \
    ASSERT $value IN ['Invited', 'Active', 'Terminated'];
DEFINE FIELD tenant_local_id ON TABLE membership TYPE option<string>;
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_principal_tenant ON TABLE membership \
    COLUMNS principal_id, tenant_id UNIQUE;
DEFINE INDEX idx_membership_tenant ON TABLE membership \
    COLUMNS tenant_id;

-- =======================================================================
-- Permission catalog (global scope, record id derived from code)
-- =======================================================================
DEFINE TABLE permission SCHEMAFULL;
DEFINE FIELD code ON TABLE permission TYPE string;
DEFINE FIELD module ON TABLE permission TYPE string;
DEFINE FIELD resource ON TABLE permission TYPE string;
DEFINE FIELD action ON TABLE permission TYPE string;
DEFINE FIELD scope ON TABLE permission TYPE string;
DEFINE FIELD description ON TABLE permission TYPE string;
DEFINE FIELD active ON TABLE permission TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_permission_code ON TABLE permission \
    COLUMNS code UNIQUE;
";

// -----------------------------------------------------------------------
// v2: tenant-scoped roles, grants, assignments, overrides, audit
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
-- =======================================================================
-- Roles (tenant scope)
-- =======================================================================
DEFINE TABLE role SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role TYPE string;
DEFINE FIELD name ON TABLE role TYPE string;
DEFINE FIELD description ON TABLE role TYPE string;
DEFINE FIELD active ON TABLE role TYPE bool DEFAULT true;
DEFINE FIELD is_system_template ON TABLE role TYPE bool DEFAULT false;
DEFINE FIELD allow_high_risk_combination ON TABLE role TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE role TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_role_tenant_name ON TABLE role \
    COLUMNS tenant_id, name UNIQUE;

-- =======================================================================
-- Role -> Permission grants (graph edge)
-- =======================================================================
DEFINE TABLE grants TYPE RELATION SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE grants TYPE string;
DEFINE FIELD role_id ON TABLE grants TYPE string;
DEFINE FIELD permission_id ON TABLE grants TYPE string;
DEFINE FIELD created_at ON TABLE grants TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_grants_role_permission ON TABLE grants \
    COLUMNS role_id, permission_id UNIQUE;
DEFINE INDEX idx_grants_tenant_role ON TABLE grants \
    COLUMNS tenant_id, role_id;

-- =======================================================================
-- Role assignments (tenant scope, record id derived from the
-- tenant/identity/role/scope tuple; never updated in place)
-- =======================================================================
DEFINE TABLE role_assignment SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE role_assignment TYPE string;
DEFINE FIELD role_id ON TABLE role_assignment TYPE string;
DEFINE FIELD principal_id ON TABLE role_assignment TYPE option<string>;
DEFINE FIELD tenant_local_id ON TABLE role_assignment \
    TYPE option<string>;
DEFINE FIELD scope_type ON TABLE role_assignment TYPE string \
    ASSERT $value IN ['Company', 'Branch', 'Department', 'SelfOnly'];
DEFINE FIELD scope_target_id ON TABLE role_assignment \
    TYPE option<string>;
DEFINE FIELD assigned_by ON TABLE role_assignment TYPE string;
DEFINE FIELD assigned_at ON TABLE role_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_assignment_tenant_principal ON TABLE role_assignment \
    COLUMNS tenant_id, principal_id;
DEFINE INDEX idx_assignment_tenant_local ON TABLE role_assignment \
    COLUMNS tenant_id, tenant_local_id;

-- =======================================================================
-- Permission overrides (tenant scope, one per principal+permission)
-- =======================================================================
DEFINE TABLE permission_override SCHEMAFULL;
DEFINE FIELD tenant_id ON TABLE permission_override TYPE string;
DEFINE FIELD principal_id ON TABLE permission_override TYPE string;
DEFINE FIELD permission_id ON TABLE permission_override TYPE string;
DEFINE FIELD effect ON TABLE permission_override TYPE string \
    ASSERT $value IN ['Allow', 'Deny'];
DEFINE FIELD reason ON TABLE permission_override TYPE string;
DEFINE FIELD created_by ON TABLE permission_override TYPE string;
DEFINE FIELD created_at ON TABLE permission_override TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE permission_override TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_override_unique ON TABLE permission_override \
    COLUMNS tenant_id, principal_id, permission_id UNIQUE;

-- =======================================================================
-- Audit Log (tenant scope, append-only)
-- =======================================================================
DEFINE TABLE audit_log SCHEMAFULL
    PERMISSIONS
        FOR create FULL
        FOR select FULL
        FOR update NONE
        FOR delete NONE;
DEFINE FIELD tenant_id ON TABLE audit_log TYPE string;
DEFINE FIELD actor_id ON TABLE audit_log TYPE string;
DEFINE FIELD action ON TABLE audit_log TYPE string;
DEFINE FIELD target_id ON TABLE audit_log TYPE option<string>;
DEFINE FIELD outcome ON TABLE audit_log TYPE string \
    ASSERT $value IN ['Success', 'Failure', 'Denied'];
DEFINE FIELD metadata ON TABLE audit_log TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD timestamp ON TABLE audit_log TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_audit_tenant_time ON TABLE audit_log \
    COLUMNS tenant_id, timestamp;
DEFINE INDEX idx_audit_tenant_actor ON TABLE audit_log \
    COLUMNS tenant_id, actor_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
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
                "Migration v{} '{}' failed: {}",
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
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;
    }

    Ok(())
}

/// The schema version a fully migrated database reports.
pub fn schema_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
