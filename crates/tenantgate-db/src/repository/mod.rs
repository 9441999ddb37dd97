//! SurrealDB repository implementations.

mod assignment;
mod audit;
mod membership;
mod permission;
mod permission_override;
mod principal;
mod role;
mod tenant;

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tenantgate_core::repository::Repositories;
use uuid::Uuid;

use crate::error::DbError;

pub use assignment::SurrealAssignmentRepository;
pub use audit::SurrealAuditLogRepository;
pub use membership::SurrealMembershipRepository;
pub use permission::SurrealPermissionRepository;
pub use permission_override::SurrealOverrideRepository;
pub use principal::SurrealPrincipalRepository;
pub use role::SurrealRoleRepository;
pub use tenant::SurrealTenantRepository;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}

pub(crate) fn parse_uuid(entity: &'static str, raw: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(raw).map_err(|e| DbError::Decode {
        entity,
        message: format!("invalid UUID {raw:?}: {e}"),
    })
}

pub(crate) fn parse_opt_uuid(entity: &'static str, raw: Option<&str>) -> Result<Option<Uuid>, DbError> {
    raw.map(|r| parse_uuid(entity, r)).transpose()
}

pub(crate) fn uuid_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

/// All SurrealDB repositories sharing one client handle.
#[derive(Clone)]
pub struct SurrealRepositories<C: Connection> {
    principals: SurrealPrincipalRepository<C>,
    tenants: SurrealTenantRepository<C>,
    memberships: SurrealMembershipRepository<C>,
    permissions: SurrealPermissionRepository<C>,
    roles: SurrealRoleRepository<C>,
    assignments: SurrealAssignmentRepository<C>,
    overrides: SurrealOverrideRepository<C>,
    audit: SurrealAuditLogRepository<C>,
}

impl<C: Connection> SurrealRepositories<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            principals: SurrealPrincipalRepository::new(db.clone()),
            tenants: SurrealTenantRepository::new(db.clone()),
            memberships: SurrealMembershipRepository::new(db.clone()),
            permissions: SurrealPermissionRepository::new(db.clone()),
            roles: SurrealRoleRepository::new(db.clone()),
            assignments: SurrealAssignmentRepository::new(db.clone()),
            overrides: SurrealOverrideRepository::new(db.clone()),
            audit: SurrealAuditLogRepository::new(db),
        }
    }
}

impl<C: Connection> Repositories for SurrealRepositories<C> {
    type Principals = SurrealPrincipalRepository<C>;
    type Tenants = SurrealTenantRepository<C>;
    type Memberships = SurrealMembershipRepository<C>;
    type Permissions = SurrealPermissionRepository<C>;
    type Roles = SurrealRoleRepository<C>;
    type Assignments = SurrealAssignmentRepository<C>;
    type Overrides = SurrealOverrideRepository<C>;
    type Audit = SurrealAuditLogRepository<C>;

    fn principals(&self) -> &Self::Principals {
        &self.principals
    }

    fn tenants(&self) -> &Self::Tenants {
        &self.tenants
    }

    fn memberships(&self) -> &Self::Memberships {
        &self.memberships
    }

    fn permissions(&self) -> &Self::Permissions {
        &self.permissions
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn assignments(&self) -> &Self::Assignments {
        &self.assignments
    }

    fn overrides(&self) -> &Self::Overrides {
        &self.overrides
    }

    fn audit(&self) -> &Self::Audit {
        &self.audit
    }
}
