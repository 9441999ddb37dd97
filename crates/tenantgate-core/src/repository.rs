//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Tenant-scoped repositories
//! require a `tenant_id` parameter to enforce data isolation.

use uuid::Uuid;

use crate::error::GateResult;
use crate::models::{
    assignment::{Assignment, CreateAssignment},
    audit::{AuditLogEntry, CreateAuditLogEntry},
    membership::{CreateMembership, Membership, MembershipStatus},
    permission::{CreatePermission, Permission},
    permission_override::{PermissionOverride, SetOverride},
    principal::{CreatePrincipal, Principal, UpdatePrincipal},
    role::{CreateRole, Role, UpdateRole},
    tenant::{CreateTenant, Tenant},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Identity & tenancy (global scope)
// ---------------------------------------------------------------------------

pub trait PrincipalRepository: Send + Sync {
    fn create(&self, input: CreatePrincipal) -> impl Future<Output = GateResult<Principal>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GateResult<Principal>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdatePrincipal,
    ) -> impl Future<Output = GateResult<Principal>> + Send;
    /// Record the tenant the principal last acted in.
    fn set_last_active_tenant(
        &self,
        id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = GateResult<Principal>> + Send;
}

pub trait TenantRepository: Send + Sync {
    fn create(&self, input: CreateTenant) -> impl Future<Output = GateResult<Tenant>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = GateResult<Tenant>> + Send;
    /// Set the isolated-store locator. Succeeds if unset or already equal;
    /// a different existing locator is rejected.
    fn set_store_locator(
        &self,
        id: Uuid,
        locator: &str,
    ) -> impl Future<Output = GateResult<Tenant>> + Send;
    fn set_active(&self, id: Uuid, active: bool) -> impl Future<Output = GateResult<Tenant>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = GateResult<PaginatedResult<Tenant>>> + Send;
}

pub trait MembershipRepository: Send + Sync {
    /// Fails with `AlreadyExists` if the (principal, tenant) pair is taken.
    fn create(
        &self,
        input: CreateMembership,
    ) -> impl Future<Output = GateResult<Membership>> + Send;
    fn find(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = GateResult<Option<Membership>>> + Send;
    /// The membership for (principal, tenant) if and only if it is Active.
    fn find_active(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
    ) -> impl Future<Output = GateResult<Option<Membership>>> + Send;
    /// Move to `status`, enforcing forward-only transitions.
    fn transition(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
        status: MembershipStatus,
    ) -> impl Future<Output = GateResult<Membership>> + Send;
    /// Link the tenant-local record id. Only allowed while unset.
    fn link_local_id(
        &self,
        principal_id: Uuid,
        tenant_id: Uuid,
        tenant_local_id: &str,
    ) -> impl Future<Output = GateResult<Membership>> + Send;
    fn list_for_principal(
        &self,
        principal_id: Uuid,
    ) -> impl Future<Output = GateResult<Vec<Membership>>> + Send;
}

// ---------------------------------------------------------------------------
// Permission catalog (global scope)
// ---------------------------------------------------------------------------

pub trait PermissionRepository: Send + Sync {
    /// Create the permission unless its code already exists.
    /// Returns `true` when this call created it.
    fn create_if_absent(
        &self,
        input: CreatePermission,
    ) -> impl Future<Output = GateResult<bool>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = GateResult<Permission>> + Send;
    fn get_by_ids(&self, ids: &[Uuid]) -> impl Future<Output = GateResult<Vec<Permission>>> + Send;
    fn set_active(
        &self,
        code: &str,
        active: bool,
    ) -> impl Future<Output = GateResult<Permission>> + Send;
    fn list_all(&self) -> impl Future<Output = GateResult<Vec<Permission>>> + Send;
    /// Codes of every active permission.
    fn active_codes(&self) -> impl Future<Output = GateResult<Vec<String>>> + Send;
}

// ---------------------------------------------------------------------------
// Tenant-scoped repositories
// ---------------------------------------------------------------------------

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: CreateRole) -> impl Future<Output = GateResult<Role>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = GateResult<Role>> + Send;
    fn update(
        &self,
        tenant_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = GateResult<Role>> + Send;
    /// Deletes the role together with its grants and assignments.
    fn delete(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = GateResult<()>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = GateResult<PaginatedResult<Role>>> + Send;
    /// The subset of `ids` that exist in the tenant and are active.
    fn active_role_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> impl Future<Output = GateResult<Vec<Uuid>>> + Send;

    /// Grant a permission to a role (creates a `grants` edge). Granting
    /// an already-granted permission is a no-op.
    fn grant_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = GateResult<()>> + Send;
    fn revoke_permission(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = GateResult<()>> + Send;
    /// All permissions granted to a role, active or not.
    fn get_role_permissions(
        &self,
        tenant_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = GateResult<Vec<Permission>>> + Send;
    /// Active permission codes granted to any of `role_ids`.
    fn active_codes_for_roles(
        &self,
        tenant_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = GateResult<Vec<String>>> + Send;
}

pub trait AssignmentRepository: Send + Sync {
    /// Insert an assignment. Re-inserting an identical grant returns the
    /// existing row. Scope pairing is validated before writing.
    fn assign(&self, input: CreateAssignment)
    -> impl Future<Output = GateResult<Assignment>> + Send;
    fn revoke(&self, tenant_id: Uuid, id: Uuid) -> impl Future<Output = GateResult<()>> + Send;
    fn get_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = GateResult<Assignment>> + Send;
    /// Union of assignments held by `principal_id` and those targeting
    /// `tenant_local_id`, deduplicated.
    fn find_by_principal_or_local_id(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        tenant_local_id: Option<&str>,
    ) -> impl Future<Output = GateResult<Vec<Assignment>>> + Send;
}

pub trait OverrideRepository: Send + Sync {
    /// Insert or replace the override for (tenant, principal, permission).
    fn set(&self, input: SetOverride) -> impl Future<Output = GateResult<PermissionOverride>> + Send;
    fn remove(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = GateResult<()>> + Send;
    fn list_for_principal(
        &self,
        tenant_id: Uuid,
        principal_id: Uuid,
    ) -> impl Future<Output = GateResult<Vec<PermissionOverride>>> + Send;
}

// ---------------------------------------------------------------------------
// Audit (append-only, tenant-scoped)
// ---------------------------------------------------------------------------

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    pub to: Option<chrono::DateTime<chrono::Utc>>,
}

pub trait AuditLogRepository: Send + Sync {
    /// Append a new audit log entry. No update or delete operations exist.
    fn append(
        &self,
        input: CreateAuditLogEntry,
    ) -> impl Future<Output = GateResult<AuditLogEntry>> + Send;
    fn list(
        &self,
        tenant_id: Uuid,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> impl Future<Output = GateResult<PaginatedResult<AuditLogEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// Every repository the authorization engine reads or writes, bundled so
/// services take one type parameter instead of eight.
pub trait Repositories: Send + Sync {
    type Principals: PrincipalRepository;
    type Tenants: TenantRepository;
    type Memberships: MembershipRepository;
    type Permissions: PermissionRepository;
    type Roles: RoleRepository;
    type Assignments: AssignmentRepository;
    type Overrides: OverrideRepository;
    type Audit: AuditLogRepository;

    fn principals(&self) -> &Self::Principals;
    fn tenants(&self) -> &Self::Tenants;
    fn memberships(&self) -> &Self::Memberships;
    fn permissions(&self) -> &Self::Permissions;
    fn roles(&self) -> &Self::Roles;
    fn assignments(&self) -> &Self::Assignments;
    fn overrides(&self) -> &Self::Overrides;
    fn audit(&self) -> &Self::Audit;
}
