//! Lookup of the role assignments a principal holds inside a tenant.

use std::sync::Arc;

use tenantgate_core::error::GateResult;
use tenantgate_core::models::assignment::Assignment;
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::{
    AssignmentRepository, MembershipRepository, Repositories, RoleRepository,
};
use tracing::debug;
use uuid::Uuid;

/// Assignments held by one principal in one tenant, together with the
/// tenant-local record id taken from their active membership.
#[derive(Debug, Clone, Default)]
pub struct DelegateAssignments {
    pub tenant_local_id: Option<String>,
    pub assignments: Vec<Assignment>,
}

pub struct AssignmentResolver<R: Repositories> {
    repos: Arc<R>,
}

impl<R: Repositories> AssignmentResolver<R> {
    pub fn new(repos: Arc<R>) -> Self {
        Self { repos }
    }

    /// Assignments keyed on the principal id, unioned with those keyed on
    /// the tenant-local record linked by the active membership.
    pub async fn resolve(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<DelegateAssignments> {
        let tenant_local_id = self
            .repos
            .memberships()
            .find_active(principal.id, tenant.id)
            .await?
            .and_then(|m| m.tenant_local_id);

        let assignments = self
            .repos
            .assignments()
            .find_by_principal_or_local_id(tenant.id, principal.id, tenant_local_id.as_deref())
            .await?;

        debug!(
            principal_id = %principal.id,
            tenant_id = %tenant.id,
            count = assignments.len(),
            "Resolved assignments"
        );

        Ok(DelegateAssignments {
            tenant_local_id,
            assignments,
        })
    }

    /// Like [`resolve`](Self::resolve), keeping only assignments whose
    /// role exists in the tenant and is active.
    pub async fn resolve_active(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<DelegateAssignments> {
        let mut resolved = self.resolve(principal, tenant).await?;
        if resolved.assignments.is_empty() {
            return Ok(resolved);
        }

        let mut role_ids: Vec<Uuid> = resolved.assignments.iter().map(|a| a.role_id).collect();
        role_ids.sort_unstable();
        role_ids.dedup();
        let active_roles = self
            .repos
            .roles()
            .active_role_ids(tenant.id, &role_ids)
            .await?;

        resolved
            .assignments
            .retain(|a| active_roles.contains(&a.role_id));
        Ok(resolved)
    }

    /// Distinct active roles held through [`resolve_active`](Self::resolve_active).
    pub async fn active_role_ids(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<Vec<Uuid>> {
        let mut role_ids: Vec<Uuid> = self
            .resolve_active(principal, tenant)
            .await?
            .assignments
            .iter()
            .map(|a| a.role_id)
            .collect();
        role_ids.sort_unstable();
        role_ids.dedup();
        Ok(role_ids)
    }

    pub async fn assignments_for(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<Vec<Assignment>> {
        Ok(self.resolve(principal, tenant).await?.assignments)
    }

    /// A delegate is a delegate-capable non-owner holding at least one
    /// assignment in the tenant.
    pub async fn is_delegate(&self, principal: &Principal, tenant: &Tenant) -> GateResult<bool> {
        if principal.owns(tenant.id) || !principal.is_delegate_capable {
            return Ok(false);
        }
        Ok(!self.assignments_for(principal, tenant).await?.is_empty())
    }
}
