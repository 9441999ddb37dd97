//! Aggregation of assignment scopes into a single visibility [`Scope`].

use std::sync::Arc;

use tenantgate_core::error::GateResult;
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::Repositories;
use tenantgate_core::scope::Scope;
use tracing::debug;

use crate::assignment::AssignmentResolver;

pub struct ScopeAggregator<R: Repositories> {
    assignments: AssignmentResolver<R>,
}

impl<R: Repositories> ScopeAggregator<R> {
    pub fn new(repos: Arc<R>) -> Self {
        Self {
            assignments: AssignmentResolver::new(repos),
        }
    }

    /// Owners and platform operators see the whole company. Everyone else
    /// sees the union of the scopes of assignments whose role is active,
    /// where one company-wide assignment dominates.
    pub async fn aggregate_scope(&self, principal: &Principal, tenant: &Tenant) -> GateResult<Scope> {
        if principal.bypasses_scoping(tenant.id) {
            return Ok(Scope::Company);
        }

        let resolved = self.assignments.resolve_active(principal, tenant).await?;
        let self_id = resolved.tenant_local_id.as_deref();
        let scope = Scope::from_grants(
            resolved
                .assignments
                .iter()
                .filter_map(|a| a.scope_grant(self_id)),
        );

        debug!(
            principal_id = %principal.id,
            tenant_id = %tenant.id,
            company = scope.is_company(),
            empty = scope.is_empty(),
            "Aggregated scope"
        );
        Ok(scope)
    }
}
