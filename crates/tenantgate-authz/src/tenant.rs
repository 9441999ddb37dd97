//! Per-request tenant resolution.

use std::sync::Arc;

use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::{
    MembershipRepository, PrincipalRepository, Repositories, TenantRepository,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::provisioning::{StoreProvisioner, StoreRegistry};

/// Decides which tenant a request acts in and whether the principal may
/// act there.
pub struct TenantResolver<R: Repositories, P: StoreProvisioner> {
    repos: Arc<R>,
    registry: Arc<StoreRegistry<P>>,
}

impl<R: Repositories, P: StoreProvisioner> TenantResolver<R, P> {
    pub fn new(repos: Arc<R>, registry: Arc<StoreRegistry<P>>) -> Self {
        Self { repos, registry }
    }

    /// Resolve the acting tenant.
    ///
    /// Precedence:
    /// 1. the tenant the principal owns, whatever was requested;
    /// 2. for platform operators, the explicitly requested tenant;
    /// 3. the requested tenant, else the sticky last-active tenant, which
    ///    requires an active membership.
    ///
    /// With no candidate tenant the result is `Ok(None)`, or
    /// [`GateError::TenantContextRequired`] when `require_context` is set.
    /// A deactivated tenant is refused on every path with
    /// [`GateError::TenantAccessDenied`]. A resolved tenant has its store
    /// attached before returning.
    pub async fn resolve_tenant(
        &self,
        principal: &Principal,
        requested_tenant_id: Option<Uuid>,
        require_context: bool,
    ) -> GateResult<Option<Tenant>> {
        let tenant = if let Some(owned) = principal.owns_tenant {
            debug!(principal_id = %principal.id, tenant_id = %owned, "Resolved owned tenant");
            self.repos.tenants().get_by_id(owned).await?
        } else if let Some(requested) =
            requested_tenant_id.filter(|_| principal.is_platform_operator())
        {
            debug!(
                principal_id = %principal.id,
                tenant_id = %requested,
                "Platform operator acting in requested tenant"
            );
            self.repos.tenants().get_by_id(requested).await?
        } else {
            let Some(tenant_id) = requested_tenant_id.or(principal.last_active_tenant_id) else {
                if require_context {
                    return Err(GateError::TenantContextRequired);
                }
                return Ok(None);
            };
            self.member_tenant(principal, tenant_id).await?
        };

        if !tenant.active {
            warn!(principal_id = %principal.id, tenant_id = %tenant.id, "Tenant is deactivated");
            return Err(GateError::TenantAccessDenied {
                tenant_id: tenant.id,
            });
        }

        self.registry.ensure_attached(&tenant).await?;
        Ok(Some(tenant))
    }

    /// Make `tenant_id` the principal's sticky default.
    pub async fn set_active_tenant(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
    ) -> GateResult<Principal> {
        let active = self
            .repos
            .memberships()
            .find_active(principal.id, tenant_id)
            .await?;
        if active.is_none() {
            return Err(GateError::InvalidTenantSwitch { tenant_id });
        }
        debug!(principal_id = %principal.id, tenant_id = %tenant_id, "Switching active tenant");
        self.repos
            .principals()
            .set_last_active_tenant(principal.id, tenant_id)
            .await
    }

    async fn member_tenant(&self, principal: &Principal, tenant_id: Uuid) -> GateResult<Tenant> {
        let membership = self
            .repos
            .memberships()
            .find_active(principal.id, tenant_id)
            .await?
            .ok_or(GateError::TenantAccessDenied { tenant_id })?;

        match self.repos.tenants().get_by_id(membership.tenant_id).await {
            Ok(tenant) => {
                debug!(principal_id = %principal.id, tenant_id = %tenant.id, "Resolved member tenant");
                Ok(tenant)
            }
            Err(GateError::NotFound { .. }) => Err(GateError::TenantAccessDenied { tenant_id }),
            Err(e) => Err(e),
        }
    }
}
