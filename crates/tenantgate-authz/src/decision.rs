//! The access decision point: the single entry business modules call.

use std::sync::Arc;

use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::Repositories;
use tenantgate_core::scope::{Scope, ScopeFields, ScopedRecord, apply_scope};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::assignment::AssignmentResolver;
use crate::config::AuthzConfig;
use crate::effective::{EffectivePermissionCalculator, EffectivePermissions, RequiredPermissions};
use crate::provisioning::{StoreHandle, StoreProvisioner, StoreRegistry};
use crate::scope::ScopeAggregator;
use crate::tenant::TenantResolver;

/// Per-request input. An explicitly requested tenant takes precedence over
/// the principal's sticky last-active tenant.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub principal: Option<Principal>,
    pub requested_tenant_id: Option<Uuid>,
}

impl RequestContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            requested_tenant_id: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_tenant(mut self, tenant_id: Uuid) -> Self {
        self.requested_tenant_id = Some(tenant_id);
        self
    }
}

/// Everything a business module needs after a successful authorization.
#[derive(Debug, Clone)]
pub struct AccessGrant {
    pub principal: Principal,
    pub tenant: Tenant,
    pub permissions: EffectivePermissions,
    pub scope: Scope,
    /// `None` while the tenant's store is not provisioned.
    pub store: Option<StoreHandle>,
}

impl AccessGrant {
    /// Narrow `records` to what this grant may see.
    pub fn filter<Rec, I>(&self, records: I, fields: &ScopeFields) -> Vec<Rec>
    where
        Rec: ScopedRecord,
        I: IntoIterator<Item = Rec>,
    {
        apply_scope(&self.scope, records, fields)
    }
}

pub struct AccessDecisionPoint<R: Repositories, P: StoreProvisioner> {
    tenants: TenantResolver<R, P>,
    assignments: AssignmentResolver<R>,
    permissions: EffectivePermissionCalculator<R>,
    scopes: ScopeAggregator<R>,
    registry: Arc<StoreRegistry<P>>,
    config: AuthzConfig,
}

impl<R: Repositories, P: StoreProvisioner> AccessDecisionPoint<R, P> {
    pub fn new(repos: Arc<R>, registry: Arc<StoreRegistry<P>>, config: AuthzConfig) -> Self {
        Self {
            tenants: TenantResolver::new(repos.clone(), registry.clone()),
            assignments: AssignmentResolver::new(repos.clone()),
            permissions: EffectivePermissionCalculator::new(repos.clone()),
            scopes: ScopeAggregator::new(repos),
            registry,
            config,
        }
    }

    pub async fn resolve_tenant(
        &self,
        principal: &Principal,
        requested_tenant_id: Option<Uuid>,
        require_context: bool,
    ) -> GateResult<Option<Tenant>> {
        self.tenants
            .resolve_tenant(principal, requested_tenant_id, require_context)
            .await
    }

    pub async fn set_active_tenant(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
    ) -> GateResult<Principal> {
        self.tenants.set_active_tenant(principal, tenant_id).await
    }

    pub async fn effective_permissions(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<EffectivePermissions> {
        self.permissions.effective_permissions(principal, tenant).await
    }

    pub async fn has_permission(
        &self,
        principal: &Principal,
        tenant: &Tenant,
        required: impl Into<RequiredPermissions>,
    ) -> GateResult<bool> {
        self.permissions
            .has_permission(principal, tenant, required)
            .await
    }

    /// Like [`has_permission`](Self::has_permission) but fails with
    /// [`GateError::PermissionDenied`].
    pub async fn require_permission(
        &self,
        principal: &Principal,
        tenant: &Tenant,
        required: impl Into<RequiredPermissions>,
    ) -> GateResult<EffectivePermissions> {
        let required = required.into();
        let effective = self.effective_permissions(principal, tenant).await?;
        if effective.grants_any(&required) {
            return Ok(effective);
        }
        warn!(
            principal_id = %principal.id,
            tenant_id = %tenant.id,
            required = ?required.codes(),
            "Permission denied"
        );
        Err(GateError::PermissionDenied {
            required: required.into_codes(),
        })
    }

    pub async fn is_delegate(&self, principal: &Principal, tenant: &Tenant) -> GateResult<bool> {
        self.assignments.is_delegate(principal, tenant).await
    }

    pub async fn aggregate_scope(&self, principal: &Principal, tenant: &Tenant) -> GateResult<Scope> {
        self.scopes.aggregate_scope(principal, tenant).await
    }

    pub fn apply_scope<Rec, I>(&self, scope: &Scope, records: I, fields: &ScopeFields) -> Vec<Rec>
    where
        Rec: ScopedRecord,
        I: IntoIterator<Item = Rec>,
    {
        apply_scope(scope, records, fields)
    }

    /// Full request flow: authenticate, resolve a mandatory tenant, check
    /// that any of `required` is granted and compute the visibility scope.
    ///
    /// A missing or deactivated principal fails with
    /// [`GateError::AuthenticationRequired`].
    pub async fn authorize(
        &self,
        ctx: &RequestContext,
        required: impl Into<RequiredPermissions>,
    ) -> GateResult<AccessGrant> {
        let principal = ctx
            .principal
            .as_ref()
            .ok_or(GateError::AuthenticationRequired)?;
        if !principal.active {
            warn!(principal_id = %principal.id, "Deactivated principal refused");
            return Err(GateError::AuthenticationRequired);
        }

        let tenant = self
            .resolve_tenant(principal, ctx.requested_tenant_id, true)
            .await?
            .ok_or(GateError::TenantContextRequired)?;

        let permissions = self.require_permission(principal, &tenant, required).await?;
        let scope = self.aggregate_scope(principal, &tenant).await?;

        let mut principal = principal.clone();
        if self.config.remember_requested_tenant
            && ctx.requested_tenant_id == Some(tenant.id)
            && principal.last_active_tenant_id != Some(tenant.id)
            && !principal.bypasses_scoping(tenant.id)
        {
            principal = self.set_active_tenant(&principal, tenant.id).await?;
        }

        debug!(
            principal_id = %principal.id,
            tenant_id = %tenant.id,
            source = ?permissions.source,
            "Access granted"
        );

        Ok(AccessGrant {
            store: self.registry.handle(tenant.id),
            principal,
            tenant,
            permissions,
            scope,
        })
    }
}
