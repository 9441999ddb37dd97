//! Effective permission computation.
//!
//! `effective = (role grants ∪ allow overrides) − deny overrides`, except
//! for platform operators and the tenant's owner, who hold every active
//! catalog permission and are never subject to overrides.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tenantgate_core::error::GateResult;
use tenantgate_core::models::permission_override::OverrideEffect;
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::{
    OverrideRepository, PermissionRepository, Repositories, RoleRepository,
};
use tracing::debug;
use uuid::Uuid;

use crate::assignment::AssignmentResolver;

/// Why a principal holds the permissions it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrantSource {
    PlatformOperator,
    Owner,
    Delegated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    pub source: GrantSource,
    pub codes: BTreeSet<String>,
}

impl EffectivePermissions {
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// OR semantics: any one required code is enough. Nothing is granted
    /// for an empty requirement.
    pub fn grants_any(&self, required: &RequiredPermissions) -> bool {
        required.codes().iter().any(|code| self.codes.contains(code))
    }
}

/// One or more permission codes, any of which satisfies a check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequiredPermissions(Vec<String>);

impl RequiredPermissions {
    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_codes(self) -> Vec<String> {
        self.0
    }
}

impl From<&str> for RequiredPermissions {
    fn from(code: &str) -> Self {
        Self(vec![code.to_owned()])
    }
}

impl From<String> for RequiredPermissions {
    fn from(code: String) -> Self {
        Self(vec![code])
    }
}

impl From<Vec<String>> for RequiredPermissions {
    fn from(codes: Vec<String>) -> Self {
        Self(codes)
    }
}

impl From<&[&str]> for RequiredPermissions {
    fn from(codes: &[&str]) -> Self {
        Self(codes.iter().map(|c| (*c).to_owned()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for RequiredPermissions {
    fn from(codes: [&str; N]) -> Self {
        Self(codes.iter().map(|c| (*c).to_owned()).collect())
    }
}

pub struct EffectivePermissionCalculator<R: Repositories> {
    repos: Arc<R>,
    assignments: AssignmentResolver<R>,
}

impl<R: Repositories> EffectivePermissionCalculator<R> {
    pub fn new(repos: Arc<R>) -> Self {
        Self {
            assignments: AssignmentResolver::new(repos.clone()),
            repos,
        }
    }

    pub async fn effective_permissions(
        &self,
        principal: &Principal,
        tenant: &Tenant,
    ) -> GateResult<EffectivePermissions> {
        if principal.bypasses_scoping(tenant.id) {
            let source = if principal.is_platform_operator() {
                GrantSource::PlatformOperator
            } else {
                GrantSource::Owner
            };
            let codes = self.repos.permissions().active_codes().await?;
            return Ok(EffectivePermissions {
                source,
                codes: codes.into_iter().collect(),
            });
        }

        let active_roles = self.assignments.active_role_ids(principal, tenant).await?;
        let mut codes: BTreeSet<String> = self
            .repos
            .roles()
            .active_codes_for_roles(tenant.id, &active_roles)
            .await?
            .into_iter()
            .collect();

        let overrides = self
            .repos
            .overrides()
            .list_for_principal(tenant.id, principal.id)
            .await?;
        if !overrides.is_empty() {
            let ids: Vec<Uuid> = overrides.iter().map(|o| o.permission_id).collect();
            let catalog: HashMap<Uuid, _> = self
                .repos
                .permissions()
                .get_by_ids(&ids)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();

            let mut deny = BTreeSet::new();
            for o in &overrides {
                let Some(permission) = catalog.get(&o.permission_id) else {
                    continue;
                };
                match o.effect {
                    OverrideEffect::Allow if permission.active => {
                        codes.insert(permission.code.clone());
                    }
                    OverrideEffect::Allow => {}
                    OverrideEffect::Deny => {
                        deny.insert(permission.code.clone());
                    }
                }
            }
            // Deny always wins.
            codes.retain(|code| !deny.contains(code));
        }

        debug!(
            principal_id = %principal.id,
            tenant_id = %tenant.id,
            roles = active_roles.len(),
            overrides = overrides.len(),
            granted = codes.len(),
            "Computed effective permissions"
        );

        Ok(EffectivePermissions {
            source: GrantSource::Delegated,
            codes,
        })
    }

    pub async fn has_permission(
        &self,
        principal: &Principal,
        tenant: &Tenant,
        required: impl Into<RequiredPermissions>,
    ) -> GateResult<bool> {
        let required = required.into();
        if required.is_empty() {
            return Ok(false);
        }
        Ok(self
            .effective_permissions(principal, tenant)
            .await?
            .grants_any(&required))
    }
}
