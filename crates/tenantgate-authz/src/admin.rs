//! Audited administrative writes inside one tenant.
//!
//! Only the tenant's owner and platform operators may change roles,
//! grants, assignments and overrides. Every applied change, and every
//! refused high-risk grant, appends an audit log entry.

use std::sync::Arc;

use serde_json::json;
use tenantgate_core::catalog::high_risk_conflict;
use tenantgate_core::error::{GateError, GateResult};
use tenantgate_core::models::assignment::{Assignment, CreateAssignment, ScopeType};
use tenantgate_core::models::audit::{AuditLogEntry, AuditOutcome, CreateAuditLogEntry};
use tenantgate_core::models::permission::Permission;
use tenantgate_core::models::permission_override::{
    OverrideEffect, PermissionOverride, SetOverride,
};
use tenantgate_core::models::principal::Principal;
use tenantgate_core::models::role::{CreateRole, Role, UpdateRole};
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::{
    AssignmentRepository, AuditLogFilter, AuditLogRepository, OverrideRepository,
    PaginatedResult, Pagination, PermissionRepository, Repositories, RoleRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Input for [`TenantAdministration::create_role`].
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub allow_high_risk_combination: bool,
}

/// Input for [`TenantAdministration::assign_role`].
#[derive(Debug, Clone)]
pub struct RoleGrant {
    pub role_id: Uuid,
    pub principal_id: Option<Uuid>,
    pub tenant_local_id: Option<String>,
    pub scope_type: ScopeType,
    pub scope_target_id: Option<String>,
}

pub struct TenantAdministration<R: Repositories> {
    repos: Arc<R>,
}

impl<R: Repositories> TenantAdministration<R> {
    pub fn new(repos: Arc<R>) -> Self {
        Self { repos }
    }

    pub async fn create_role(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        input: NewRole,
    ) -> GateResult<Role> {
        self.authorize_admin(actor, tenant, "access.roles_manage")?;

        let role = self
            .repos
            .roles()
            .create(CreateRole {
                tenant_id: tenant.id,
                name: input.name,
                description: input.description,
                is_system_template: false,
                allow_high_risk_combination: input.allow_high_risk_combination,
            })
            .await?;

        self.record(
            actor,
            tenant,
            "role.create",
            Some(role.id.to_string()),
            AuditOutcome::Success,
            json!({
                "name": role.name,
                "allow_high_risk_combination": role.allow_high_risk_combination,
            }),
        )
        .await?;
        Ok(role)
    }

    pub async fn set_role_active(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        role_id: Uuid,
        active: bool,
    ) -> GateResult<Role> {
        self.authorize_admin(actor, tenant, "access.roles_manage")?;

        let role = self
            .repos
            .roles()
            .update(
                tenant.id,
                role_id,
                UpdateRole {
                    active: Some(active),
                    ..Default::default()
                },
            )
            .await?;

        let action = if active { "role.activate" } else { "role.deactivate" };
        self.record(
            actor,
            tenant,
            action,
            Some(role_id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(role)
    }

    /// Grant `code` to the role. Refused with
    /// [`GateError::HighRiskCombination`] when it would complete a
    /// high-risk pair on a role without the escape-hatch flag.
    ///
    /// The pair check runs before the write and again on the role's grants
    /// after it. A grant that completed a pair through a concurrent write
    /// is revoked before the refusal is returned.
    pub async fn grant_permission(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        role_id: Uuid,
        code: &str,
    ) -> GateResult<()> {
        self.authorize_admin(actor, tenant, "access.roles_manage")?;

        let role = self.repos.roles().get_by_id(tenant.id, role_id).await?;
        let permission = self.active_permission(code).await?;

        if !role.allow_high_risk_combination {
            if let Some(pair) = self.high_risk_pair(tenant, role_id, code).await? {
                return self.refuse_high_risk(actor, tenant, role_id, code, pair).await;
            }
        }

        self.repos
            .roles()
            .grant_permission(tenant.id, role_id, permission.id)
            .await?;

        if !role.allow_high_risk_combination {
            if let Some(pair) = self.high_risk_pair(tenant, role_id, code).await? {
                self.repos
                    .roles()
                    .revoke_permission(tenant.id, role_id, permission.id)
                    .await?;
                return self.refuse_high_risk(actor, tenant, role_id, code, pair).await;
            }
        }

        self.record(
            actor,
            tenant,
            "role.grant_permission",
            Some(role_id.to_string()),
            AuditOutcome::Success,
            json!({ "code": code }),
        )
        .await?;
        Ok(())
    }

    pub async fn revoke_permission(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        role_id: Uuid,
        code: &str,
    ) -> GateResult<()> {
        self.authorize_admin(actor, tenant, "access.roles_manage")?;

        self.repos.roles().get_by_id(tenant.id, role_id).await?;
        let permission_id = Permission::id_for_code(code);
        self.repos
            .roles()
            .revoke_permission(tenant.id, role_id, permission_id)
            .await?;
        self.record(
            actor,
            tenant,
            "role.revoke_permission",
            Some(role_id.to_string()),
            AuditOutcome::Success,
            json!({ "code": code }),
        )
        .await?;
        Ok(())
    }

    pub async fn assign_role(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        grant: RoleGrant,
    ) -> GateResult<Assignment> {
        self.authorize_admin(actor, tenant, "access.assignments_manage")?;

        let input = CreateAssignment {
            tenant_id: tenant.id,
            role_id: grant.role_id,
            principal_id: grant.principal_id,
            tenant_local_id: grant.tenant_local_id,
            scope_type: grant.scope_type,
            scope_target_id: grant.scope_target_id,
            assigned_by: actor.id,
        };
        input.validate()?;
        self.repos.roles().get_by_id(tenant.id, input.role_id).await?;

        let assignment = self.repos.assignments().assign(input).await?;
        self.record(
            actor,
            tenant,
            "assignment.create",
            Some(assignment.id.to_string()),
            AuditOutcome::Success,
            json!({
                "role_id": assignment.role_id,
                "principal_id": assignment.principal_id,
                "tenant_local_id": assignment.tenant_local_id,
                "scope_type": assignment.scope_type.as_str(),
                "scope_target_id": assignment.scope_target_id,
            }),
        )
        .await?;
        Ok(assignment)
    }

    pub async fn revoke_assignment(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        assignment_id: Uuid,
    ) -> GateResult<()> {
        self.authorize_admin(actor, tenant, "access.assignments_manage")?;

        self.repos
            .assignments()
            .revoke(tenant.id, assignment_id)
            .await?;
        self.record(
            actor,
            tenant,
            "assignment.revoke",
            Some(assignment_id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(())
    }

    pub async fn set_override(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        principal_id: Uuid,
        code: &str,
        effect: OverrideEffect,
        reason: &str,
    ) -> GateResult<PermissionOverride> {
        self.authorize_admin(actor, tenant, "access.overrides_manage")?;

        let permission = self.repos.permissions().get_by_code(code).await?;
        let result = self
            .repos
            .overrides()
            .set(SetOverride {
                tenant_id: tenant.id,
                principal_id,
                permission_id: permission.id,
                effect,
                reason: reason.to_owned(),
                created_by: actor.id,
            })
            .await?;

        self.record(
            actor,
            tenant,
            "override.set",
            Some(result.id.to_string()),
            AuditOutcome::Success,
            json!({
                "principal_id": principal_id,
                "code": code,
                "effect": effect.as_str(),
                "reason": reason,
            }),
        )
        .await?;
        Ok(result)
    }

    pub async fn remove_override(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        principal_id: Uuid,
        code: &str,
    ) -> GateResult<()> {
        self.authorize_admin(actor, tenant, "access.overrides_manage")?;

        let permission_id = Permission::id_for_code(code);
        self.repos
            .overrides()
            .remove(tenant.id, principal_id, permission_id)
            .await?;
        self.record(
            actor,
            tenant,
            "override.remove",
            Some(PermissionOverride::id_for(tenant.id, principal_id, permission_id).to_string()),
            AuditOutcome::Success,
            json!({ "principal_id": principal_id, "code": code }),
        )
        .await?;
        Ok(())
    }

    pub async fn audit_log(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        filter: AuditLogFilter,
        pagination: Pagination,
    ) -> GateResult<PaginatedResult<AuditLogEntry>> {
        self.authorize_admin(actor, tenant, "access.audit_view")?;
        self.repos.audit().list(tenant.id, filter, pagination).await
    }

    fn authorize_admin(&self, actor: &Principal, tenant: &Tenant, code: &str) -> GateResult<()> {
        if actor.bypasses_scoping(tenant.id) {
            return Ok(());
        }
        warn!(
            actor_id = %actor.id,
            tenant_id = %tenant.id,
            code,
            "Administrative action refused"
        );
        Err(GateError::PermissionDenied {
            required: vec![code.to_owned()],
        })
    }

    /// The high-risk pair `code` completes with the role's current grants.
    async fn high_risk_pair(
        &self,
        tenant: &Tenant,
        role_id: Uuid,
        code: &str,
    ) -> GateResult<Option<(&'static str, &'static str)>> {
        let held = self
            .repos
            .roles()
            .get_role_permissions(tenant.id, role_id)
            .await?;
        Ok(high_risk_conflict(
            held.iter().map(|p| p.code.as_str()).filter(|c| *c != code),
            code,
        ))
    }

    async fn refuse_high_risk(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        role_id: Uuid,
        code: &str,
        (first, second): (&'static str, &'static str),
    ) -> GateResult<()> {
        warn!(
            tenant_id = %tenant.id,
            role_id = %role_id,
            first,
            second,
            "Refused high-risk permission combination"
        );
        self.record(
            actor,
            tenant,
            "role.grant_permission",
            Some(role_id.to_string()),
            AuditOutcome::Denied,
            json!({ "code": code, "conflicts_with": [first, second] }),
        )
        .await?;
        Err(GateError::HighRiskCombination {
            first: first.into(),
            second: second.into(),
        })
    }

    async fn active_permission(&self, code: &str) -> GateResult<Permission> {
        let permission = self.repos.permissions().get_by_code(code).await?;
        if !permission.active {
            return Err(GateError::Validation {
                message: format!("permission {code} is inactive"),
            });
        }
        Ok(permission)
    }

    async fn record(
        &self,
        actor: &Principal,
        tenant: &Tenant,
        action: &str,
        target_id: Option<String>,
        outcome: AuditOutcome,
        metadata: serde_json::Value,
    ) -> GateResult<()> {
        self.repos
            .audit()
            .append(CreateAuditLogEntry {
                tenant_id: tenant.id,
                actor_id: actor.id,
                action: action.to_owned(),
                target_id,
                outcome,
                metadata: Some(metadata),
            })
            .await?;
        info!(
            actor_id = %actor.id,
            tenant_id = %tenant.id,
            action,
            outcome = outcome.as_str(),
            "Audited administrative action"
        );
        Ok(())
    }
}
