//! Integration tests for effective permissions: role grants, overrides,
//! owner and operator bypass, and delegate detection.

mod common;

use tenantgate_authz::GrantSource;
use tenantgate_core::catalog::DEFAULT_PERMISSIONS;
use tenantgate_core::models::assignment::{CreateAssignment, ScopeType};
use tenantgate_core::models::permission::Permission;
use tenantgate_core::models::permission_override::{OverrideEffect, SetOverride};
use tenantgate_core::models::role::UpdateRole;
use tenantgate_core::repository::{
    AssignmentRepository, OverrideRepository, PermissionRepository, Repositories, RoleRepository,
};
use uuid::Uuid;

fn override_for(
    tenant_id: Uuid,
    principal_id: Uuid,
    code: &str,
    effect: OverrideEffect,
) -> SetOverride {
    SetOverride {
        tenant_id,
        principal_id,
        permission_id: Permission::id_for_code(code),
        effect,
        reason: "test".into(),
        created_by: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn owner_holds_every_active_catalog_permission() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let owner = h.owner(&acme).await;

    let effective = h.adp.effective_permissions(&owner, &acme).await.unwrap();
    assert_eq!(effective.source, GrantSource::Owner);
    assert_eq!(effective.codes.len(), DEFAULT_PERMISSIONS.len());

    h.repos
        .permissions()
        .set_active("recruitment.manage", false)
        .await
        .unwrap();
    let effective = h.adp.effective_permissions(&owner, &acme).await.unwrap();
    assert!(!effective.contains("recruitment.manage"));
    assert_eq!(effective.codes.len(), DEFAULT_PERMISSIONS.len() - 1);
}

#[tokio::test]
async fn owner_ignores_deny_overrides() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let owner = h.owner(&acme).await;
    h.repos
        .overrides()
        .set(override_for(acme.id, owner.id, "payroll.view", OverrideEffect::Deny))
        .await
        .unwrap();

    assert!(h.adp.has_permission(&owner, &acme, "payroll.view").await.unwrap());
}

#[tokio::test]
async fn operator_is_granted_everything_in_any_tenant() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let ops = h.operator().await;

    let effective = h.adp.effective_permissions(&ops, &acme).await.unwrap();
    assert_eq!(effective.source, GrantSource::PlatformOperator);
    assert!(effective.contains("treasury.approve"));
}

#[tokio::test]
async fn delegate_holds_only_role_grants() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let clerk = h.delegate("clerk@acme.test").await;
    h.join(&clerk, &acme, None).await;
    let role = h
        .role(&acme, "Payroll clerk", &["payroll.view", "employees.view"])
        .await;
    h.assign(&acme, &role, &clerk, ScopeType::Company, None).await;

    let effective = h.adp.effective_permissions(&clerk, &acme).await.unwrap();
    assert_eq!(effective.source, GrantSource::Delegated);
    let codes: Vec<_> = effective.codes.iter().map(String::as_str).collect();
    assert_eq!(codes, vec!["employees.view", "payroll.view"]);
}

#[tokio::test]
async fn deny_override_removes_role_grant() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("manager@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Payroll manager", &["payroll.manage"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    assert!(h.adp.has_permission(&user, &acme, "payroll.manage").await.unwrap());

    h.repos
        .overrides()
        .set(override_for(acme.id, user.id, "payroll.manage", OverrideEffect::Deny))
        .await
        .unwrap();
    assert!(!h.adp.has_permission(&user, &acme, "payroll.manage").await.unwrap());
}

#[tokio::test]
async fn deny_wins_over_allow_for_the_same_code() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;

    h.repos
        .overrides()
        .set(override_for(acme.id, user.id, "contracts.view", OverrideEffect::Allow))
        .await
        .unwrap();
    assert!(h.adp.has_permission(&user, &acme, "contracts.view").await.unwrap());

    // One override per (tenant, principal, permission): the deny replaces
    // the allow.
    h.repos
        .overrides()
        .set(override_for(acme.id, user.id, "contracts.view", OverrideEffect::Deny))
        .await
        .unwrap();
    assert!(!h.adp.has_permission(&user, &acme, "contracts.view").await.unwrap());
    assert_eq!(
        h.repos
            .overrides()
            .list_for_principal(acme.id, user.id)
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn allow_override_needs_an_active_permission() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    h.repos
        .overrides()
        .set(override_for(acme.id, user.id, "treasury.view", OverrideEffect::Allow))
        .await
        .unwrap();
    h.repos
        .permissions()
        .set_active("treasury.view", false)
        .await
        .unwrap();

    assert!(!h.adp.has_permission(&user, &acme, "treasury.view").await.unwrap());
}

#[tokio::test]
async fn inactive_role_grants_nothing() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Attendance", &["attendance.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    h.repos
        .roles()
        .update(
            acme.id,
            role.id,
            UpdateRole {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let effective = h.adp.effective_permissions(&user, &acme).await.unwrap();
    assert!(effective.codes.is_empty());
}

#[tokio::test]
async fn grants_do_not_leak_across_tenants() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let beta = h.tenant("beta").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    h.join(&user, &beta, None).await;
    let role = h.role(&acme, "Payroll clerk", &["payroll.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    assert!(h.adp.has_permission(&user, &acme, "payroll.view").await.unwrap());
    assert!(!h.adp.has_permission(&user, &beta, "payroll.view").await.unwrap());
}

#[tokio::test]
async fn required_codes_are_ored_and_empty_grants_nothing() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Viewer", &["payroll.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    assert!(
        h.adp
            .has_permission(&user, &acme, ["payroll.manage", "payroll.view"])
            .await
            .unwrap()
    );
    assert!(
        !h.adp
            .has_permission(&user, &acme, Vec::<String>::new())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn assignments_by_local_id_count_through_membership() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, Some("emp-42")).await;
    let role = h.role(&acme, "Contracts", &["contracts.view"]).await;
    h.repos
        .assignments()
        .assign(CreateAssignment {
            tenant_id: acme.id,
            role_id: role.id,
            principal_id: None,
            tenant_local_id: Some("emp-42".into()),
            scope_type: ScopeType::Company,
            scope_target_id: None,
            assigned_by: Uuid::new_v4(),
        })
        .await
        .unwrap();

    assert!(h.adp.has_permission(&user, &acme, "contracts.view").await.unwrap());
    assert!(h.adp.is_delegate(&user, &acme).await.unwrap());
}

#[tokio::test]
async fn delegate_status_needs_capability_and_assignment() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let owner = h.owner(&acme).await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;

    assert!(!h.adp.is_delegate(&owner, &acme).await.unwrap());
    assert!(!h.adp.is_delegate(&user, &acme).await.unwrap());

    let role = h.role(&acme, "Viewer", &["employees.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;
    assert!(h.adp.is_delegate(&user, &acme).await.unwrap());
}
