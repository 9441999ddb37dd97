//! Integration tests for the catalog, roles, grants, assignments, overrides
//! and audit log using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantgate_core::catalog::DEFAULT_PERMISSIONS;
use tenantgate_core::error::GateError;
use tenantgate_core::models::assignment::{CreateAssignment, ScopeType};
use tenantgate_core::models::audit::{AuditOutcome, CreateAuditLogEntry};
use tenantgate_core::models::permission::Permission;
use tenantgate_core::models::permission_override::{OverrideEffect, SetOverride};
use tenantgate_core::models::role::{CreateRole, UpdateRole};
use tenantgate_core::repository::{
    AssignmentRepository, AuditLogFilter, AuditLogRepository, OverrideRepository, Pagination,
    PermissionRepository, Repositories, RoleRepository,
};
use tenantgate_db::SurrealRepositories;
use uuid::Uuid;

async fn setup() -> SurrealRepositories<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tenantgate_db::run_migrations(&db).await.unwrap();
    let repos = SurrealRepositories::new(db);
    for entry in DEFAULT_PERMISSIONS {
        repos
            .permissions()
            .create_if_absent(entry.to_create())
            .await
            .unwrap();
    }
    repos
}

fn role(tenant_id: Uuid, name: &str) -> CreateRole {
    CreateRole {
        tenant_id,
        name: name.into(),
        description: String::new(),
        is_system_template: false,
        allow_high_risk_combination: false,
    }
}

fn assignment(tenant_id: Uuid, role_id: Uuid, principal_id: Option<Uuid>) -> CreateAssignment {
    CreateAssignment {
        tenant_id,
        role_id,
        principal_id,
        tenant_local_id: None,
        scope_type: ScopeType::Company,
        scope_target_id: None,
        assigned_by: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn catalog_seeding_is_idempotent() {
    let repos = setup().await;
    let first = &DEFAULT_PERMISSIONS[0];
    let created = repos
        .permissions()
        .create_if_absent(first.to_create())
        .await
        .unwrap();
    assert!(!created, "second seed must not create");

    let all = repos.permissions().list_all().await.unwrap();
    assert_eq!(all.len(), DEFAULT_PERMISSIONS.len());

    let p = repos.permissions().get_by_code(first.code).await.unwrap();
    assert_eq!(p.id, Permission::id_for_code(first.code));
}

#[tokio::test]
async fn deactivated_permissions_drop_out_of_active_codes() {
    let repos = setup().await;
    repos
        .permissions()
        .set_active("payroll.view", false)
        .await
        .unwrap();
    let codes = repos.permissions().active_codes().await.unwrap();
    assert!(!codes.contains(&"payroll.view".to_string()));
    assert!(codes.contains(&"payroll.manage".to_string()));
}

#[tokio::test]
async fn role_names_are_unique_per_tenant() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    repos.roles().create(role(tenant, "HR")).await.unwrap();
    let err = repos.roles().create(role(tenant, "HR")).await.unwrap_err();
    assert!(matches!(err, GateError::AlreadyExists { .. }));

    // A different tenant may reuse the name.
    repos.roles().create(role(Uuid::new_v4(), "HR")).await.unwrap();
}

#[tokio::test]
async fn roles_are_isolated_by_tenant() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let r = repos.roles().create(role(tenant, "Payroll")).await.unwrap();

    let err = repos
        .roles()
        .get_by_id(Uuid::new_v4(), r.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::NotFound { .. }));

    let page = repos
        .roles()
        .list(tenant, Pagination::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}

#[tokio::test]
async fn grants_and_active_codes() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let r = repos.roles().create(role(tenant, "Payroll")).await.unwrap();
    let view = Permission::id_for_code("payroll.view");
    let manage = Permission::id_for_code("payroll.manage");

    repos.roles().grant_permission(tenant, r.id, view).await.unwrap();
    repos.roles().grant_permission(tenant, r.id, view).await.unwrap();
    repos.roles().grant_permission(tenant, r.id, manage).await.unwrap();

    let perms = repos.roles().get_role_permissions(tenant, r.id).await.unwrap();
    assert_eq!(perms.len(), 2, "duplicate grant must be a no-op");

    repos
        .permissions()
        .set_active("payroll.view", false)
        .await
        .unwrap();
    let codes = repos
        .roles()
        .active_codes_for_roles(tenant, &[r.id])
        .await
        .unwrap();
    assert_eq!(codes, vec!["payroll.manage".to_string()]);

    repos.roles().revoke_permission(tenant, r.id, manage).await.unwrap();
    let codes = repos
        .roles()
        .active_codes_for_roles(tenant, &[r.id])
        .await
        .unwrap();
    assert!(codes.is_empty());
}

#[tokio::test]
async fn inactive_roles_are_filtered() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let a = repos.roles().create(role(tenant, "A")).await.unwrap();
    let b = repos.roles().create(role(tenant, "B")).await.unwrap();
    repos
        .roles()
        .update(
            tenant,
            b.id,
            UpdateRole {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let active = repos
        .roles()
        .active_role_ids(tenant, &[a.id, b.id])
        .await
        .unwrap();
    assert_eq!(active, vec![a.id]);
}

#[tokio::test]
async fn duplicate_assignment_returns_existing_row() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let r = repos.roles().create(role(tenant, "HR")).await.unwrap();
    let principal = Uuid::new_v4();

    let first = repos
        .assignments()
        .assign(assignment(tenant, r.id, Some(principal)))
        .await
        .unwrap();
    let second = repos
        .assignments()
        .assign(assignment(tenant, r.id, Some(principal)))
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let held = repos
        .assignments()
        .find_by_principal_or_local_id(tenant, principal, None)
        .await
        .unwrap();
    assert_eq!(held.len(), 1);
}

#[tokio::test]
async fn invalid_scope_pairing_is_not_persisted() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let r = repos.roles().create(role(tenant, "HR")).await.unwrap();
    let mut input = assignment(tenant, r.id, Some(Uuid::new_v4()));
    input.scope_type = ScopeType::Branch;

    let err = repos.assignments().assign(input).await.unwrap_err();
    assert!(matches!(err, GateError::InvalidScopeAssignment { .. }));
}

#[tokio::test]
async fn lookup_unions_principal_and_local_id() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let hr = repos.roles().create(role(tenant, "HR")).await.unwrap();
    let clerk = repos.roles().create(role(tenant, "Clerk")).await.unwrap();
    let principal = Uuid::new_v4();

    repos
        .assignments()
        .assign(assignment(tenant, hr.id, Some(principal)))
        .await
        .unwrap();
    // Written before the employee had an account.
    let mut by_local = assignment(tenant, clerk.id, None);
    by_local.tenant_local_id = Some("emp-7".into());
    by_local.scope_type = ScopeType::Department;
    by_local.scope_target_id = Some("D1".into());
    repos.assignments().assign(by_local).await.unwrap();

    let without_local = repos
        .assignments()
        .find_by_principal_or_local_id(tenant, principal, None)
        .await
        .unwrap();
    assert_eq!(without_local.len(), 1);

    let with_local = repos
        .assignments()
        .find_by_principal_or_local_id(tenant, principal, Some("emp-7"))
        .await
        .unwrap();
    assert_eq!(with_local.len(), 2);

    // Another tenant sees nothing.
    let other = repos
        .assignments()
        .find_by_principal_or_local_id(Uuid::new_v4(), principal, Some("emp-7"))
        .await
        .unwrap();
    assert!(other.is_empty());
}

#[tokio::test]
async fn deleting_role_removes_assignments() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let r = repos.roles().create(role(tenant, "HR")).await.unwrap();
    let principal = Uuid::new_v4();
    let a = repos
        .assignments()
        .assign(assignment(tenant, r.id, Some(principal)))
        .await
        .unwrap();

    repos.roles().delete(tenant, r.id).await.unwrap();
    let err = repos.assignments().get_by_id(tenant, a.id).await.unwrap_err();
    assert!(matches!(err, GateError::NotFound { .. }));
}

#[tokio::test]
async fn override_set_replaces_previous_effect() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let principal = Uuid::new_v4();
    let perm = Permission::id_for_code("payroll.view");

    let set = |effect| SetOverride {
        tenant_id: tenant,
        principal_id: principal,
        permission_id: perm,
        effect,
        reason: "audit".into(),
        created_by: Uuid::new_v4(),
    };

    let first = repos.overrides().set(set(OverrideEffect::Allow)).await.unwrap();
    let second = repos.overrides().set(set(OverrideEffect::Deny)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(second.effect, OverrideEffect::Deny);

    let listed = repos
        .overrides()
        .list_for_principal(tenant, principal)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    repos.overrides().remove(tenant, principal, perm).await.unwrap();
    assert!(
        repos
            .overrides()
            .list_for_principal(tenant, principal)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn audit_log_filters_by_action() {
    let repos = setup().await;
    let tenant = Uuid::new_v4();
    let actor = Uuid::new_v4();
    for action in ["role.create", "role.create", "override.set"] {
        repos
            .audit()
            .append(CreateAuditLogEntry {
                tenant_id: tenant,
                actor_id: actor,
                action: action.into(),
                target_id: None,
                outcome: AuditOutcome::Success,
                metadata: None,
            })
            .await
            .unwrap();
    }

    let page = repos
        .audit()
        .list(
            tenant,
            AuditLogFilter {
                action: Some("role.create".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|e| e.action == "role.create"));

    let other = repos
        .audit()
        .list(Uuid::new_v4(), AuditLogFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(other.total, 0);
}
