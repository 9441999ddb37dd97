//! Integration tests for the full authorize flow.

mod common;

use serde_json::json;
use tenantgate_authz::{AuthzConfig, GrantSource, RequestContext};
use tenantgate_core::error::GateError;
use tenantgate_core::models::assignment::ScopeType;
use tenantgate_core::models::principal::UpdatePrincipal;
use tenantgate_core::repository::{PrincipalRepository, Repositories};
use tenantgate_core::scope::ScopeFields;

#[tokio::test]
async fn anonymous_request_needs_authentication() {
    let h = common::setup().await;
    let err = h
        .adp
        .authorize(&RequestContext::anonymous(), "employees.view")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::AuthenticationRequired));
}

#[tokio::test]
async fn request_without_tenant_is_rejected() {
    let h = common::setup().await;
    let user = h.delegate("clerk@acme.test").await;
    let err = h
        .adp
        .authorize(&RequestContext::new(user), "employees.view")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::TenantContextRequired));
}

#[tokio::test]
async fn missing_permission_is_denied() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;

    let err = h
        .adp
        .authorize(
            &RequestContext::new(user).with_tenant(acme.id),
            ["payroll.manage", "payroll.approve"],
        )
        .await
        .unwrap_err();
    match err {
        GateError::PermissionDenied { required } => {
            assert_eq!(required, vec!["payroll.manage", "payroll.approve"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn granted_request_carries_scope_and_store() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("branch@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Branch HR", &["employees.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Branch, Some("B2"))
        .await;

    let grant = h
        .adp
        .authorize(
            &RequestContext::new(user).with_tenant(acme.id),
            "employees.view",
        )
        .await
        .unwrap();
    assert_eq!(grant.tenant.id, acme.id);
    assert_eq!(grant.permissions.source, GrantSource::Delegated);
    assert_eq!(grant.store.as_ref().unwrap().locator, "store_acme");

    let records = vec![
        json!({"id": "emp-1", "branch_id": "B1"}),
        json!({"id": "emp-2", "branch_id": "B2"}),
    ];
    let visible = grant.filter(records, &ScopeFields::new().branch("branch_id"));
    assert_eq!(visible, vec![json!({"id": "emp-2", "branch_id": "B2"})]);
}

#[tokio::test]
async fn owner_is_authorized_without_a_requested_tenant() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let owner = h.owner(&acme).await;

    let grant = h
        .adp
        .authorize(&RequestContext::new(owner), "treasury.approve")
        .await
        .unwrap();
    assert_eq!(grant.tenant.id, acme.id);
    assert_eq!(grant.permissions.source, GrantSource::Owner);
    assert!(grant.scope.is_company());
}

#[tokio::test]
async fn requested_tenant_is_remembered_when_configured() {
    let config = AuthzConfig {
        remember_requested_tenant: true,
        ..Default::default()
    };
    let h = common::setup_with(config, true).await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Viewer", &["employees.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    let grant = h
        .adp
        .authorize(
            &RequestContext::new(user.clone()).with_tenant(acme.id),
            "employees.view",
        )
        .await
        .unwrap();
    assert_eq!(grant.principal.last_active_tenant_id, Some(acme.id));
    assert_eq!(h.reload(&user).await.last_active_tenant_id, Some(acme.id));

    // The sticky tenant now resolves without an explicit request.
    h.adp
        .authorize(&RequestContext::new(grant.principal), "employees.view")
        .await
        .unwrap();
}

#[tokio::test]
async fn requested_tenant_is_not_remembered_by_default() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let user = h.delegate("clerk@acme.test").await;
    h.join(&user, &acme, None).await;
    let role = h.role(&acme, "Viewer", &["employees.view"]).await;
    h.assign(&acme, &role, &user, ScopeType::Company, None).await;

    h.adp
        .authorize(
            &RequestContext::new(user.clone()).with_tenant(acme.id),
            "employees.view",
        )
        .await
        .unwrap();
    assert_eq!(h.reload(&user).await.last_active_tenant_id, None);
}

#[tokio::test]
async fn deactivated_principal_is_not_authenticated() {
    let h = common::setup().await;
    let acme = h.tenant("acme").await;
    let owner = h.owner(&acme).await;
    let owner = h
        .repos
        .principals()
        .update(
            owner.id,
            UpdatePrincipal {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!owner.active);

    let err = h
        .adp
        .authorize(&RequestContext::new(owner), "employees.view")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::AuthenticationRequired));
}
