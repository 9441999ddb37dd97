//! Integration tests for the wired engine over an in-memory database.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantgate_authz::{AuthzConfig, RequestContext};
use tenantgate_core::error::GateError;
use tenantgate_core::models::principal::{CreatePrincipal, Principal};
use tenantgate_core::models::tenant::{CreateTenant, Tenant};
use tenantgate_core::repository::{PrincipalRepository, Repositories, TenantRepository};
use tenantgate_db::SurrealRepositories;
use tenantgate_server::Gate;

async fn repositories() -> SurrealRepositories<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tenantgate_db::run_migrations(&db).await.unwrap();
    SurrealRepositories::new(db)
}

fn config(seed_catalog_on_startup: bool) -> AuthzConfig {
    AuthzConfig {
        seed_catalog_on_startup,
        ..AuthzConfig::default()
    }
}

async fn tenant(repos: &SurrealRepositories<Db>, name: &str, locator: Option<&str>) -> Tenant {
    let tenant = repos
        .tenants()
        .create(CreateTenant { name: name.into() })
        .await
        .unwrap();
    match locator {
        Some(locator) => repos
            .tenants()
            .set_store_locator(tenant.id, locator)
            .await
            .unwrap(),
        None => tenant,
    }
}

async fn owner(repos: &SurrealRepositories<Db>, tenant: &Tenant) -> Principal {
    repos
        .principals()
        .create(CreatePrincipal {
            email: format!("owner@{}.test", tenant.name),
            platform_admin: false,
            superuser: false,
            owns_tenant: Some(tenant.id),
            is_delegate_capable: false,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn warm_stores_attaches_only_active_provisioned_tenants() {
    let repos = repositories().await;
    tenant(&repos, "acme", Some("store_acme")).await;
    tenant(&repos, "pending", None).await;
    let closed = tenant(&repos, "closed", Some("store_closed")).await;
    repos.tenants().set_active(closed.id, false).await.unwrap();

    let gate = Gate::new(repos, config(true)).await.unwrap();
    assert_eq!(gate.attached_stores(), 0);
    assert_eq!(gate.warm_stores().await.unwrap(), 1);

    // Attaching is idempotent.
    assert_eq!(gate.warm_stores().await.unwrap(), 1);
}

#[tokio::test]
async fn wired_decision_point_serves_requests() {
    let repos = repositories().await;
    let acme = tenant(&repos, "acme", Some("store_acme")).await;
    let boss = owner(&repos, &acme).await;

    let gate = Gate::new(repos, config(true)).await.unwrap();
    let grant = gate
        .decisions()
        .authorize(&RequestContext::new(boss), "employees.view")
        .await
        .unwrap();

    assert_eq!(grant.tenant.id, acme.id);
    assert_eq!(grant.store.unwrap().locator, "store_acme");
    assert_eq!(gate.attached_stores(), 1);
}

#[tokio::test]
async fn unseeded_gate_leaves_catalog_empty() {
    let repos = repositories().await;
    let acme = tenant(&repos, "acme", Some("store_acme")).await;
    let boss = owner(&repos, &acme).await;

    let gate = Gate::new(repos, config(false)).await.unwrap();
    let err = gate
        .decisions()
        .authorize(&RequestContext::new(boss), "employees.view")
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::PermissionDenied { .. }));
}
