//! Shared fixtures for the engine's integration tests: an in-memory
//! SurrealDB with migrations applied, a provisioner that counts attaches,
//! and helpers that create principals, tenants, roles and assignments.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tenantgate_authz::{
    AccessDecisionPoint, AuthzConfig, PermissionCatalog, StoreHandle, StoreProvisioner,
    StoreRegistry, TenantAdministration,
};
use tenantgate_core::error::GateResult;
use tenantgate_core::models::assignment::{Assignment, CreateAssignment, ScopeType};
use tenantgate_core::models::membership::{CreateMembership, MembershipStatus};
use tenantgate_core::models::permission::Permission;
use tenantgate_core::models::principal::{CreatePrincipal, Principal};
use tenantgate_core::models::role::{CreateRole, Role};
use tenantgate_core::models::tenant::{CreateTenant, Tenant};
use tenantgate_core::repository::{
    AssignmentRepository, MembershipRepository, PrincipalRepository, Repositories,
    RoleRepository, TenantRepository,
};
use tenantgate_db::SurrealRepositories;
use uuid::Uuid;

pub type Repos = SurrealRepositories<Db>;

/// Provisioner for tests. Tenants are provisioned only through the
/// locator on their row; every attach is counted.
#[derive(Clone, Default)]
pub struct CountingProvisioner {
    pub attaches: Arc<AtomicUsize>,
}

impl CountingProvisioner {
    pub fn count(&self) -> usize {
        self.attaches.load(Ordering::SeqCst)
    }
}

impl StoreProvisioner for CountingProvisioner {
    async fn store_locator_for(&self, _tenant_id: Uuid) -> GateResult<Option<String>> {
        Ok(None)
    }

    async fn attach(&self, tenant_id: Uuid, locator: &str) -> GateResult<StoreHandle> {
        self.attaches.fetch_add(1, Ordering::SeqCst);
        // Widen the window for concurrent first requests.
        tokio::task::yield_now().await;
        Ok(StoreHandle {
            tenant_id,
            locator: locator.to_owned(),
            attached_at: Utc::now(),
        })
    }
}

pub struct Harness {
    pub db: Surreal<Db>,
    pub repos: Arc<Repos>,
    pub provisioner: CountingProvisioner,
    pub registry: Arc<StoreRegistry<CountingProvisioner>>,
    pub adp: Arc<AccessDecisionPoint<Repos, CountingProvisioner>>,
    pub admin: Arc<TenantAdministration<Repos>>,
}

/// Fresh database with migrations applied but no permission catalog.
pub async fn setup_empty() -> Harness {
    setup_with(AuthzConfig::default(), false).await
}

/// Fresh database with the default permission catalog seeded.
pub async fn setup() -> Harness {
    setup_with(AuthzConfig::default(), true).await
}

pub async fn setup_with(config: AuthzConfig, seed: bool) -> Harness {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    tenantgate_db::run_migrations(&db).await.unwrap();

    let repos = Arc::new(SurrealRepositories::new(db.clone()));
    if seed {
        PermissionCatalog::new(repos.clone())
            .ensure_defaults()
            .await
            .unwrap();
    }

    let provisioner = CountingProvisioner::default();
    let registry = Arc::new(StoreRegistry::new(provisioner.clone()));
    let adp = Arc::new(AccessDecisionPoint::new(
        repos.clone(),
        registry.clone(),
        config,
    ));
    let admin = Arc::new(TenantAdministration::new(repos.clone()));

    Harness {
        db,
        repos,
        provisioner,
        registry,
        adp,
        admin,
    }
}

impl Harness {
    /// A tenant with its store provisioned under `store_<name>`.
    pub async fn tenant(&self, name: &str) -> Tenant {
        let tenant = self.unprovisioned_tenant(name).await;
        self.repos
            .tenants()
            .set_store_locator(tenant.id, &format!("store_{name}"))
            .await
            .unwrap()
    }

    pub async fn unprovisioned_tenant(&self, name: &str) -> Tenant {
        self.repos
            .tenants()
            .create(CreateTenant { name: name.into() })
            .await
            .unwrap()
    }

    async fn principal(&self, input: CreatePrincipal) -> Principal {
        self.repos.principals().create(input).await.unwrap()
    }

    pub async fn owner(&self, tenant: &Tenant) -> Principal {
        self.principal(CreatePrincipal {
            email: format!("owner@{}.test", tenant.name),
            platform_admin: false,
            superuser: false,
            owns_tenant: Some(tenant.id),
            is_delegate_capable: false,
        })
        .await
    }

    pub async fn operator(&self) -> Principal {
        self.principal(CreatePrincipal {
            email: "ops@platform.test".into(),
            platform_admin: true,
            superuser: false,
            owns_tenant: None,
            is_delegate_capable: false,
        })
        .await
    }

    pub async fn delegate(&self, email: &str) -> Principal {
        self.principal(CreatePrincipal {
            email: email.into(),
            platform_admin: false,
            superuser: false,
            owns_tenant: None,
            is_delegate_capable: true,
        })
        .await
    }

    /// Active membership, optionally linked to a tenant-local record.
    pub async fn join(&self, principal: &Principal, tenant: &Tenant, local_id: Option<&str>) {
        self.join_with_status(principal, tenant, local_id, MembershipStatus::Active)
            .await;
    }

    pub async fn join_with_status(
        &self,
        principal: &Principal,
        tenant: &Tenant,
        local_id: Option<&str>,
        status: MembershipStatus,
    ) {
        self.repos
            .memberships()
            .create(CreateMembership {
                principal_id: principal.id,
                tenant_id: tenant.id,
                status,
                tenant_local_id: local_id.map(str::to_owned),
            })
            .await
            .unwrap();
    }

    /// A role in `tenant` granted every code in `codes`.
    pub async fn role(&self, tenant: &Tenant, name: &str, codes: &[&str]) -> Role {
        let role = self
            .repos
            .roles()
            .create(CreateRole {
                tenant_id: tenant.id,
                name: name.into(),
                description: String::new(),
                is_system_template: false,
                allow_high_risk_combination: false,
            })
            .await
            .unwrap();
        for code in codes {
            self.repos
                .roles()
                .grant_permission(tenant.id, role.id, Permission::id_for_code(code))
                .await
                .unwrap();
        }
        role
    }

    pub async fn assign(
        &self,
        tenant: &Tenant,
        role: &Role,
        principal: &Principal,
        scope_type: ScopeType,
        target: Option<&str>,
    ) -> Assignment {
        self.repos
            .assignments()
            .assign(CreateAssignment {
                tenant_id: tenant.id,
                role_id: role.id,
                principal_id: Some(principal.id),
                tenant_local_id: None,
                scope_type,
                scope_target_id: target.map(str::to_owned),
                assigned_by: Uuid::new_v4(),
            })
            .await
            .unwrap()
    }

    /// Reload a principal after a write.
    pub async fn reload(&self, principal: &Principal) -> Principal {
        self.repos.principals().get_by_id(principal.id).await.unwrap()
    }
}
