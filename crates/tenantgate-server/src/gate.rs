//! The engine wired over the control-plane database.

use std::sync::Arc;

use surrealdb::Connection;
use surrealdb::engine::remote::ws::Client;
use tenantgate_authz::{
    AccessDecisionPoint, AuthzConfig, PermissionCatalog, RecordLocatorProvisioner, StoreRegistry,
    TenantAdministration,
};
use tenantgate_core::error::GateResult;
use tenantgate_core::repository::{Pagination, Repositories, TenantRepository};
use tenantgate_db::repository::SurrealTenantRepository;
use tenantgate_db::{DbManager, SurrealRepositories};
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerError;

pub type GateProvisioner<C> = RecordLocatorProvisioner<SurrealTenantRepository<C>>;
pub type Decisions<C> = AccessDecisionPoint<SurrealRepositories<C>, GateProvisioner<C>>;
pub type Administration<C> = TenantAdministration<SurrealRepositories<C>>;

const WARM_PAGE_SIZE: u64 = 100;

/// Shared handles business modules take per request: the decision point
/// and the audited administration surface, over one store registry.
pub struct Gate<C: Connection> {
    repos: Arc<SurrealRepositories<C>>,
    registry: Arc<StoreRegistry<GateProvisioner<C>>>,
    decisions: Arc<Decisions<C>>,
    admin: Arc<Administration<C>>,
}

impl Gate<Client> {
    /// Connect, migrate and wire the engine from server configuration.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ServerError> {
        let db = DbManager::bootstrap(&config.db).await?;
        Ok(Self::new(db.repositories(), config.authz.clone()).await?)
    }
}

impl<C: Connection + Clone> Gate<C> {
    /// Wire the engine over `repos`, seeding the catalog when configured.
    pub async fn new(repos: SurrealRepositories<C>, config: AuthzConfig) -> GateResult<Self> {
        let repos = Arc::new(repos);
        if config.seed_catalog_on_startup {
            PermissionCatalog::new(repos.clone()).ensure_defaults().await?;
        }

        let provisioner = RecordLocatorProvisioner::new(repos.tenants().clone());
        let registry = Arc::new(StoreRegistry::new(provisioner));
        let decisions = Arc::new(AccessDecisionPoint::new(
            repos.clone(),
            registry.clone(),
            config,
        ));
        let admin = Arc::new(TenantAdministration::new(repos.clone()));

        Ok(Self {
            repos,
            registry,
            decisions,
            admin,
        })
    }

    pub fn decisions(&self) -> Arc<Decisions<C>> {
        self.decisions.clone()
    }

    pub fn admin(&self) -> Arc<Administration<C>> {
        self.admin.clone()
    }

    pub fn attached_stores(&self) -> usize {
        self.registry.attached_count()
    }

    /// Attach the store of every active, provisioned tenant ahead of its
    /// first request. Returns how many stores are attached afterwards.
    pub async fn warm_stores(&self) -> GateResult<usize> {
        let mut offset = 0;
        loop {
            let page = self
                .repos
                .tenants()
                .list(Pagination {
                    offset,
                    limit: WARM_PAGE_SIZE,
                })
                .await?;
            let fetched = page.items.len() as u64;

            for tenant in page.items.iter().filter(|t| t.active) {
                self.registry.ensure_attached(tenant).await?;
            }

            offset += fetched;
            if fetched == 0 || offset >= page.total {
                break;
            }
        }

        let attached = self.registry.attached_count();
        info!(attached, "Tenant stores warmed");
        Ok(attached)
    }
}
