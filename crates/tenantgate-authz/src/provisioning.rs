//! Attachment of per-tenant isolated stores.
//!
//! The engine never creates or migrates a tenant's store. It asks a
//! [`StoreProvisioner`] where the store lives and registers it once per
//! process in the [`StoreRegistry`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tenantgate_core::error::GateResult;
use tenantgate_core::models::tenant::Tenant;
use tenantgate_core::repository::TenantRepository;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ProvisionError;

/// A tenant store registered with the running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHandle {
    pub tenant_id: Uuid,
    pub locator: String,
    pub attached_at: DateTime<Utc>,
}

/// The provisioning collaborator.
pub trait StoreProvisioner: Send + Sync {
    /// Where the tenant's store lives, or `None` if it is not provisioned yet.
    fn store_locator_for(
        &self,
        tenant_id: Uuid,
    ) -> impl Future<Output = GateResult<Option<String>>> + Send;

    /// Register the store with this process.
    fn attach(
        &self,
        tenant_id: Uuid,
        locator: &str,
    ) -> impl Future<Output = GateResult<StoreHandle>> + Send;
}

/// Process-wide attach-if-absent cache keyed by tenant id.
///
/// Each tenant gets its own [`OnceCell`]; the map lock is held only long
/// enough to fetch or insert that cell, so attaching one tenant never
/// blocks requests for another. A failed or cancelled attach leaves the
/// cell empty and the next request retries.
pub struct StoreRegistry<P: StoreProvisioner> {
    provisioner: P,
    cells: Mutex<HashMap<Uuid, Arc<OnceCell<StoreHandle>>>>,
}

impl<P: StoreProvisioner> StoreRegistry<P> {
    pub fn new(provisioner: P) -> Self {
        Self {
            provisioner,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Attach the tenant's store unless already attached.
    ///
    /// Returns `Ok(None)` for a tenant that has no store locator yet.
    pub async fn ensure_attached(&self, tenant: &Tenant) -> GateResult<Option<StoreHandle>> {
        if let Some(handle) = self.handle(tenant.id) {
            return Ok(Some(handle));
        }

        let locator = match &tenant.store_locator {
            Some(locator) => Some(locator.clone()),
            None => self.provisioner.store_locator_for(tenant.id).await?,
        };
        let Some(locator) = locator else {
            debug!(tenant_id = %tenant.id, "Tenant store not provisioned yet");
            return Ok(None);
        };

        let cell = self.cell(tenant.id);
        let handle = cell
            .get_or_try_init(|| async {
                let handle = self.provisioner.attach(tenant.id, &locator).await?;
                info!(
                    tenant_id = %tenant.id,
                    locator = %handle.locator,
                    "Attached tenant store"
                );
                Ok::<_, tenantgate_core::GateError>(handle)
            })
            .await?;

        Ok(Some(handle.clone()))
    }

    /// The handle for an already-attached tenant.
    pub fn handle(&self, tenant_id: Uuid) -> Option<StoreHandle> {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.get(&tenant_id).and_then(|cell| cell.get().cloned())
    }

    /// Number of tenants with an attached store.
    pub fn attached_count(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.initialized()).count()
    }

    fn cell(&self, tenant_id: Uuid) -> Arc<OnceCell<StoreHandle>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(tenant_id).or_default().clone()
    }
}

/// Provisioner that reads the locator recorded on the tenant row.
///
/// Attaching only validates and records the locator; connecting to the
/// tenant store is left to the business modules that receive the handle.
#[derive(Clone)]
pub struct RecordLocatorProvisioner<T: TenantRepository> {
    tenants: T,
}

impl<T: TenantRepository> RecordLocatorProvisioner<T> {
    pub fn new(tenants: T) -> Self {
        Self { tenants }
    }
}

impl<T: TenantRepository> StoreProvisioner for RecordLocatorProvisioner<T> {
    async fn store_locator_for(&self, tenant_id: Uuid) -> GateResult<Option<String>> {
        let tenant = self.tenants.get_by_id(tenant_id).await?;
        Ok(tenant.store_locator)
    }

    async fn attach(&self, tenant_id: Uuid, locator: &str) -> GateResult<StoreHandle> {
        if locator.trim().is_empty() {
            return Err(ProvisionError::MissingLocator { tenant_id }.into());
        }
        Ok(StoreHandle {
            tenant_id,
            locator: locator.to_owned(),
            attached_at: Utc::now(),
        })
    }
}
