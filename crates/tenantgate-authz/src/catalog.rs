//! Idempotent seeding of the default permission catalog.

use std::sync::Arc;

use tenantgate_core::catalog::{CATALOG_VERSION, DEFAULT_PERMISSIONS};
use tenantgate_core::error::GateResult;
use tenantgate_core::repository::{PermissionRepository, Repositories};
use tracing::{debug, info};

pub struct PermissionCatalog<R: Repositories> {
    repos: Arc<R>,
}

impl<R: Repositories> PermissionCatalog<R> {
    pub fn new(repos: Arc<R>) -> Self {
        Self { repos }
    }

    /// Create every default permission that does not exist yet and return
    /// how many this call created. Safe to run repeatedly and concurrently:
    /// an entry created by a racing caller is simply not counted.
    pub async fn ensure_defaults(&self) -> GateResult<usize> {
        let mut created = 0;
        for entry in DEFAULT_PERMISSIONS {
            if self
                .repos
                .permissions()
                .create_if_absent(entry.to_create())
                .await?
            {
                debug!(code = entry.code, "Seeded permission");
                created += 1;
            }
        }

        info!(
            version = CATALOG_VERSION,
            created,
            total = DEFAULT_PERMISSIONS.len(),
            "Permission catalog ensured"
        );
        Ok(created)
    }
}
