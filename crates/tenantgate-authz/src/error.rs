//! Engine-local error types.

use tenantgate_core::error::GateError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("no store locator recorded for tenant {tenant_id}")]
    MissingLocator { tenant_id: Uuid },

    #[error("failed to attach store {locator:?} for tenant {tenant_id}: {reason}")]
    AttachFailed {
        tenant_id: Uuid,
        locator: String,
        reason: String,
    },
}

impl From<ProvisionError> for GateError {
    fn from(err: ProvisionError) -> Self {
        GateError::Internal(err.to_string())
    }
}
