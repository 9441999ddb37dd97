//! Error types for the TenantGate system.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Authentication required")]
    AuthenticationRequired,

    #[error("Tenant context required but none was supplied")]
    TenantContextRequired,

    #[error("Access to tenant {tenant_id} denied")]
    TenantAccessDenied { tenant_id: Uuid },

    #[error("Cannot switch to tenant {tenant_id}: no active membership")]
    InvalidTenantSwitch { tenant_id: Uuid },

    #[error("Permission denied: requires one of [{}]", required.join(", "))]
    PermissionDenied { required: Vec<String> },

    #[error("Invalid scope assignment: {reason}")]
    InvalidScopeAssignment { reason: String },

    #[error("Permissions {first} and {second} may not be held by the same role")]
    HighRiskCombination { first: String, second: String },

    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        entity: String,
        from: String,
        to: String,
    },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GateError {
    /// Whether the error is one of the authorization outcomes that are
    /// reported to the caller as-is (as opposed to infrastructure failures).
    pub fn is_access_failure(&self) -> bool {
        matches!(
            self,
            GateError::AuthenticationRequired
                | GateError::TenantContextRequired
                | GateError::TenantAccessDenied { .. }
                | GateError::InvalidTenantSwitch { .. }
                | GateError::PermissionDenied { .. }
        )
    }
}

pub type GateResult<T> = Result<T, GateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_lists_required_codes() {
        let err = GateError::PermissionDenied {
            required: vec!["payroll.view".into(), "payroll.manage".into()],
        };
        assert_eq!(
            err.to_string(),
            "Permission denied: requires one of [payroll.view, payroll.manage]"
        );
    }

    #[test]
    fn access_failures_are_classified() {
        assert!(GateError::TenantContextRequired.is_access_failure());
        assert!(!GateError::Database("boom".into()).is_access_failure());
        assert!(
            !GateError::InvalidScopeAssignment {
                reason: "x".into()
            }
            .is_access_failure()
        );
    }
}
