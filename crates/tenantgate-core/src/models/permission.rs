//! Permission domain model.
//!
//! Permissions form a global, tenant-independent catalog. The record id
//! is derived from the code so that seeding is keyed on the code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for code-derived permission ids.
const PERMISSION_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_0c2e_8d4b_4f7a_9b3c_5e2d_1a0f_7c61);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub id: Uuid,
    /// Unique dotted code, e.g. `payroll.manage`.
    pub code: String,
    pub module: String,
    pub resource: String,
    pub action: String,
    /// Classification metadata only; record visibility comes from
    /// assignment scopes.
    pub scope: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Deterministic record id for a permission code.
    pub fn id_for_code(code: &str) -> Uuid {
        Uuid::new_v5(&PERMISSION_ID_NAMESPACE, code.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePermission {
    pub code: String,
    pub module: String,
    pub resource: String,
    pub action: String,
    pub scope: String,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_for_code_is_stable() {
        assert_eq!(
            Permission::id_for_code("payroll.manage"),
            Permission::id_for_code("payroll.manage")
        );
        assert_ne!(
            Permission::id_for_code("payroll.manage"),
            Permission::id_for_code("payroll.view")
        );
    }
}
