//! Principal domain model.
//!
//! A principal is an already-authenticated identity. Token handling is
//! done upstream; this crate only consumes the resulting record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    /// Platform operators may act inside any tenant by explicit id.
    pub platform_admin: bool,
    pub superuser: bool,
    /// The tenant this principal owns. Owners are never scoped.
    pub owns_tenant: Option<Uuid>,
    /// Whether the principal may receive delegated role assignments.
    pub is_delegate_capable: bool,
    /// Sticky default tenant used when a request names none.
    pub last_active_tenant_id: Option<Uuid>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Platform admins and superusers bypass membership checks.
    pub fn is_platform_operator(&self) -> bool {
        self.platform_admin || self.superuser
    }

    pub fn owns(&self, tenant_id: Uuid) -> bool {
        self.owns_tenant == Some(tenant_id)
    }

    /// Operators and the tenant's owner see everything in that tenant.
    pub fn bypasses_scoping(&self, tenant_id: Uuid) -> bool {
        self.is_platform_operator() || self.owns(tenant_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrincipal {
    pub email: String,
    pub platform_admin: bool,
    pub superuser: bool,
    pub owns_tenant: Option<Uuid>,
    pub is_delegate_capable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdatePrincipal {
    pub email: Option<String>,
    pub is_delegate_capable: Option<bool>,
    /// `Some(Some(id))` = set, `Some(None)` = clear, `None` = no change.
    pub owns_tenant: Option<Option<Uuid>>,
    pub active: Option<bool>,
}
