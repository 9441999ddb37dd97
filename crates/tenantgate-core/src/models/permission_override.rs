//! Per-principal permission overrides layered on top of role grants.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const OVERRIDE_ID_NAMESPACE: Uuid = Uuid::from_u128(0x91c4_5e07_3a2d_4b88_8f16_d07e_c2a9_4b13);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OverrideEffect {
    Allow,
    Deny,
}

impl OverrideEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideEffect::Allow => "Allow",
            OverrideEffect::Deny => "Deny",
        }
    }
}

impl fmt::Display for OverrideEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionOverride {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
    pub permission_id: Uuid,
    pub effect: OverrideEffect,
    pub reason: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PermissionOverride {
    /// One override per (tenant, principal, permission): the record id is
    /// derived from that triple so writes are upserts.
    pub fn id_for(tenant_id: Uuid, principal_id: Uuid, permission_id: Uuid) -> Uuid {
        let key = format!("{tenant_id}|{principal_id}|{permission_id}");
        Uuid::new_v5(&OVERRIDE_ID_NAMESPACE, key.as_bytes())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetOverride {
    pub tenant_id: Uuid,
    pub principal_id: Uuid,
    pub permission_id: Uuid,
    pub effect: OverrideEffect,
    pub reason: String,
    pub created_by: Uuid,
}
