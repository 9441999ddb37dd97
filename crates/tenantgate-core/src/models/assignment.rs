//! Role assignment domain model.
//!
//! An assignment binds a role to a delegated identity inside one tenant
//! for a given scope. The identity is the principal id, the tenant-local
//! employee record id, or both: assignments may be created before the
//! employee has a linked account.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GateError, GateResult};
use crate::scope::ScopeGrant;

/// Namespace for the deterministic assignment key.
const ASSIGNMENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x2f0e_93b1_7c55_4d1e_a0c8_61d4_3b9e_05aa);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScopeType {
    Company,
    Branch,
    Department,
    SelfOnly,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Company => "Company",
            ScopeType::Branch => "Branch",
            ScopeType::Department => "Department",
            ScopeType::SelfOnly => "SelfOnly",
        }
    }

    pub fn requires_target(&self) -> bool {
        matches!(self, ScopeType::Branch | ScopeType::Department)
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub principal_id: Option<Uuid>,
    pub tenant_local_id: Option<String>,
    pub scope_type: ScopeType,
    pub scope_target_id: Option<String>,
    pub assigned_by: Uuid,
    pub assigned_at: DateTime<Utc>,
}

impl Assignment {
    /// The scope grant this assignment contributes. A `SelfOnly`
    /// assignment resolves against `self_id` (the holder's tenant-local
    /// record from their membership), falling back to the record the
    /// assignment targets; with neither it grants nothing.
    pub fn scope_grant(&self, self_id: Option<&str>) -> Option<ScopeGrant> {
        match self.scope_type {
            ScopeType::Company => Some(ScopeGrant::Company),
            ScopeType::Branch => self.scope_target_id.clone().map(ScopeGrant::Branch),
            ScopeType::Department => self.scope_target_id.clone().map(ScopeGrant::Department),
            ScopeType::SelfOnly => self_id
                .or(self.tenant_local_id.as_deref())
                .map(|id| ScopeGrant::SelfRecord(id.to_owned())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAssignment {
    pub tenant_id: Uuid,
    pub role_id: Uuid,
    pub principal_id: Option<Uuid>,
    pub tenant_local_id: Option<String>,
    pub scope_type: ScopeType,
    pub scope_target_id: Option<String>,
    pub assigned_by: Uuid,
}

impl CreateAssignment {
    /// Check the scope/target pairing and that an identity is present.
    pub fn validate(&self) -> GateResult<()> {
        let target = self
            .scope_target_id
            .as_deref()
            .filter(|t| !t.trim().is_empty());

        match (self.scope_type.requires_target(), target) {
            (true, None) => {
                return Err(GateError::InvalidScopeAssignment {
                    reason: format!("{} scope requires a target id", self.scope_type),
                });
            }
            (false, Some(_)) => {
                return Err(GateError::InvalidScopeAssignment {
                    reason: format!("{} scope must not carry a target id", self.scope_type),
                });
            }
            _ => {}
        }

        if self.principal_id.is_none() && self.tenant_local_id.is_none() {
            return Err(GateError::Validation {
                message: "assignment needs a principal id or a tenant-local id".into(),
            });
        }
        Ok(())
    }

    /// Deterministic key over the uniqueness tuple
    /// (tenant, identity, role, scope type, scope target).
    pub fn natural_key(&self) -> Uuid {
        let identity = match (&self.tenant_local_id, self.principal_id) {
            (Some(local), _) => format!("local:{local}"),
            (None, Some(p)) => format!("principal:{p}"),
            (None, None) => String::new(),
        };
        let key = format!(
            "{}|{}|{}|{}|{}",
            self.tenant_id,
            identity,
            self.role_id,
            self.scope_type,
            self.scope_target_id.as_deref().unwrap_or("")
        );
        Uuid::new_v5(&ASSIGNMENT_ID_NAMESPACE, key.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(scope_type: ScopeType, target: Option<&str>) -> CreateAssignment {
        CreateAssignment {
            tenant_id: Uuid::new_v4(),
            role_id: Uuid::new_v4(),
            principal_id: Some(Uuid::new_v4()),
            tenant_local_id: None,
            scope_type,
            scope_target_id: target.map(str::to_owned),
            assigned_by: Uuid::new_v4(),
        }
    }

    #[test]
    fn branch_without_target_is_rejected() {
        let err = input(ScopeType::Branch, None).validate().unwrap_err();
        assert!(matches!(err, GateError::InvalidScopeAssignment { .. }));
    }

    #[test]
    fn blank_target_counts_as_missing() {
        let err = input(ScopeType::Department, Some("  ")).validate().unwrap_err();
        assert!(matches!(err, GateError::InvalidScopeAssignment { .. }));
    }

    #[test]
    fn company_with_target_is_rejected() {
        let err = input(ScopeType::Company, Some("b1")).validate().unwrap_err();
        assert!(matches!(err, GateError::InvalidScopeAssignment { .. }));
    }

    #[test]
    fn self_only_without_target_is_valid() {
        input(ScopeType::SelfOnly, None).validate().unwrap();
        input(ScopeType::Branch, Some("b1")).validate().unwrap();
    }

    #[test]
    fn identity_is_required() {
        let mut a = input(ScopeType::Company, None);
        a.principal_id = None;
        assert!(matches!(
            a.validate().unwrap_err(),
            GateError::Validation { .. }
        ));
    }

    #[test]
    fn natural_key_distinguishes_scope_targets() {
        let a = input(ScopeType::Branch, Some("b1"));
        let mut b = a.clone();
        assert_eq!(a.natural_key(), b.natural_key());
        b.scope_target_id = Some("b2".into());
        assert_ne!(a.natural_key(), b.natural_key());
    }
}
