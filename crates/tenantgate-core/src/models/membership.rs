//! Membership domain model: the link between a principal and a tenant.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MembershipStatus {
    Invited,
    Active,
    Terminated,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Invited => "Invited",
            MembershipStatus::Active => "Active",
            MembershipStatus::Terminated => "Terminated",
        }
    }

    /// Memberships only move forward; `Terminated` is final.
    pub fn can_transition_to(&self, next: MembershipStatus) -> bool {
        matches!(
            (self, next),
            (MembershipStatus::Invited, MembershipStatus::Active)
                | (MembershipStatus::Invited, MembershipStatus::Terminated)
                | (MembershipStatus::Active, MembershipStatus::Terminated)
        )
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Membership {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    pub status: MembershipStatus,
    /// The principal's record id inside the tenant's isolated store.
    pub tenant_local_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub principal_id: Uuid,
    pub tenant_id: Uuid,
    pub status: MembershipStatus,
    pub tenant_local_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated_is_final() {
        let t = MembershipStatus::Terminated;
        assert!(!t.can_transition_to(MembershipStatus::Active));
        assert!(!t.can_transition_to(MembershipStatus::Invited));
    }

    #[test]
    fn no_way_back_to_invited() {
        assert!(MembershipStatus::Invited.can_transition_to(MembershipStatus::Active));
        assert!(!MembershipStatus::Active.can_transition_to(MembershipStatus::Invited));
    }
}
