//! Domain models for TenantGate.
//!
//! These are the core types shared across all crates.

pub mod assignment;
pub mod audit;
pub mod membership;
pub mod permission;
pub mod permission_override;
pub mod principal;
pub mod role;
pub mod tenant;
