//! TenantGate Authz: per-request tenant resolution, effective permission
//! computation and scope filtering.
//!
//! Business modules talk to [`AccessDecisionPoint`]; owners administer
//! their tenant through [`TenantAdministration`]. Both are generic over a
//! [`Repositories`](tenantgate_core::repository::Repositories) bundle so
//! this crate has no dependency on the database crate.

pub mod admin;
pub mod assignment;
pub mod catalog;
pub mod config;
pub mod decision;
pub mod effective;
pub mod error;
pub mod provisioning;
pub mod scope;
pub mod tenant;

pub use admin::{NewRole, RoleGrant, TenantAdministration};
pub use assignment::{AssignmentResolver, DelegateAssignments};
pub use catalog::PermissionCatalog;
pub use config::AuthzConfig;
pub use decision::{AccessDecisionPoint, AccessGrant, RequestContext};
pub use effective::{
    EffectivePermissionCalculator, EffectivePermissions, GrantSource, RequiredPermissions,
};
pub use error::ProvisionError;
pub use provisioning::{RecordLocatorProvisioner, StoreHandle, StoreProvisioner, StoreRegistry};
pub use scope::ScopeAggregator;
pub use tenant::TenantResolver;
