//! TenantGate Core: domain models, error taxonomy and repository traits
//! shared by every crate in the workspace.
//!
//! Nothing in this crate performs I/O. Persistence lives in
//! `tenantgate-db`, the decision engine in `tenantgate-authz`.

pub mod catalog;
pub mod error;
pub mod models;
pub mod repository;
pub mod scope;

pub use error::{GateError, GateResult};
