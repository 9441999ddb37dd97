//! TenantGate Server: configuration and wiring of the authorization
//! engine over the control-plane database.
//!
//! Business modules embed a [`Gate`] in-process and call its decision
//! point on every request.

pub mod config;
pub mod error;
pub mod gate;

pub use config::{ConfigError, ServerConfig};
pub use error::ServerError;
pub use gate::Gate;
