//! Engine configuration.

use serde::Deserialize;

/// Configuration for the authorization engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthzConfig {
    /// Seed the default permission catalog when the process starts.
    pub seed_catalog_on_startup: bool,
    /// After a successful [`authorize`](crate::AccessDecisionPoint::authorize)
    /// against an explicitly requested tenant, store it as the principal's
    /// sticky default (default: false).
    pub remember_requested_tenant: bool,
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            seed_catalog_on_startup: true,
            remember_requested_tenant: false,
        }
    }
}
