//! TenantGate Server: application entry point.
//!
//! Migrates the control-plane database, seeds the permission catalog and
//! attaches every provisioned tenant store, then holds the wired engine
//! until interrupted.

use tenantgate_server::{Gate, ServerConfig, ServerError};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config = ServerConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .json()
        .init();

    info!("Starting TenantGate server...");

    let gate = Gate::connect(&config).await?;
    let attached = gate.warm_stores().await?;
    info!(
        attached,
        remember_requested_tenant = config.authz.remember_requested_tenant,
        "Access decision point ready"
    );

    tokio::signal::ctrl_c().await?;

    info!(
        attached_stores = gate.attached_stores(),
        "TenantGate server stopped."
    );
    Ok(())
}
