use tenantgate_core::error::GateError;
use tenantgate_db::DbError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("failed to wait for shutdown signal: {0}")]
    Signal(#[from] std::io::Error),
}
