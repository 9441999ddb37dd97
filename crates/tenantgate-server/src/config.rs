//! Server configuration.
//!
//! # Load order
//!
//! 1. Compiled defaults
//! 2. TOML file named by `TENANTGATE_CONFIG` (skipped when unset)
//! 3. `TENANTGATE_*` environment variables
//!
//! Each layer overrides the previous.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tenantgate_authz::AuthzConfig;
use tenantgate_db::DbConfig;
use thiserror::Error;
use tracing::debug;

/// Environment variable naming the optional TOML config file.
pub const CONFIG_PATH_VAR: &str = "TENANTGATE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub authz: AuthzConfig,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            authz: AuthzConfig::default(),
            log_filter: "tenantgate=info".into(),
        }
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load with `lookup` standing in for the environment.
    pub fn load_with<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_PATH_VAR) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env(&lookup)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&raw).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn apply_env<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let strings = [
            ("TENANTGATE_DB_URL", &mut self.db.url),
            ("TENANTGATE_DB_NAMESPACE", &mut self.db.namespace),
            ("TENANTGATE_DB_DATABASE", &mut self.db.database),
            ("TENANTGATE_DB_USERNAME", &mut self.db.username),
            ("TENANTGATE_DB_PASSWORD", &mut self.db.password),
            ("TENANTGATE_LOG", &mut self.log_filter),
        ];
        for (name, field) in strings {
            if let Some(value) = lookup(name) {
                *field = value;
            }
        }

        let flags = [
            (
                "TENANTGATE_SEED_CATALOG",
                &mut self.authz.seed_catalog_on_startup,
            ),
            (
                "TENANTGATE_REMEMBER_REQUESTED_TENANT",
                &mut self.authz.remember_requested_tenant,
            ),
        ];
        for (name, field) in flags {
            if let Some(value) = lookup(name) {
                *field = parse_bool(&value).ok_or_else(|| ConfigError::InvalidEnvVar {
                    name: name.into(),
                    message: format!("expected bool, got {value:?}"),
                })?;
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
