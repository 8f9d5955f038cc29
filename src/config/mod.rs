mod file_config;

pub use file_config::FileConfig;

use crate::store::StoreOptions;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Image file name used when `db_path` points at a directory.
pub const DEFAULT_IMAGE_FILE_NAME: &str = "library.db";

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub snapshot_interval_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            snapshot_interval_secs: 10,
            shutdown_grace_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub snapshot_interval_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let mut db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;

        if db_path.is_dir() {
            db_path = db_path.join(DEFAULT_IMAGE_FILE_NAME);
        }
        match db_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
                bail!("Database directory does not exist: {:?}", parent);
            }
            _ => {}
        }

        let snapshot_interval_secs = file
            .snapshot_interval_secs
            .unwrap_or(cli.snapshot_interval_secs);
        if snapshot_interval_secs == 0 {
            bail!("snapshot_interval_secs must be greater than 0");
        }

        let shutdown_grace_secs = file
            .shutdown_grace_secs
            .unwrap_or(cli.shutdown_grace_secs);
        if shutdown_grace_secs == 0 {
            bail!("shutdown_grace_secs must be greater than 0");
        }

        Ok(Self {
            db_path,
            snapshot_interval_secs,
            shutdown_grace_secs,
        })
    }

    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            image_path: self.db_path.clone(),
            snapshot_interval: Some(self.snapshot_interval()),
        }
    }
}
