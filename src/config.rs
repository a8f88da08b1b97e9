//! Environment-driven configuration
//!
//! | Variable             | Default                  |
//! |----------------------|--------------------------|
//! | `STAFFPERM_DB`       | `./data/staffperm.mdb`   |
//! | `STAFFPERM_MAP_SIZE` | `1073741824` (1 GiB)     |
//! | `PORT`               | `3000`                   |

use std::path::PathBuf;

use crate::error::{PermError, Result};

pub const DEFAULT_DB_PATH: &str = "./data/staffperm.mdb";
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub map_size: usize,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig { path: path.into(), map_size: DEFAULT_MAP_SIZE }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let path = get("STAFFPERM_DB").unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let map_size = match get("STAFFPERM_MAP_SIZE") {
            Some(v) => v
                .parse()
                .map_err(|_| PermError::Config(format!("STAFFPERM_MAP_SIZE is not a size: {v}")))?,
            None => DEFAULT_MAP_SIZE,
        };
        Ok(StoreConfig { path: path.into(), map_size })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub store: StoreConfig,
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let port = match get("PORT") {
            Some(v) => v.parse().map_err(|_| PermError::Config(format!("PORT is not a port: {v}")))?,
            None => DEFAULT_PORT,
        };
        Ok(ServerConfig { store: StoreConfig::from_lookup(get)?, port })
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
