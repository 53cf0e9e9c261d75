use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::db::DbKind;
use crate::error::{CatalogError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub kind: DbKind,

    pub host: String,

    #[serde(default)]
    pub port: Option<u16>,

    pub database: String,

    pub user: String,

    #[serde(default)]
    pub password: String,
}

impl DatabaseConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or_else(|| self.kind.default_port())
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let db = &self.database;
        if db.host.is_empty() {
            return Err(CatalogError::Configuration("database.host is required".into()));
        }
        if db.database.is_empty() {
            return Err(CatalogError::Configuration(
                "database.database is required".into(),
            ));
        }
        if db.user.is_empty() {
            return Err(CatalogError::Configuration("database.user is required".into()));
        }
        if let Some(0) = db.port {
            return Err(CatalogError::Configuration(
                "database.port must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
