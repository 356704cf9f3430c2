//! Server-side configuration.
//!
//! Reads `/etc/salesops/<context>.toml` or an explicit path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use sim::model::{ProductCatalog, ProductEntry};

/// Directory searched for bare context names.
const CONTEXT_DIR: &str = "/etc/salesops";

/// Storage section.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for persistent state.
    pub data_dir: String,

    /// SQLite file; defaults to `{data_dir}/data.sqlite`.
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

/// Server configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub storage: StorageConfig,

    /// Product classes and what they imply for SIM handling.
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

impl ServerConfig {
    /// A value containing `/` or `.` is a path; anything else names a
    /// context under `/etc/salesops`.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            Path::new(CONTEXT_DIR).join(format!("{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn catalog(&self) -> ProductCatalog {
        ProductCatalog::new(self.products.iter().cloned())
    }
}
