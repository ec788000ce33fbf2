use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Root configuration, loaded from `~/.config/refscope/config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RefscopeConfig {
    pub database: DatabaseConfig,
    pub registries: RegistryConfig,
    pub reconcile: ReconcileConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Explicit database file. Discovered from the Mendeley install when unset.
    pub path: Option<PathBuf>,
    pub document_type: String,
    pub backup_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub idconv_url: String,
    pub eutils_url: String,
    pub tool: String,
    pub email: Option<String>,
    pub eutils_interval_ms: u64,
    pub max_retries: u32,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Replace existing column values and annotation tags.
    pub overwrite: bool,
    pub wrapper_marker: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            document_type: "JournalArticle".to_string(),
            backup_dir: PathBuf::from("backups"),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idconv_url: "https://www.ncbi.nlm.nih.gov/pmc/utils/idconv/v1.0/".to_string(),
            eutils_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string(),
            tool: "refscope".to_string(),
            email: None,
            // NCBI allows three requests per second without an API key.
            eutils_interval_ms: 334,
            max_retries: 2,
            user_agent: format!("refscope/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            wrapper_marker: "<m:note>".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl RefscopeConfig {
    /// Standard config file path: `~/.config/refscope/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("REFSCOPE_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("refscope")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

impl RegistryConfig {
    pub fn eutils_interval(&self) -> Duration {
        Duration::from_millis(self.eutils_interval_ms)
    }
}
