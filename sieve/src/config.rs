//! Configuration for sieve.
//!
//! SIEVE_ROOT resolution order:
//! 1. Explicit path passed to Config::with_root()
//! 2. SIEVE_ROOT environment variable
//! 3. Default: ~/.local/share/kwsieve

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable that overrides the configured index namespace.
pub const SIEVE_INDEX_PREFIX_VAR: &str = "SIEVE_INDEX_PREFIX";

/// Sieve configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for all sieve data.
    pub sieve_root: PathBuf,

    /// Namespace prepended to every inverted-index key.
    #[serde(default = "default_index_prefix")]
    pub index_prefix: String,

    /// Page size used when a listing does not ask for one.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Upper bound on any requested page size.
    #[serde(default = "default_page_limit")]
    pub max_page_limit: usize,

    /// Resolve terms of one query on separate threads.
    #[serde(default = "default_parallel_resolve")]
    pub parallel_resolve: bool,

    /// Actor recorded in audit rows.
    #[serde(default = "default_actor")]
    pub actor: String,
}

fn default_index_prefix() -> String {
    "queryindex_".to_string()
}

fn default_page_limit() -> usize {
    500
}

fn default_parallel_resolve() -> bool {
    true
}

fn default_actor() -> String {
    // Deterministic: username@hostname
    let username = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let hostname = gethostname::gethostname()
        .to_string_lossy()
        .to_string();
    format!("{}@{}", username, hostname)
}

impl Config {
    /// Create a new config with the given SIEVE_ROOT.
    pub fn with_root(sieve_root: impl Into<PathBuf>) -> Self {
        Self {
            sieve_root: sieve_root.into(),
            index_prefix: default_index_prefix(),
            page_limit: default_page_limit(),
            max_page_limit: default_page_limit(),
            parallel_resolve: default_parallel_resolve(),
            actor: default_actor(),
        }
    }

    /// Create a config using default SIEVE_ROOT resolution.
    pub fn default_location() -> Result<Self> {
        let sieve_root = resolve_sieve_root()?;
        Ok(Self::with_root(sieve_root))
    }

    /// Load config from SIEVE_ROOT/config.toml, or create default.
    pub fn load() -> Result<Self> {
        let sieve_root = resolve_sieve_root()?;
        Self::load_from(&sieve_root)
    }

    /// Load config from a specific SIEVE_ROOT.
    pub fn load_from(sieve_root: &Path) -> Result<Self> {
        let config_path = sieve_root.join("config.toml");

        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
            // Ensure sieve_root matches the actual location
            config.sieve_root = sieve_root.to_path_buf();
            config
        } else {
            Self::with_root(sieve_root)
        };

        if let Ok(prefix) = std::env::var(SIEVE_INDEX_PREFIX_VAR) {
            config.index_prefix = prefix;
        }

        config.validate()?;
        Ok(config)
    }

    /// Save config to SIEVE_ROOT/config.toml.
    pub fn save(&self) -> Result<()> {
        let config_path = self.sieve_root.join("config.toml");
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(config_path, contents)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.page_limit == 0 || self.max_page_limit == 0 {
            return Err(Error::Config("page limits must be positive".to_string()));
        }
        Ok(())
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_limit)
            .clamp(1, self.max_page_limit)
    }

    /// Path to the DuckDB database file.
    pub fn db_path(&self) -> PathBuf {
        self.sieve_root.join("db/sieve.duckdb")
    }
}

/// Resolve SIEVE_ROOT using the standard resolution order.
fn resolve_sieve_root() -> Result<PathBuf> {
    // 1. Environment variable
    if let Ok(path) = std::env::var("SIEVE_ROOT") {
        return Ok(PathBuf::from(path));
    }

    // 2. XDG data directory (via directories crate)
    if let Some(proj_dirs) = ProjectDirs::from("", "", "kwsieve") {
        return Ok(proj_dirs.data_dir().to_path_buf());
    }

    // 3. Fallback to ~/.local/share/kwsieve
    let home = std::env::var("HOME")
        .map_err(|_| Error::Config("Could not determine home directory".to_string()))?;
    Ok(PathBuf::from(home).join(".local/share/kwsieve"))
}
