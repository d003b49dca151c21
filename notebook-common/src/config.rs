//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `NOTEBOOK_ROOT_FOLDER`, then `NOTEBOOK_ROOT` environment variable
//! 3. TOML config file `root_folder` key
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup; it is logged
//! and the compiled defaults are used instead.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default HTTP bind address
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:3000";

/// Default number of pooled store connections
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "notebook.db";

/// Upload directory name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Environment variable carrying the AI gateway key
pub const GATEWAY_API_KEY_ENV: &str = "NOTEBOOK_GATEWAY_API_KEY";

/// `[logging]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub level: Option<String>,
}

/// `[gateway]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct GatewayConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

/// Contents of a module TOML config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub db_pool_size: Option<u32>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn bind_address(&self) -> String {
        self.bind_address
            .clone()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string())
    }

    /// Pool size, rejecting zero
    pub fn pool_size(&self) -> Result<u32> {
        match self.db_pool_size {
            Some(0) => Err(Error::Config("db_pool_size must be at least 1".to_string())),
            Some(n) => Ok(n),
            None => Ok(DEFAULT_POOL_SIZE),
        }
    }

    pub fn log_level(&self) -> String {
        self.logging
            .level
            .clone()
            .unwrap_or_else(|| CompiledDefaults::for_current_platform().log_level)
    }

    /// Gateway key: environment variable wins over the TOML value
    pub fn gateway_api_key(&self) -> Option<String> {
        std::env::var(GATEWAY_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.gateway.api_key.clone().filter(|k| !k.trim().is_empty()))
    }
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("notebook"))
            .unwrap_or_else(|| PathBuf::from("./notebook_data"));

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Resolves the root folder for one service module
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_override: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_override: None,
            config_path: None,
        }
    }

    /// Root folder given on the command line
    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    /// Explicit TOML config path instead of the per-module default
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// `<config dir>/notebook/<module>.toml` unless overridden
    pub fn config_file_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            return Some(path.clone());
        }
        dirs::config_dir().map(|d| d.join("notebook").join(format!("{}.toml", self.module_name)))
    }

    /// Load the module TOML config, falling back to defaults
    pub fn load_toml(&self) -> TomlConfig {
        let Some(path) = self.config_file_path() else {
            warn!("Could not determine config directory, using defaults");
            return TomlConfig::default();
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return TomlConfig::default();
        }

        match TomlConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                TomlConfig::default()
            }
        }
    }

    pub fn resolve(&self) -> PathBuf {
        self.resolve_with(&self.load_toml())
    }

    /// Resolve using an already-loaded TOML config
    pub fn resolve_with(&self, toml_config: &TomlConfig) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_override {
            return path.clone();
        }

        // Priority 2: Environment variables
        for var in ["NOTEBOOK_ROOT_FOLDER", "NOTEBOOK_ROOT"] {
            if let Ok(path) = std::env::var(var) {
                if !path.is_empty() {
                    return PathBuf::from(path);
                }
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &toml_config.root_folder {
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout and names the files inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create the root and uploads directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.root_folder.join(UPLOADS_DIR)
    }
}
