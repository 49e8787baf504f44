//! Configuration loading and root folder resolution
//!
//! Root folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CATMASH_ROOT`)
//! 3. TOML config file (`root_folder` key)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! compiled defaults are used.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "CATMASH_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "catmash.db";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Folder holding the database (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Interface the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Catalogue document fetched at startup to seed candidates (optional)
    #[serde(default)]
    pub import_url: Option<String>,

    /// SQLite busy timeout in milliseconds
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: default_bind_address(),
            port: default_port(),
            import_url: None,
            busy_timeout_ms: default_busy_timeout_ms(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5780
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse TOML config text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Config file to read: the explicit path, else the platform location if present
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_file(),
        }
    }

    /// Load from an explicit path, or the platform location, falling back to defaults
    ///
    /// Nothing is logged here: the caller usually loads config before the
    /// tracing subscriber exists and reports the [`ConfigSource`] afterwards.
    pub fn load_or_default(explicit: Option<&Path>) -> (Self, ConfigSource) {
        let Some(path) = Self::locate(explicit) else {
            return (Self::default(), ConfigSource::Defaults);
        };

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => (
                Self::default(),
                ConfigSource::Rejected {
                    path,
                    reason: e.to_string(),
                },
            ),
        }
    }
}

/// Where the effective [`TomlConfig`] came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// File found but unreadable or invalid; defaults in use
    Rejected { path: PathBuf, reason: String },
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config file: {}", path.display()),
            ConfigSource::Rejected { path, reason } => {
                warn!("Ignoring config file {}: {}", path.display(), reason)
            }
            ConfigSource::Defaults => info!("No config file found, using compiled defaults"),
        }
    }
}

/// Resolves the root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// `root_folder` from the TOML file (priority 3)
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
            if !path.is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            return path.clone();
        }

        default_root_folder()
    }
}

/// Creates the root folder and locates the database inside it
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            std::fs::create_dir_all(&self.root)?;
            info!("Created root folder: {}", self.root.display());
        }
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }
}

/// Locate the platform config file, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("catmash").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/catmash/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("catmash"))
        .unwrap_or_else(|| PathBuf::from("./catmash_data"))
}
