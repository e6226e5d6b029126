//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from (highest priority first):
//! 1. Command-line argument
//! 2. Environment variable (`RESEPI_ROOT_FOLDER`, then `RESEPI_ROOT`)
//! 3. TOML config file (`~/.config/resepichenom/<module>.toml`)
//! 4. OS-dependent compiled default
//!
//! Runtime settings live in the database `settings` table (see
//! [`crate::db::settings`]). A missing or broken TOML file is logged and
//! ignored; it never stops startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "resepichenom.db";

/// Media directory name inside the root folder
pub const MEDIA_DIR_NAME: &str = "media";

/// Default HTTP port for resepi-web
pub const DEFAULT_PORT: u16 = 5780;

/// Compiled-in defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub bind: String,
    pub port: u16,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was compiled for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            log_file: None,
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("resepichenom"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/resepichenom"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("resepichenom"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/resepichenom"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("resepichenom"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\resepichenom"))
    } else {
        PathBuf::from("./resepichenom_data")
    }
}

/// Logging section of the TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional so that an empty file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub bind: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Absolute base URL used when building links outside a request
    #[serde(default)]
    pub public_base_url: Option<String>,

    #[serde(default)]
    pub llm_api_key: Option<String>,

    #[serde(default)]
    pub llm_base_url: Option<String>,

    #[serde(default)]
    pub llm_model: Option<String>,
}

/// Path of the TOML file for a module, e.g. `~/.config/resepichenom/web.toml`
pub fn config_file_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("resepichenom").join(format!("{}.toml", module_name)))
}

/// Load the module TOML file, falling back to defaults on any problem
pub fn load_toml_config(module_name: &str) -> TomlConfig {
    match config_file_path(module_name) {
        Some(path) => load_toml_config_from(&path),
        None => {
            warn!("Could not determine config directory; using defaults");
            TomlConfig::default()
        }
    }
}

/// Load a TOML file from an explicit path, falling back to defaults
pub fn load_toml_config_from(path: &Path) -> TomlConfig {
    if !path.exists() {
        debug!("Config file not found: {} (using defaults)", path.display());
        return TomlConfig::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("Failed to read config file {}: {} (using defaults)", path.display(), e);
            return TomlConfig::default();
        }
    };

    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => {
            info!("Loaded config file: {}", path.display());
            config
        }
        Err(e) => {
            warn!("Failed to parse config file {}: {} (using defaults)", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Write a TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Resolves the root folder for a module
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
        }
    }

    /// Set the command-line override (highest priority)
    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    /// Resolve the root folder. Never fails; falls back to compiled default.
    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        for var in ["RESEPI_ROOT_FOLDER", "RESEPI_ROOT"] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    info!("Root folder from {}: {}", var, path);
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(root) = load_toml_config(&self.module_name).root_folder {
            info!("Root folder from TOML config: {}", root.display());
            return root;
        }

        let root = CompiledDefaults::for_current_platform().root_folder;
        info!("Root folder from compiled default: {}", root.display());
        root
    }
}

/// Creates the root folder layout and hands out well-known paths
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

    /// Create root and media directories (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.media_path())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }

    pub fn media_path(&self) -> PathBuf {
        self.root_folder.join(MEDIA_DIR_NAME)
    }
}
