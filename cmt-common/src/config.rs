//! Configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line overrides (highest priority)
//! 2. Environment variables (`CMT_DATABASE_PATH`, `CMT_CACHE_DIR`, `CMT_DETECTOR`)
//! 3. TOML config file
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is not an error: a warning is logged and the
//! compiled defaults are used.

use crate::{DetectorGeneration, Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ENV_DATABASE_PATH: &str = "CMT_DATABASE_PATH";
pub const ENV_CACHE_DIR: &str = "CMT_CACHE_DIR";
pub const ENV_DETECTOR: &str = "CMT_DETECTOR";

/// Default cache directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = "./resource_cache";

/// Version label that is cached on disk unless configured otherwise
pub const DEFAULT_CACHEABLE_VERSION: &str = "ONLINE";

/// Configuration as written in the TOML file; every field is optional
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to the SQLite mirror of the corrections database
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Detector generation ("xenonnt" or "xenon1t")
    #[serde(default)]
    pub detector: Option<DetectorGeneration>,

    /// Directory for cached gain arrays
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Versions whose gain arrays may be cached on disk
    #[serde(default)]
    pub cacheable_versions: Option<Vec<String>>,

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

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when nothing else supplies a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub detector: DetectorGeneration,
    pub cache_dir: PathBuf,
    pub cacheable_versions: Vec<String>,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            database_path: default_database_path(),
            detector: DetectorGeneration::default(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cacheable_versions: vec![DEFAULT_CACHEABLE_VERSION.to_string()],
            log_level: default_log_level(),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub detector: Option<DetectorGeneration>,
}

/// Fully resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub detector: DetectorGeneration,
    pub cache_dir: PathBuf,
    pub cacheable_versions: Vec<String>,
    pub log_level: String,
}

impl Config {
    /// Resolve configuration from overrides, environment, TOML and defaults
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - an explicitly requested config file cannot be read or parsed
    /// - `CMT_DETECTOR` holds an unknown generation
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match &overrides.config_file {
            Some(path) => read_toml_config(path)?,
            None => match locate_config_file() {
                Some(path) => read_toml_config(&path)?,
                None => {
                    warn!("No config file found, using compiled defaults");
                    TomlConfig::default()
                }
            },
        };

        Self::resolve(toml_config, overrides)
    }

    /// Apply the priority order to an already parsed TOML config
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        let defaults = CompiledDefaults::for_current_platform();

        let database_path = overrides
            .database_path
            .or_else(|| env_path(ENV_DATABASE_PATH))
            .or(toml_config.database_path)
            .unwrap_or(defaults.database_path);

        let cache_dir = overrides
            .cache_dir
            .or_else(|| env_path(ENV_CACHE_DIR))
            .or(toml_config.cache_dir)
            .unwrap_or(defaults.cache_dir);

        let env_detector = match std::env::var(ENV_DETECTOR) {
            Ok(value) => Some(value.parse::<DetectorGeneration>()?),
            Err(_) => None,
        };
        let detector = overrides
            .detector
            .or(env_detector)
            .or(toml_config.detector)
            .unwrap_or(defaults.detector);

        let cacheable_versions = toml_config
            .cacheable_versions
            .unwrap_or(defaults.cacheable_versions);

        info!(
            database = %database_path.display(),
            cache_dir = %cache_dir.display(),
            detector = %detector,
            "Resolved configuration"
        );

        Ok(Config {
            database_path,
            detector,
            cache_dir,
            cacheable_versions,
            log_level: toml_config.logging.level,
        })
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Find the default config file: user config dir first, then /etc
fn locate_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("cmt").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/cmt/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// OS-dependent default location of the corrections mirror
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("cmt").join("corrections.db"))
        .unwrap_or_else(|| PathBuf::from("./corrections.db"))
}
