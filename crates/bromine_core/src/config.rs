//! Runtime configuration.
//!
//! Resolved once at process startup and passed into services and handlers;
//! nothing reads the environment while serving requests.
//!
//! Precedence: built-in defaults < TOML file < `BROMINE_*` environment.

use crate::logging::default_log_level;
use crate::model::cover::{default_palette_entries, CoverImage, CoverKind, CoverPalette};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "BROMINE_CONFIG";
pub const ENV_DB_PATH: &str = "BROMINE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "BROMINE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "BROMINE_LOG_DIR";
pub const ENV_BIND_ADDR: &str = "BROMINE_ADDR";

const DEFAULT_DB_FILE_NAME: &str = "bromine.sqlite3";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BromineConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub bind_addr: String,
    /// Covers offered by the cover picker.
    pub palette: Vec<CoverImage>,
}

impl Default for BromineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            palette: default_palette_entries(),
        }
    }
}

impl BromineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads defaults, then `path` (or `$BROMINE_CONFIG`), then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env_path = std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from);
        let config = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => {
                let source = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Io { path, source })?;
                toml::from_str(&source)?
            }
            None => Self::default(),
        };
        let config = config.with_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Applies `BROMINE_*` overrides fetched through `lookup`.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(value) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            self.log_dir = (!value.trim().is_empty()).then(|| PathBuf::from(value));
        }
        if let Some(value) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = value;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("bind_addr cannot be empty".to_string()));
        }
        if self.db_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("db_path cannot be empty".to_string()));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::Invalid("palette cannot be empty".to_string()));
        }
        for cover in &self.palette {
            if matches!(cover.kind(), CoverKind::None | CoverKind::Unknown) {
                return Err(ConfigError::Invalid(format!(
                    "palette entry `{cover}` is not a color, gradient or image url"
                )));
            }
        }
        Ok(())
    }

    pub fn cover_palette(&self) -> CoverPalette {
        CoverPalette::new(self.palette.clone())
    }
}
