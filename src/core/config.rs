//! User configuration
//!
//! Layered, lowest to highest priority:
//! 1. Built-in defaults
//! 2. `config.yaml` in the platform config directory
//! 3. `TALLY_USER`, `TALLY_DATA_DIR`, `TALLY_SYNC_DIR` environment variables
//! 4. Command-line flags (applied by the CLI after loading)

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::core::columns::ColumnMap;
use crate::core::number::NumberPolicy;

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "config.yaml";

/// Stock export picked up automatically when nothing has been loaded yet
pub const DEFAULT_SOURCE: &str = "estoque.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yml::Error,
    },
}

/// Resolved configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name recorded on every count made from this device
    pub user: Option<String>,

    /// Directory holding the session database
    pub data_dir: Option<PathBuf>,

    /// Shared directory used to exchange counts with other devices
    pub sync_dir: Option<PathBuf>,

    /// Stock export loaded on first use (relative to the working directory)
    pub default_source: Option<PathBuf>,

    /// Header names of the stock export
    pub columns: ColumnMap,

    /// Reject malformed numeric cells instead of reading them as 0
    pub strict_numbers: bool,
}

impl Config {
    /// Load configuration from the default location plus environment
    ///
    /// A missing file means defaults; an unreadable one is logged and
    /// ignored.
    pub fn load() -> Self {
        let mut config = match Self::default_path() {
            Some(path) => Self::load_file(&path).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring config file");
                Self::default()
            }),
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Path of the user config file, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load a specific config file; a missing file yields defaults
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overlay environment variables (the lookup is injectable for tests)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        if let Some(user) = non_empty("TALLY_USER") {
            self.user = Some(user);
        }
        if let Some(dir) = non_empty("TALLY_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty("TALLY_SYNC_DIR") {
            self.sync_dir = Some(PathBuf::from(dir));
        }
    }

    /// The counter name: configured user, else the OS user, else "anon"
    pub fn user_name(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "anon".to_string())
    }

    /// Directory for the session database
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| project_dirs().map(|d| d.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(".tally"))
    }

    /// Source tried when no catalog has been loaded yet
    pub fn default_source(&self) -> PathBuf {
        self.default_source
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE))
    }

    /// Number parsing policy for catalog loads
    pub fn number_policy(&self) -> NumberPolicy {
        if self.strict_numbers {
            NumberPolicy::Strict
        } else {
            NumberPolicy::Tolerant
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "tally")
}
