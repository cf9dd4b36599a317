//! Client options
//!
//! Options are read once, from a JSON file, when the client is built. Cache
//! lifetimes accept either a boolean shorthand or an explicit number of
//! milliseconds:
//!
//! ```json
//! {
//!   "client_id": "abc123",
//!   "suppress_rejections": false,
//!   "ttl": { "channels": true },
//!   "update": { "channels": 600000 }
//! }
//! ```

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::cache::{CacheConfig, Expiry};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";

/// Errors that can occur when loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON for the options
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No client ID was configured
    #[error("a client ID is required")]
    MissingClientId,
}

/// A cache lifetime as written in the options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheSetting {
    /// `true` selects the default duration, `false` disables
    Enabled(bool),
    /// Explicit duration in milliseconds
    Millis(u64),
}

impl CacheSetting {
    /// Resolves the setting, falling back to `default` when unset or `true`
    pub fn resolve(setting: Option<CacheSetting>, default: Expiry) -> Expiry {
        match setting {
            None | Some(CacheSetting::Enabled(true)) => default,
            Some(CacheSetting::Enabled(false)) => Expiry::Never,
            Some(CacheSetting::Millis(ms)) => Expiry::After(Duration::from_millis(ms)),
        }
    }
}

/// Per-entity-kind cache settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub channels: Option<CacheSetting>,
}

/// Process-wide client options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Application client ID sent with every request
    pub client_id: String,
    /// API root, without a trailing slash
    pub base_url: String,
    /// Return `None` instead of an error when a request fails or is aborted
    pub suppress_rejections: bool,
    /// Age at which cached entities are evicted
    pub ttl: CacheSettings,
    /// Period between cache sweeps
    pub update: CacheSettings,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            suppress_rejections: false,
            ttl: CacheSettings::default(),
            update: CacheSettings::default(),
        }
    }
}

impl ClientOptions {
    /// Cache lifetimes for channels
    ///
    /// The ttl defaults to one day and the sweep interval to one hour. A zero
    /// ttl expires entries on the next sweep; a zero sweep interval disables
    /// sweeping.
    pub fn channel_cache_config(&self) -> CacheConfig {
        let update_interval = match CacheSetting::resolve(self.update.channels, Expiry::HOUR) {
            Expiry::After(every) if every.is_zero() => Expiry::Never,
            other => other,
        };
        CacheConfig {
            ttl: CacheSetting::resolve(self.ttl.channels, Expiry::DAY),
            update_interval,
        }
    }

    /// Checks the options that have no usable default
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingClientId);
        }
        Ok(())
    }

    /// Reads options from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads options from `explicit`, else the default config file, else defaults
    ///
    /// An explicit path must exist; a missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

/// XDG-compliant config file location
///
/// Uses `~/.config/helix-channels/config.json` on Linux, or the equivalent
/// path on other platforms. Returns `None` if no home directory is known.
pub fn default_config_path() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "helix-channels")?;
    Some(project_dirs.config_dir().join("config.json"))
}
