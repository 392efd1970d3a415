//! Application configuration
//!
//! Read from `config.toml` in the platform config directory
//! (`~/.config/vademecum/config.toml` on Linux). Every field has a default so
//! a missing or partial file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Data directory not found")]
    DataDirNotFound,
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Hosted backend used for annotations and comments
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    /// Public (anon) API key sent as `apikey`
    pub anon_key: Option<String>,
    /// Access token of the signed-in user
    pub access_token: Option<String>,
    /// Id of the signed-in user
    pub user_id: Option<String>,
    /// Display name used on comments
    pub user_name: Option<String>,
}

impl BackendConfig {
    /// A remote store can only be used with a URL, a key and a session
    pub fn is_authenticated(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.is_empty())
            && self.anon_key.as_deref().is_some_and(|k| !k.is_empty())
            && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
            && self.user_id.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StudyConfig {
    /// Target used when a daily goal is created without one
    pub daily_goal: u32,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self { daily_goal: 20 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AppConfig {
    /// Overrides the default data directory
    pub data_dir: Option<PathBuf>,
    pub backend: BackendConfig,
    pub study: StudyConfig,
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("vademecum").join("config.toml"))
    }

    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolved data directory: configured value or the platform default
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|p| p.join("vademecum"))
                .ok_or(ConfigError::DataDirNotFound),
        }
    }
}
