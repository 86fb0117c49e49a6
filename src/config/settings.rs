//! TOML-based configuration for the engine.
//!
//! Supports a config file (eds.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [storage]
//! foreign_keys = true
//! busy_timeout_ms = 5000
//! attach_view = true
//! view_file_suffix = "View"
//! # explicit view store, overrides the suffix rule
//! view_file = "${RESULTS}/study.cdResultView"
//!
//! [query]
//! memoize = true
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub storage: StorageSettings,
    pub query: QuerySettings,
}

/// How result files are opened.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Run `PRAGMA foreign_keys = ON` after connecting.
    pub foreign_keys: bool,

    /// How long a statement waits on a locked file.
    pub busy_timeout_ms: u64,

    /// Attach the view store when it exists.
    pub attach_view: bool,

    /// View store path is the result path with this appended.
    pub view_file_suffix: String,

    /// Explicit view store path (supports ${ENV_VAR} expansion).
    pub view_file: Option<String>,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            busy_timeout_ms: 5000,
            attach_view: true,
            view_file_suffix: "View".to_string(),
            view_file: None,
        }
    }
}

impl StorageSettings {
    /// Path of the view store belonging to `result_path`.
    pub fn view_path(&self, result_path: &Path) -> Result<PathBuf, SettingsError> {
        if let Some(view_file) = &self.view_file {
            return Ok(PathBuf::from(expand_env_vars(view_file)?));
        }
        let suffix = expand_env_vars(&self.view_file_suffix)?;
        let mut path = result_path.as_os_str().to_owned();
        path.push(suffix);
        Ok(PathBuf::from(path))
    }
}

/// Filter compilation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Packrat memoization in the grammar engine.
    pub memoize: bool,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self { memoize: true }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        if settings.storage.view_file_suffix.is_empty() && settings.storage.view_file.is_none() {
            return Err(SettingsError::InvalidConfig(
                "storage.view_file_suffix must not be empty".to_string(),
            ));
        }
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `EDS_CONFIG`
    /// 2. `./eds.toml`
    /// 3. `~/.config/eds/eds.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("EDS_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("eds.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("eds").join("eds.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let braced = chars.next_if_eq(&'{').is_some();
        let mut var_name = String::new();
        if braced {
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // lone $
                result.push('$');
                continue;
            }
        }

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
