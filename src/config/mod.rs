//! Configuration module.
//!
//! Handles the settings file and environment variable expansion.

mod settings;

pub use settings::{expand_env_vars, QuerySettings, Settings, SettingsError, StorageSettings};
