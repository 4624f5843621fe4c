use std::path::{Path, PathBuf};

use escaperoom_core::{Config, ConfigError};

pub mod config;
pub mod play;

/// The explicit `--config` path, or the default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::default_path(),
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    Config::load_from(&resolve_config_path(explicit)?)
}
