//! YAML configuration loading helpers.
//!
//! The configuration structs themselves live next to the code they configure;
//! this module only knows how to find and read a YAML file into any
//! deserializable type.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, SettleError};
use crate::logging::settle_home;

/// Default configuration file name inside `~/.settle/`.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Get the default configuration file path.
///
/// Returns `~/.settle/config.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(settle_home()?.join(CONFIG_FILE_NAME))
}

/// Read and deserialize a YAML file.
///
/// A missing file is [`SettleError::ConfigNotFound`]; a file that does not
/// deserialize into `T` is [`SettleError::ConfigInvalid`].
pub fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SettleError::config_not_found_with_source(path, e)
        } else {
            SettleError::io("reading configuration", path, e)
        }
    })?;

    debug!(path = %path.display(), bytes = text.len(), "loaded configuration file");

    parse_yaml(&text, path)
}

/// Deserialize YAML text, attributing errors to `path`.
pub fn parse_yaml<T: DeserializeOwned>(text: &str, path: &Path) -> Result<T> {
    // An empty file means "all defaults"; serde_yaml rejects empty documents.
    let text = if text.trim().is_empty() { "{}" } else { text };

    serde_yaml::from_str(text).map_err(|e| SettleError::ConfigInvalid {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
