// src/core/paths.rs

use crate::constants::{CONFIG_DIR_ENV, CONFIG_DIR_NAME, CONFIG_FILENAME};
use lazy_static::lazy_static;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

lazy_static! {
    static ref ATLASMAN_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not expand '{template}' from {var}: {message}")]
    Expansion {
        template: String,
        var: &'static str,
        message: String,
    },
}

/// Returns the atlasman configuration directory (`~/.config/atlas-man` on Linux).
///
/// `ATLASMAN_CONFIG_DIR` overrides the location; `~` and `$VARS` in it are expanded.
/// The directory is not created here: the config store creates it on first save.
///
/// The first call computes the path and caches it for the rest of the process.
pub fn get_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = ATLASMAN_CONFIG_DIR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = match env::var(CONFIG_DIR_ENV) {
        Ok(template) if !template.trim().is_empty() => expand_dir_template(&template)?,
        _ => dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join(CONFIG_DIR_NAME),
    };

    log::debug!("Using config directory {}", config_path.display());
    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Returns the path to the configuration document.
pub fn get_config_file_path() -> Result<PathBuf, PathError> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILENAME))
}

/// Expands home directory and environment variables in a directory template.
pub fn expand_dir_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template.trim()).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        var: CONFIG_DIR_ENV,
        message: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
