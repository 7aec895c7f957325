//! Configuration file discovery and loading

use super::project_config::ProjectConfig;
use crate::error::ModelError;
use crate::result::Result;
use std::path::{Path, PathBuf};

/// Config file names in priority order
pub const CONFIG_FILE_NAMES: [&str; 5] = [
    ".prodcmptrc.toml",
    "prodcmpt.yaml",
    "prodcmpt.yml",
    "prodcmpt.json",
    "prodcmpt.jsonc",
];

/// Configuration loader for discovering and loading config files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Auto-discover a config file by walking upward from `start_path`.
    ///
    /// Returns `None` when the filesystem root is reached without finding one of
    /// [`CONFIG_FILE_NAMES`].
    pub fn auto_discover(start_path: &Path) -> Result<Option<PathBuf>> {
        let mut current = start_path
            .canonicalize()
            .map_err(|e| ModelError::config_error(format!("Invalid path: {e}")))?;

        loop {
            for filename in CONFIG_FILE_NAMES {
                let config_path = current.join(filename);
                if config_path.is_file() {
                    tracing::debug!("Found config: {}", config_path.display());
                    return Ok(Some(config_path));
                }
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    pub fn load_from_file(path: &Path) -> Result<ProjectConfig> {
        ProjectConfig::load(path).map_err(|e| {
            ModelError::config_error(format!(
                "Failed to load config from '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Load the config at `custom_path`, or discover one starting at `start_dir`.
    ///
    /// Returns the configuration together with the directory file patterns are relative to.
    /// Without any config file the defaults apply relative to the start directory.
    pub fn load(custom_path: Option<&Path>, start_dir: Option<&Path>) -> Result<(ProjectConfig, PathBuf)> {
        let search_dir = start_dir.unwrap_or_else(|| Path::new("."));

        let config_path = match custom_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ModelError::config_error(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::auto_discover(search_dir)?,
        };

        match config_path {
            Some(path) => {
                let config = Self::load_from_file(&path)?;
                let root = path
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| search_dir.to_path_buf());
                Ok((config, root))
            }
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok((ProjectConfig::default(), search_dir.to_path_buf()))
            }
        }
    }
}
