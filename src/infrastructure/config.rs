//! Configuration management

use crate::error::{AnnotaskError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "ANNOTASK_CONFIG";

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "annotask.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Refuse documents whose root element does not name the task
    pub strict_task_name: bool,
    /// Write the denormalized `text` attribute on extent tags
    pub write_text_attributes: bool,
    /// Extension of annotated documents when scanning directories
    pub document_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            strict_task_name: false,
            write_text_attributes: true,
            document_extension: "xml".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AnnotaskError::Config(format!("config file '{}' not found", path.display()))
            } else {
                AnnotaskError::Io(e)
            }
        })?;

        toml::from_str(&contents).map_err(|e| {
            AnnotaskError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save config as TOML, creating parent directories as needed
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| AnnotaskError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Resolve the effective config.
    ///
    /// An explicit path wins, then ANNOTASK_CONFIG, then `annotask.toml` in
    /// the current directory; with none of them the defaults apply.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        Self::discover_in(&current_dir, explicit)
    }

    /// Same as [`Config::discover`] with `dir` standing in for the current
    /// directory
    pub fn discover_in(dir: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::debug!("Using config from --config: {}", path.display());
            return Self::load_from_path(path);
        }

        if let Some(value) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(value);
            if !path.is_file() {
                return Err(AnnotaskError::Config(format!(
                    "{} is set to '{}' but no such file exists. \
                    Point it at a config file or unset {}.",
                    CONFIG_ENV,
                    path.display(),
                    CONFIG_ENV
                )));
            }
            log::debug!("Using config from {}: {}", CONFIG_ENV, path.display());
            return Self::load_from_path(&path);
        }

        let local = dir.join(CONFIG_FILE);
        if local.is_file() {
            log::debug!("Using config from {}", local.display());
            return Self::load_from_path(&local);
        }

        Ok(Config::default())
    }
}
