//! Front-end configuration loaded from TOML.
//!
//! Looked up at `$SPLITDB_CONFIG`, then `~/.config/splitdb/config.toml`.
//! A missing file means defaults; a malformed one is an error.

use crate::error::FrontendError;
use crate::theme::Theme;
use crate::ui::layout::LayoutConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "SPLITDB_CONFIG";

/// Prompt strings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Shown while the first word can still become a command
    pub command: String,
    /// Shown for anything else
    pub expression: String,
    /// Continuation lines of multiline input
    pub continuation: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            command: "(pdb) ".to_string(),
            expression: "  >>> ".to_string(),
            continuation: "  ... ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    pub layout: LayoutConfig,
    /// Style overrides keyed by style-tag name, e.g. `break = "bg:#ff4444"`
    pub theme: BTreeMap<String, String>,
    pub prompt: PromptConfig,
}

impl FrontendConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, FrontendError> {
        toml::from_str(toml_str)
            .map_err(|e| FrontendError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        home::home_dir().map(|d| d.join(".config/splitdb/config.toml"))
    }

    /// Load `path`; a file that does not exist yields defaults
    pub fn load_from(path: &Path) -> Result<Self, FrontendError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| FrontendError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn load() -> Result<Self, FrontendError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Default theme with this config's overrides applied
    pub fn theme(&self) -> Result<Theme, FrontendError> {
        Theme::default().with_overrides(&self.theme)
    }
}
