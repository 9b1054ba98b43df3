//! Steprun configuration
//!
//! Runtime settings are plain serde structs with per-field defaults, stored
//! as RON. A missing file is not an error: defaults apply.
//!
//! # Usage
//!
//! ```rust
//! use steprun::util::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_ron_str("(name_prefix: \"Job\")").unwrap();
//! assert_eq!(config.name_prefix, "Job");
//! assert!(!config.default_auto_destroy);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Settings of a [`Runtime`](crate::runtime::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Prefix of auto-generated task names (`"{prefix}({id})"`)
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
    /// Auto-destroy flag given to tasks that do not set one
    #[serde(default)]
    pub default_auto_destroy: bool,
    /// Log every routine step at DEBUG level
    #[serde(default)]
    pub trace_steps: bool,
}

fn default_name_prefix() -> String {
    "Task".to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            default_auto_destroy: false,
            trace_steps: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        ron::from_str(source).map_err(ConfigError::Parse)
    }

    /// Render as pretty RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::Serialize)
    }
}

/// Load runtime configuration from `path`.
/// Returns default config if the file doesn't exist
pub fn load_config(path: &Path) -> Result<RuntimeConfig, ConfigError> {
    if !path.exists() {
        return Ok(RuntimeConfig::default());
    }

    let content = fs::read_to_string(path)?;
    RuntimeConfig::from_ron_str(&content)
}

/// Save runtime configuration to `path`, creating parent directories.
pub fn save_config(
    path: &Path,
    config: &RuntimeConfig,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }

    fs::write(path, config.to_ron_string()?)?;
    Ok(())
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(ron::error::SpannedError),

    #[error("Config serialize error: {0}")]
    Serialize(ron::Error),
}
