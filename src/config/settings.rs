//! Tool settings persisted as JSON.
//!
//! Settings live at `~/.config/pio-run/settings.json` and describe how the
//! external collaborators (platform installer, device monitor) are invoked.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the platform identifier in `installer_command`.
pub const PLATFORM_PLACEHOLDER: &str = "{platform}";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Command that installs a development platform. `{platform}` is substituted.
    pub installer_command: Vec<String>,
    /// Command that opens the serial device monitor.
    pub monitor_command: Vec<String>,
    /// Emit telemetry events for environment runs.
    pub telemetry_enabled: bool,
    /// Force colour on or off; `None` means detect from the terminal.
    pub color: Option<bool>,
    /// Persist log records under the cache directory.
    pub log_to_file: bool,
}

impl Default for ToolSettings {
    fn default() -> Self {
        ToolSettings {
            installer_command: vec![
                "pio".to_string(),
                "platform".to_string(),
                "install".to_string(),
                PLATFORM_PLACEHOLDER.to_string(),
            ],
            monitor_command: vec![
                "pio".to_string(),
                "device".to_string(),
                "monitor".to_string(),
            ],
            telemetry_enabled: true,
            color: None,
            log_to_file: true,
        }
    }
}

/// Get the global settings path: ~/.config/pio-run/settings.json
pub fn get_global_settings_path() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or_else(|| {
        ConfigError::FileNotFound("Cannot determine home directory".to_string())
    })?;
    Ok(home.join(".config/pio-run").join("settings.json"))
}

/// Load settings; a missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<ToolSettings, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(ToolSettings::default());
        }
        Err(e) => return Err(ConfigError::IoError(e)),
    };

    let settings: ToolSettings = serde_json::from_str(&content)?;
    Ok(settings)
}

/// Save settings as pretty JSON, creating parent directories.
pub fn save_settings(settings: &ToolSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json_content = serde_json::to_string_pretty(settings)?;
    fs::write(path, json_content)?;
    Ok(())
}
