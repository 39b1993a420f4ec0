//! `platform.json` manifest of an installed platform.

use crate::error::PlatformError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Manifest file name inside a platform directory.
pub const MANIFEST_FILE: &str = "platform.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformManifest {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub version: String,
    /// Builder command; targets and flags are appended when the platform runs.
    pub builder: Vec<String>,
}

impl PlatformManifest {
    pub fn load(path: &Path) -> Result<Self, PlatformError> {
        let content = fs::read_to_string(path).map_err(|e| PlatformError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let manifest: PlatformManifest =
            serde_json::from_str(&content).map_err(|e| PlatformError::Manifest {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if manifest.builder.is_empty() {
            return Err(PlatformError::Manifest {
                path: path.to_path_buf(),
                reason: "`builder` must name a command".to_string(),
            });
        }
        Ok(manifest)
    }
}
