//! Factory resolving platforms from the local platforms directory.

use super::command::CommandPlatform;
use super::manifest::{PlatformManifest, MANIFEST_FILE};
use super::{Platform, PlatformFactory};
use crate::error::PlatformError;
use std::path::{Path, PathBuf};

/// Looks platforms up under `<platforms_dir>/<name>/platform.json`.
///
/// Accepted identifiers:
/// - `name`: any installed version
/// - `name@version`: the installed manifest must carry exactly that version
/// - a directory path containing a `platform.json`
#[derive(Debug, Clone)]
pub struct LocalPlatformFactory {
    platforms_dir: PathBuf,
}

impl LocalPlatformFactory {
    pub fn new(platforms_dir: impl Into<PathBuf>) -> Self {
        LocalPlatformFactory {
            platforms_dir: platforms_dir.into(),
        }
    }

    pub fn platforms_dir(&self) -> &Path {
        &self.platforms_dir
    }

    fn resolve_dir(&self, id: &str) -> (PathBuf, Option<String>) {
        let as_path = Path::new(id);
        if as_path.join(MANIFEST_FILE).is_file() {
            return (as_path.to_path_buf(), None);
        }
        match id.split_once('@') {
            Some((name, version)) => (self.platforms_dir.join(name), Some(version.to_string())),
            None => (self.platforms_dir.join(id), None),
        }
    }
}

impl PlatformFactory for LocalPlatformFactory {
    fn new_platform(&self, id: &str) -> Result<Box<dyn Platform>, PlatformError> {
        let (dir, version) = self.resolve_dir(id);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            log::debug!("No platform manifest at {}", manifest_path.display());
            return Err(PlatformError::UnknownPlatform(id.to_string()));
        }

        let manifest = PlatformManifest::load(&manifest_path)?;
        if let Some(version) = version {
            if manifest.version != version {
                log::debug!(
                    "Platform {} installed at version {}, requested {}",
                    manifest.name,
                    manifest.version,
                    version
                );
                return Err(PlatformError::UnknownPlatform(id.to_string()));
            }
        }

        Ok(Box::new(CommandPlatform::new(id, manifest, dir)))
    }
}
