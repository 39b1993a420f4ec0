//! Project directory resolution.
//!
//! Every directory the run command touches is derived from the project root and
//! the `[platformio]` section: an explicit option (or its system environment
//! variable) wins, otherwise a default below the project or core directory is used.
//! `~` and `$PROJECT_HASH` are expanded in configured values.

use crate::config::{ProjectConfig, PROJECT_CONFIG_FILE};
use crate::error::ConfigError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Source file suffixes that contribute to the project structure hash.
const HASHED_SUFFIXES: &[&str] = &[".c", ".cc", ".cpp", ".h", ".hpp", ".s", ".S"];

/// True when `dir` contains a project configuration file.
pub fn is_project_dir(dir: &Path) -> bool {
    dir.join(PROJECT_CONFIG_FILE).is_file()
}

/// Find the closest directory at or above `path` that holds a project file.
///
/// A file path starts the search from its parent directory.
pub fn find_project_dir_above(path: &Path) -> Option<PathBuf> {
    let mut current = if path.is_file() {
        path.parent()?.to_path_buf()
    } else {
        path.to_path_buf()
    };

    loop {
        if is_project_dir(&current) {
            return Some(current);
        }
        match current.parent() {
            Some(parent) if parent != current && parent.is_dir() => {
                current = parent.to_path_buf();
            }
            _ => return None,
        }
    }
}

/// Resolved directories for one project.
#[derive(Clone, Debug)]
pub struct ProjectDirs {
    project_dir: PathBuf,
    config: ProjectConfig,
}

impl ProjectDirs {
    pub fn new(project_dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        ProjectDirs {
            project_dir: project_dir.into(),
            config,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Path of the project configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.project_dir.join(PROJECT_CONFIG_FILE)
    }

    /// `<basename>-<first 10 hex digits of sha256(project_dir)>`
    pub fn project_hash_name(&self) -> String {
        let basename = self
            .project_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let digest = Sha256::digest(self.project_dir.to_string_lossy().as_bytes());
        let hex = format!("{:x}", digest);
        format!("{}-{}", basename, &hex[..10])
    }

    fn optional_dir(&self, name: &str, default: PathBuf) -> Result<PathBuf, ConfigError> {
        let configured = match self.config.get_str("platformio", name)? {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(default),
        };

        let mut value = configured;
        if value.contains("$PROJECT_HASH") {
            value = value.replace("$PROJECT_HASH", &self.project_hash_name());
        }

        let path = if let Some(rest) = value.strip_prefix('~') {
            let home = dirs::home_dir().ok_or_else(|| {
                ConfigError::FileNotFound("Cannot determine home directory".to_string())
            })?;
            home.join(rest.trim_start_matches(['/', '\\']))
        } else {
            PathBuf::from(value)
        };

        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.project_dir.join(path))
        }
    }

    pub fn core_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = dirs::home_dir()
            .map(|h| h.join(".platformio"))
            .unwrap_or_else(|| self.project_dir.join(".platformio"));
        self.optional_dir("core_dir", default)
    }

    pub fn platforms_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = self.core_dir()?.join("platforms");
        self.optional_dir("platforms_dir", default)
    }

    pub fn packages_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = self.core_dir()?.join("packages");
        self.optional_dir("packages_dir", default)
    }

    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = self.core_dir()?.join(".cache");
        self.optional_dir("cache_dir", default)
    }

    pub fn workspace_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("workspace_dir", self.project_dir.join(".pio"))
    }

    pub fn build_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = self.workspace_dir()?.join("build");
        self.optional_dir("build_dir", default)
    }

    pub fn libdeps_dir(&self) -> Result<PathBuf, ConfigError> {
        let default = self.workspace_dir()?.join("libdeps");
        self.optional_dir("libdeps_dir", default)
    }

    pub fn lib_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("lib_dir", self.project_dir.join("lib"))
    }

    pub fn include_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("include_dir", self.project_dir.join("include"))
    }

    pub fn src_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("src_dir", self.project_dir.join("src"))
    }

    pub fn test_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("test_dir", self.project_dir.join("test"))
    }

    pub fn boards_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("boards_dir", self.project_dir.join("boards"))
    }

    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("data_dir", self.project_dir.join("data"))
    }

    pub fn shared_dir(&self) -> Result<PathBuf, ConfigError> {
        self.optional_dir("shared_dir", self.project_dir.join("shared"))
    }

    /// Hash of the project's source layout.
    ///
    /// Changes whenever a source file is added, removed or renamed under the
    /// src or lib directories, or when the tool version changes.
    pub fn calculate_project_hash(&self) -> Result<String, ConfigError> {
        let mut chunks = vec![crate::VERSION.to_string()];
        for dir in [self.src_dir()?, self.lib_dir()?] {
            if dir.is_dir() {
                collect_source_files(&dir, &mut chunks)?;
            }
        }
        chunks.sort();

        let mut joined = chunks.join(",");
        if cfg!(windows) {
            joined = joined.to_lowercase();
        }
        Ok(format!("{:x}", Sha256::digest(joined.as_bytes())))
    }
}

fn collect_source_files(dir: &Path, chunks: &mut Vec<String>) -> Result<(), ConfigError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories are not followed.
        if entry.file_type()?.is_dir() {
            collect_source_files(&path, chunks)?;
        } else {
            let text = path.to_string_lossy();
            if HASHED_SUFFIXES.iter().any(|s| text.ends_with(s)) {
                chunks.push(text.to_string());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn dirs_for(project: &Path, content: &str) -> ProjectDirs {
        let config = ProjectConfig::parse(project.join(PROJECT_CONFIG_FILE), content)
            .expect("valid config")
            .with_sysenv(HashMap::new());
        ProjectDirs::new(project, config)
    }

    #[test]
    fn test_find_project_dir_above() {
        let temp = tempdir().expect("Failed to create temp dir");
        let project = temp.path().join("blink");
        let nested = project.join("src").join("deep");
        fs::create_dir_all(&nested).unwrap();
        fs::write(project.join(PROJECT_CONFIG_FILE), "[env:uno]\n").unwrap();
        fs::write(nested.join("main.cpp"), "").unwrap();

        assert_eq!(find_project_dir_above(&nested), Some(project.clone()));
        assert_eq!(find_project_dir_above(&nested.join("main.cpp")), Some(project));
    }

    #[test]
    fn test_find_project_dir_above_none() {
        let temp = tempdir().expect("Failed to create temp dir");
        let dir = temp.path().join("nothing");
        fs::create_dir_all(&dir).unwrap();
        let found = find_project_dir_above(&dir);
        assert!(found.map_or(true, |p| !p.starts_with(temp.path())));
    }

    #[test]
    fn test_default_dirs() {
        let project = PathBuf::from("/work/blink");
        let dirs = dirs_for(&project, "[env:uno]\n");
        assert_eq!(dirs.workspace_dir().unwrap(), project.join(".pio"));
        assert_eq!(dirs.build_dir().unwrap(), project.join(".pio/build"));
        assert_eq!(dirs.libdeps_dir().unwrap(), project.join(".pio/libdeps"));
        assert_eq!(dirs.src_dir().unwrap(), project.join("src"));
    }

    #[test]
    fn test_configured_dirs() {
        let project = PathBuf::from("/work/blink");
        let dirs = dirs_for(
            &project,
            "[platformio]\nbuild_dir = out\nplatforms_dir = /opt/platforms\n",
        );
        assert_eq!(dirs.build_dir().unwrap(), project.join("out"));
        assert_eq!(dirs.platforms_dir().unwrap(), PathBuf::from("/opt/platforms"));
    }

    #[test]
    fn test_project_hash_placeholder() {
        let project = PathBuf::from("/work/blink");
        let dirs = dirs_for(&project, "[platformio]\nbuild_dir = /tmp/$PROJECT_HASH\n");
        let build = dirs.build_dir().unwrap();
        let name = build.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("blink-"));
        assert_eq!(name.len(), "blink-".len() + 10);
    }

    #[test]
    fn test_project_hash_tracks_sources() {
        let temp = tempdir().expect("Failed to create temp dir");
        let project = temp.path().to_path_buf();
        fs::create_dir_all(project.join("src")).unwrap();
        fs::write(project.join("src/main.cpp"), "").unwrap();
        let dirs = dirs_for(&project, "[env:uno]\n");

        let first = dirs.calculate_project_hash().unwrap();
        assert_eq!(first, dirs.calculate_project_hash().unwrap());

        fs::write(project.join("src/notes.txt"), "").unwrap();
        assert_eq!(first, dirs.calculate_project_hash().unwrap());

        fs::write(project.join("src/extra.c"), "").unwrap();
        assert_ne!(first, dirs.calculate_project_hash().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_project_hash_ignores_symlink_loop() {
        let temp = tempdir().expect("Failed to create temp dir");
        let project = temp.path().to_path_buf();
        fs::create_dir_all(project.join("src/nested")).unwrap();
        fs::write(project.join("src/main.cpp"), "").unwrap();
        std::os::unix::fs::symlink(project.join("src"), project.join("src/nested/loop")).unwrap();
        let dirs = dirs_for(&project, "[env:uno]\n");

        let hash = dirs.calculate_project_hash().unwrap();
        assert_eq!(hash.len(), 64);
    }
}
