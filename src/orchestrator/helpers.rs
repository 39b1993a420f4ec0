//! Build directory maintenance before environments are processed.

use crate::config::ProjectConfig;
use crate::error::{ConfigError, Result};
use crate::models::OptionValue;
use crate::system::paths::ProjectDirs;
use std::fs;
use std::path::Path;

/// File inside the build dir recording the project structure hash.
pub const STRUCTURE_HASH_FILE: &str = "structure.hash";

const LEGACY_BUILD_DIR: &str = ".pioenvs";
const LEGACY_LIBDEPS_DIR: &str = ".piolibdeps";

/// Drop stale build output.
///
/// The build dir is removed when the project file is newer than it or when
/// the recorded structure hash no longer matches the sources; it is then
/// recreated with the current hash.
pub fn clean_build_dir(dirs: &ProjectDirs) -> Result<()> {
    let build_dir = dirs.build_dir()?;

    let legacy_build_dir = dirs.project_dir().join(LEGACY_BUILD_DIR);
    if legacy_build_dir.is_dir() && legacy_build_dir != build_dir {
        log::info!("Removing legacy build dir {}", legacy_build_dir.display());
        fs::remove_dir_all(&legacy_build_dir)?;
    }

    let hash_file = build_dir.join(STRUCTURE_HASH_FILE);
    let project_hash = dirs.calculate_project_hash()?;

    if build_dir.is_dir() && is_newer(&dirs.config_path(), &build_dir) {
        log::info!("Project configuration changed, cleaning {}", build_dir.display());
        fs::remove_dir_all(&build_dir)?;
    }

    if build_dir.is_dir() && hash_file.is_file() {
        if fs::read_to_string(&hash_file)? == project_hash {
            return Ok(());
        }
        log::info!("Project structure changed, cleaning {}", build_dir.display());
        fs::remove_dir_all(&build_dir)?;
    }

    fs::create_dir_all(&build_dir)?;
    fs::write(&hash_file, project_hash)?;
    Ok(())
}

fn is_newer(file: &Path, than: &Path) -> bool {
    let mtime = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (mtime(file), mtime(than)) {
        (Some(a), Some(b)) => a > b,
        _ => false,
    }
}

/// Register a legacy `.piolibdeps` storage as an extra library dir.
///
/// Returns the deprecation notice to show, if any.
pub fn handle_legacy_libdeps(
    project_dir: &Path,
    libdeps_dir: &Path,
    config: &mut ProjectConfig,
) -> std::result::Result<Option<String>, ConfigError> {
    let legacy = project_dir.join(LEGACY_LIBDEPS_DIR);
    if !legacy.is_dir() || legacy == libdeps_dir {
        return Ok(None);
    }

    let mut lib_extra_dirs = config.get_list("env", "lib_extra_dirs")?;
    lib_extra_dirs.push(legacy.to_string_lossy().to_string());
    config.set("env", "lib_extra_dirs", OptionValue::List(lib_extra_dirs));

    Ok(Some(format!(
        "DEPRECATED! A legacy library storage `{0}` has been found in a project. \n\
         Please declare project dependencies in `platformio.ini` file using \
         `lib_deps` option and remove `{0}` folder.",
        legacy.display()
    )))
}
