//! Development platform seam.
//!
//! A platform owns the toolchain and board specific build logic. This crate
//! never builds anything itself: it asks a [`PlatformFactory`] for a platform
//! object, installs the platform through a [`PlatformInstaller`] when it is
//! missing, and hands the build variables and targets to [`Platform::run`].

pub mod command;
pub mod factory;
pub mod installer;
pub mod manifest;
pub mod monitor;

use crate::error::PlatformError;
use crate::models::{BuildVariables, RunResult};

pub use command::CommandPlatform;
pub use factory::LocalPlatformFactory;
pub use installer::CommandInstaller;
pub use manifest::PlatformManifest;
pub use monitor::{CommandMonitor, MonitorLauncher};

/// A locally available development platform.
pub trait Platform: Send + Sync {
    /// Identifier the platform was created for.
    fn id(&self) -> &str;

    /// Run the build targets. A non-zero `returncode` is a normal result, not an error.
    fn run(
        &self,
        variables: &BuildVariables,
        targets: &[String],
        silent: bool,
        verbose: bool,
        jobs: usize,
    ) -> Result<RunResult, PlatformError>;
}

/// Creates platform objects for installed platforms.
pub trait PlatformFactory: Send + Sync {
    /// Fails with [`PlatformError::UnknownPlatform`] when `id` is not installed.
    fn new_platform(&self, id: &str) -> Result<Box<dyn Platform>, PlatformError>;
}

/// Installs development platforms.
pub trait PlatformInstaller: Send + Sync {
    fn install(&self, platforms: &[String], skip_default_package: bool)
        -> Result<(), PlatformError>;
}

/// Result of [`acquire_platform`].
pub struct Acquired {
    pub platform: Box<dyn Platform>,
    /// The platform had to be installed first.
    pub installed: bool,
}

/// Obtain a platform object, installing the platform once if it is missing.
///
/// Lookup; on `UnknownPlatform` install exactly `[id]` without default
/// packages; look up again. A failure of the second lookup is returned as is.
pub fn acquire_platform(
    factory: &dyn PlatformFactory,
    installer: &dyn PlatformInstaller,
    id: &str,
) -> Result<Acquired, PlatformError> {
    match factory.new_platform(id) {
        Ok(platform) => Ok(Acquired {
            platform,
            installed: false,
        }),
        Err(PlatformError::UnknownPlatform(_)) => {
            log::info!(target: "parsed", "Platform {} is not installed, installing", id);
            installer.install(&[id.to_string()], true)?;
            let platform = factory.new_platform(id)?;
            Ok(Acquired {
                platform,
                installed: true,
            })
        }
        Err(e) => Err(e),
    }
}
