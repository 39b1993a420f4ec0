//! Platform installation through an external command.

use super::PlatformInstaller;
use crate::config::settings::PLATFORM_PLACEHOLDER;
use crate::error::PlatformError;
use std::process::Command;

/// Flag appended when default packages must not be installed.
pub const SKIP_DEFAULT_PACKAGE_FLAG: &str = "--skip-default-package";

/// Runs the configured installer command once per platform.
///
/// `{platform}` in the command is replaced by the identifier; without a
/// placeholder the identifier is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    command: Vec<String>,
}

impl CommandInstaller {
    pub fn new(command: Vec<String>) -> Self {
        CommandInstaller { command }
    }

    /// Argument vector for installing `platform`.
    pub fn argv(&self, platform: &str, skip_default_package: bool) -> Vec<String> {
        let mut argv: Vec<String> = self
            .command
            .iter()
            .map(|arg| arg.replace(PLATFORM_PLACEHOLDER, platform))
            .collect();
        if !self.command.iter().any(|a| a.contains(PLATFORM_PLACEHOLDER)) {
            argv.push(platform.to_string());
        }
        if skip_default_package {
            argv.push(SKIP_DEFAULT_PACKAGE_FLAG.to_string());
        }
        argv
    }
}

impl PlatformInstaller for CommandInstaller {
    fn install(
        &self,
        platforms: &[String],
        skip_default_package: bool,
    ) -> Result<(), PlatformError> {
        for platform in platforms {
            if self.command.is_empty() {
                return Err(PlatformError::InstallFailed {
                    platform: platform.clone(),
                    reason: "installer command is empty".to_string(),
                });
            }
            let argv = self.argv(platform, skip_default_package);
            let (program, args) = match argv.split_first() {
                Some(split) => split,
                None => continue,
            };

            log::info!(target: "parsed", "Installing platform {}: {}", platform, argv.join(" "));
            let status = Command::new(program)
                .args(args)
                .status()
                .map_err(|e| PlatformError::InstallFailed {
                    platform: platform.clone(),
                    reason: format!("failed to execute {}: {}", program, e),
                })?;

            if !status.success() {
                return Err(PlatformError::InstallFailed {
                    platform: platform.clone(),
                    reason: format!("{} exited with status {:?}", program, status.code()),
                });
            }
            log::info!("Platform {} installed", platform);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_substitutes_placeholder() {
        let installer = CommandInstaller::new(vec![
            "pio".to_string(),
            "platform".to_string(),
            "install".to_string(),
            "{platform}".to_string(),
        ]);
        assert_eq!(
            installer.argv("atmelavr", true),
            vec!["pio", "platform", "install", "atmelavr", "--skip-default-package"]
        );
    }

    #[test]
    fn test_argv_appends_identifier_without_placeholder() {
        let installer = CommandInstaller::new(vec!["install-platform".to_string()]);
        assert_eq!(installer.argv("ststm32", false), vec!["install-platform", "ststm32"]);
    }

    #[test]
    fn test_empty_command_fails() {
        let installer = CommandInstaller::new(Vec::new());
        let result = installer.install(&["atmelavr".to_string()], true);
        match result {
            Err(PlatformError::InstallFailed { platform, reason }) => {
                assert_eq!(platform, "atmelavr");
                assert_eq!(reason, "installer command is empty");
            }
            other => panic!("expected InstallFailed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_fails() {
        let installer = CommandInstaller::new(vec!["false".to_string()]);
        let result = installer.install(&["atmelavr".to_string()], false);
        assert!(matches!(result, Err(PlatformError::InstallFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_install() {
        let installer = CommandInstaller::new(vec!["true".to_string()]);
        assert!(installer.install(&["atmelavr".to_string()], true).is_ok());
    }
}
