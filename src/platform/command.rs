//! Platform backed by an external builder command.

use super::manifest::PlatformManifest;
use super::Platform;
use crate::error::PlatformError;
use crate::models::{BuildVariables, RunResult};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable carrying all build variables as a JSON object.
pub const BUILD_VARS_ENV: &str = "PIO_BUILD_VARS";

/// Runs the manifest's `builder` command.
///
/// Invocation: `<builder...> [--verbose] --jobs N <targets...>` with the build
/// variables exported both as [`BUILD_VARS_ENV`] and as `PIO_<NAME>` variables.
#[derive(Debug, Clone)]
pub struct CommandPlatform {
    id: String,
    manifest: PlatformManifest,
    platform_dir: PathBuf,
}

impl CommandPlatform {
    pub fn new(id: impl Into<String>, manifest: PlatformManifest, platform_dir: PathBuf) -> Self {
        CommandPlatform {
            id: id.into(),
            manifest,
            platform_dir,
        }
    }

    pub fn manifest(&self) -> &PlatformManifest {
        &self.manifest
    }

    pub fn platform_dir(&self) -> &Path {
        &self.platform_dir
    }

    /// Assemble the builder invocation without running it.
    pub fn command(
        &self,
        variables: &BuildVariables,
        targets: &[String],
        verbose: bool,
        jobs: usize,
    ) -> Result<Command, PlatformError> {
        let (program, base_args) = self.manifest.builder.split_first().ok_or_else(|| {
            PlatformError::Manifest {
                path: self.platform_dir.join(super::manifest::MANIFEST_FILE),
                reason: "`builder` must name a command".to_string(),
            }
        })?;

        let mut cmd = Command::new(program);
        cmd.args(base_args);
        if verbose {
            cmd.arg("--verbose");
        }
        cmd.arg("--jobs").arg(jobs.max(1).to_string());
        cmd.args(targets);

        let vars_json = serde_json::to_string(variables).map_err(|e| PlatformError::Command {
            cmd: program.clone(),
            reason: format!("cannot encode build variables: {}", e),
        })?;
        cmd.env(BUILD_VARS_ENV, vars_json);
        cmd.env("PIO_PLATFORM_DIR", &self.platform_dir);
        for (key, value) in variables.iter() {
            cmd.env(format!("PIO_{}", key.to_uppercase()), value);
        }

        if let Some(project_dir) = variables
            .get(BuildVariables::PROJECT_CONFIG)
            .and_then(|p| Path::new(p).parent())
            .filter(|p| p.is_dir())
        {
            cmd.current_dir(project_dir);
        }
        Ok(cmd)
    }
}

impl Platform for CommandPlatform {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        &self,
        variables: &BuildVariables,
        targets: &[String],
        silent: bool,
        verbose: bool,
        jobs: usize,
    ) -> Result<RunResult, PlatformError> {
        let mut cmd = self.command(variables, targets, verbose, jobs)?;
        let program = self.manifest.builder.join(" ");
        log::info!(
            "[platform {}] running `{}` targets={:?} jobs={}",
            self.id,
            program,
            targets,
            jobs
        );

        let spawn_err = |e: std::io::Error| PlatformError::Command {
            cmd: program.clone(),
            reason: e.to_string(),
        };

        if silent {
            let output = cmd.output().map_err(spawn_err)?;
            let mut captured = String::from_utf8_lossy(&output.stdout).to_string();
            captured.push_str(&String::from_utf8_lossy(&output.stderr));
            if !captured.is_empty() {
                log::debug!("[platform {}] output: {}", self.id, captured);
            }
            Ok(RunResult {
                returncode: output.status.code().unwrap_or(-1),
                output: Some(captured),
            })
        } else {
            let status = cmd.status().map_err(spawn_err)?;
            Ok(RunResult::new(status.code().unwrap_or(-1)))
        }
    }
}
