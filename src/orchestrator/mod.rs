//! Run orchestration: project preparation, environment selection, summary.
//!
//! ```text
//! RunOptions -> Project::prepare -> run_environments
//!                  |                      |
//!          clean build dir        EnvironmentProcessor (per env)
//!          load + validate        monitor launch
//!          legacy libdeps         summary, exit code
//! ```

pub mod helpers;
pub mod processor;

pub use processor::EnvironmentProcessor;

use crate::config::{ProjectConfig, PROJECT_CONFIG_FILE};
use crate::error::RunError;
use crate::models::{EnvOutcome, EnvStatus, SessionMeta};
use crate::platform::{MonitorLauncher, PlatformFactory, PlatformInstaller};
use crate::system::paths::{find_project_dir_above, ProjectDirs};
use crate::telemetry::Telemetry;
use crate::ui::console::{Color, Console, Style};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Target that skips the build when combined with `monitor`.
pub const NOBUILD_TARGET: &str = "nobuild";

/// Options of one `run` invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Environments requested with `-e`; empty means default or all.
    pub environments: Vec<String>,
    pub targets: Vec<String>,
    pub upload_port: Option<String>,
    /// Project directory, or a file inside a project.
    pub project_dir: PathBuf,
    /// Alternative project configuration file.
    pub project_conf: Option<PathBuf>,
    pub jobs: usize,
    pub silent: bool,
    pub verbose: bool,
    pub disable_auto_clean: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            environments: Vec::new(),
            targets: Vec::new(),
            upload_port: None,
            project_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            project_conf: None,
            jobs: num_cpus::get(),
            silent: false,
            verbose: false,
            disable_auto_clean: false,
        }
    }
}

/// Collaborators shared by every environment of a run.
pub struct RunContext {
    pub session: SessionMeta,
    pub factory: Box<dyn PlatformFactory>,
    pub installer: Box<dyn PlatformInstaller>,
    pub telemetry: Box<dyn Telemetry>,
    pub monitor: Box<dyn MonitorLauncher>,
    pub console: Console,
}

/// A validated project ready to be processed.
pub struct Project {
    dirs: ProjectDirs,
    config: ProjectConfig,
}

impl Project {
    /// Resolve, validate and tidy the project described by `opts`.
    pub fn prepare(opts: &RunOptions, console: &Console) -> Result<Self, RunError> {
        let project_dir = resolve_project_dir(&opts.project_dir);
        let config_path = opts
            .project_conf
            .clone()
            .unwrap_or_else(|| project_dir.join(PROJECT_CONFIG_FILE));
        log::info!(target: "parsed", "Loading project configuration {}", config_path.display());

        let mut config = ProjectConfig::load(&config_path)?;
        config.validate(&opts.environments)?;

        let dirs = ProjectDirs::new(&project_dir, config.clone());
        if !opts.disable_auto_clean {
            if let Err(e) = helpers::clean_build_dir(&dirs) {
                log::warn!("Auto-clean failed: {}", e);
                let build_dir = dirs
                    .build_dir()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                console.secho(
                    &format!(
                        "Can not remove temporary directory `{}`. Please remove it manually \
                         to avoid build issues",
                        build_dir
                    ),
                    Style::fg(Color::Yellow),
                    false,
                );
            }
        }

        if !opts.silent {
            for warning in config.warnings() {
                console.secho(&format!("Warning! {}", warning), Style::fg(Color::Yellow), false);
            }
        }

        let libdeps_dir = dirs.libdeps_dir()?;
        if let Some(notice) =
            helpers::handle_legacy_libdeps(&project_dir, &libdeps_dir, &mut config)?
        {
            console.secho(&notice, Style::fg(Color::Yellow), false);
        }

        Ok(Project { dirs, config })
    }

    pub fn project_dir(&self) -> &Path {
        self.dirs.project_dir()
    }

    pub fn dirs(&self) -> &ProjectDirs {
        &self.dirs
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }
}

fn resolve_project_dir(path: &Path) -> PathBuf {
    if !path.is_file() {
        return path.to_path_buf();
    }
    find_project_dir_above(path)
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
}

/// Whether `name` is excluded by the `-e` selection or by `default_envs`.
pub fn is_env_skipped(name: &str, requested: &[String], default_envs: &[String]) -> bool {
    if !requested.is_empty() {
        return !requested.iter().any(|e| e == name);
    }
    !default_envs.is_empty() && !default_envs.iter().any(|e| e == name)
}

/// Process every selected environment in configuration order.
///
/// Fails with [`RunError::ReturnErrorCode`] when any environment failed; the
/// summary has already been printed by then.
pub fn run_environments(
    project: &Project,
    opts: &RunOptions,
    ctx: &RunContext,
) -> Result<Vec<EnvOutcome>, RunError> {
    let start = Instant::now();
    let config = project.config();
    let default_envs = config.default_envs()?;
    let mut results: Vec<EnvOutcome> = Vec::new();

    for name in config.envs() {
        if is_env_skipped(&name, &opts.environments, &default_envs) {
            log::debug!("Skipping environment {}", name);
            results.push(EnvOutcome {
                name,
                status: EnvStatus::Ignored,
            });
            continue;
        }

        if !opts.silent && results.iter().any(|r| r.status != EnvStatus::Ignored) {
            ctx.console.echo("");
        }

        let processor = EnvironmentProcessor::new(
            ctx,
            &name,
            config,
            &opts.targets,
            opts.upload_port.as_deref(),
            opts.silent,
            opts.verbose,
            opts.jobs,
        )?;
        let succeeded = processor.process()?;
        results.push(EnvOutcome {
            name,
            status: if succeeded {
                EnvStatus::Success
            } else {
                EnvStatus::Failed
            },
        });

        if succeeded {
            let targets = processor.get_build_targets();
            let wants_monitor = targets.iter().any(|t| t == processor::MONITOR_TARGET);
            if wants_monitor && !targets.iter().any(|t| t == NOBUILD_TARGET) {
                ctx.monitor
                    .launch(opts.environments.first().map(String::as_str))?;
            }
        }
    }

    let found_error = results.iter().any(|r| r.status == EnvStatus::Failed);
    if (found_error || !opts.silent) && results.len() > 1 {
        ctx.console.echo("");
        ctx.console.print_summary(&results, start.elapsed());
    }

    if found_error {
        return Err(RunError::ReturnErrorCode(1));
    }
    Ok(results)
}
