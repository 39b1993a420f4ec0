//! Command-line interface of the `pio_run` binary.

use crate::orchestrator::RunOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "pio_run")]
#[command(about = "Process project environments")]
#[command(version)]
pub struct Cli {
    /// Process only these environments (repeatable)
    #[arg(short = 'e', long = "environment")]
    pub environment: Vec<String>,

    /// Build targets passed to the platform (repeatable)
    #[arg(short = 't', long = "target")]
    pub target: Vec<String>,

    /// Override the upload port of every processed environment
    #[arg(long)]
    pub upload_port: Option<String>,

    /// Project directory, or a file inside a project
    #[arg(short = 'd', long)]
    pub project_dir: Option<PathBuf>,

    /// Alternative project configuration file
    #[arg(short = 'c', long)]
    pub project_conf: Option<PathBuf>,

    /// Allow N jobs at once (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// Suppress progress output of successful environments
    #[arg(short = 's', long)]
    pub silent: bool,

    /// Print every option of an environment and verbose builder output
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Keep the build directory even when the project changed
    #[arg(long)]
    pub disable_auto_clean: bool,
}

impl Cli {
    pub fn into_run_options(self) -> RunOptions {
        let defaults = RunOptions::default();
        RunOptions {
            environments: self.environment,
            targets: self.target,
            upload_port: self.upload_port,
            project_dir: self.project_dir.unwrap_or(defaults.project_dir),
            project_conf: self.project_conf,
            jobs: self.jobs.unwrap_or(defaults.jobs),
            silent: self.silent,
            verbose: self.verbose,
            disable_auto_clean: self.disable_auto_clean,
        }
    }
}
