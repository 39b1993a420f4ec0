//! Device monitor launch after a successful `monitor` run.

use crate::error::PlatformError;
use std::process::Command;

/// Opens the device monitor for an environment.
pub trait MonitorLauncher: Send + Sync {
    fn launch(&self, environment: Option<&str>) -> Result<(), PlatformError>;
}

/// Runs the configured monitor command with inherited stdio.
#[derive(Debug, Clone)]
pub struct CommandMonitor {
    command: Vec<String>,
}

impl CommandMonitor {
    pub fn new(command: Vec<String>) -> Self {
        CommandMonitor { command }
    }

    pub fn argv(&self, environment: Option<&str>) -> Vec<String> {
        let mut argv = self.command.clone();
        if let Some(env) = environment {
            argv.push("--environment".to_string());
            argv.push(env.to_string());
        }
        argv
    }
}

impl MonitorLauncher for CommandMonitor {
    fn launch(&self, environment: Option<&str>) -> Result<(), PlatformError> {
        let argv = self.argv(environment);
        let (program, args) = argv.split_first().ok_or_else(|| PlatformError::Command {
            cmd: String::new(),
            reason: "monitor command is empty".to_string(),
        })?;

        log::info!("Launching device monitor: {}", argv.join(" "));
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|e| PlatformError::Command {
                cmd: program.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            log::warn!("Device monitor exited with status {:?}", status.code());
        }
        Ok(())
    }
}
