//! Usage telemetry for environment runs.
//!
//! Events are fire-and-forget: a sink must never fail a run.

use crate::models::EnvOptions;

/// Options reported with every run event.
const REPORTED_OPTIONS: [&str; 3] = ["platform", "framework", "board"];

pub trait Telemetry: Send + Sync {
    /// Called once per processed environment, before monitor targets are removed.
    fn on_run_environment(&self, options: &EnvOptions, targets: &[String]);
}

/// Emits run events through the `log` facade under the `telemetry` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTelemetry;

impl LogTelemetry {
    /// `platform=atmelavr framework=arduino board=uno targets=upload,monitor`
    pub fn describe(options: &EnvOptions, targets: &[String]) -> String {
        let mut parts: Vec<String> = REPORTED_OPTIONS
            .iter()
            .filter_map(|name| options.get(name).map(|v| format!("{}={}", name, v)))
            .collect();
        parts.push(format!("targets={}", targets.join(",")));
        parts.join(" ")
    }
}

impl Telemetry for LogTelemetry {
    fn on_run_environment(&self, options: &EnvOptions, targets: &[String]) {
        log::info!(target: "telemetry", "run {}", Self::describe(options, targets));
    }
}

/// Telemetry disabled in the tool settings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn on_run_environment(&self, _options: &EnvOptions, _targets: &[String]) {}
}
