//! Per-environment processing: option dump, platform delegation, result footer.
//!
//! The processor never builds anything. It resolves what the environment asks
//! for, makes sure the platform is installed, and hands the build variables and
//! targets to [`Platform::run`](crate::platform::Platform::run).

use super::RunContext;
use crate::config::ProjectConfig;
use crate::error::{ConfigError, PlatformError};
use crate::models::{BuildVariables, EnvOptions, RunResult};
use crate::platform::acquire_platform;
use crate::ui::console::{Color, Style};
use std::time::Instant;

/// Options shown in the header when not verbose.
pub const DEFAULT_PRINT_OPTIONS: [&str; 3] = ["platform", "framework", "board"];

/// Target handled by the run command itself after a successful build.
pub const MONITOR_TARGET: &str = "monitor";

pub struct EnvironmentProcessor<'a> {
    ctx: &'a RunContext,
    name: String,
    config: &'a ProjectConfig,
    targets: Vec<String>,
    upload_port: Option<String>,
    silent: bool,
    verbose: bool,
    jobs: usize,
    options: EnvOptions,
}

impl<'a> EnvironmentProcessor<'a> {
    /// Snapshot the environment's options. The snapshot does not follow later
    /// config mutations.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: &'a RunContext,
        name: &str,
        config: &'a ProjectConfig,
        targets: &[String],
        upload_port: Option<&str>,
        silent: bool,
        verbose: bool,
        jobs: usize,
    ) -> Result<Self, ConfigError> {
        let options = config.items(name)?;
        Ok(EnvironmentProcessor {
            ctx,
            name: name.to_string(),
            config,
            targets: targets.to_vec(),
            upload_port: upload_port.map(str::to_string),
            silent,
            verbose,
            jobs,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &EnvOptions {
        &self.options
    }

    /// `"name: value"` entries joined by `"; "`. Everything when verbose,
    /// otherwise only [`DEFAULT_PRINT_OPTIONS`], in config order.
    pub fn option_dump(&self) -> String {
        self.options
            .iter()
            .filter(|(name, _)| self.verbose || DEFAULT_PRINT_OPTIONS.contains(name))
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Process the environment. `Ok(true)` when the platform run succeeded.
    pub fn process(&self) -> Result<bool, PlatformError> {
        let console = &self.ctx.console;

        if !self.silent {
            console.echo(&format!(
                "Processing {} ({})",
                console.style(&self.name, Style::fg(Color::Cyan).with_bold()),
                self.option_dump()
            ));
            console.print_rule('-');
        }

        let start = Instant::now();
        let result = self.run_platform()?;
        let is_error = !result.is_success();
        log::info!(
            target: "parsed",
            "Environment {} finished with return code {}",
            self.name,
            result.returncode
        );

        if self.silent && !is_error {
            return Ok(true);
        }

        if is_error {
            if let Some(output) = result.output.as_deref().filter(|o| !o.is_empty()) {
                console.echo_err(output.trim_end());
            }
        }

        if is_error || !self.ctx.session.test_is_running {
            let label = if is_error {
                console.style("ERROR", Style::fg(Color::Red).with_bold())
            } else {
                console.style("SUCCESS", Style::fg(Color::Green).with_bold())
            };
            console.print_header(
                &format!("[{}] Took {:.2} seconds", label, start.elapsed().as_secs_f64()),
                is_error,
                None,
            );
        }

        Ok(!is_error)
    }

    pub fn get_build_variables(&self) -> BuildVariables {
        let mut variables = BuildVariables::new();
        variables.insert(BuildVariables::ENV_NAME, self.name.as_str());
        variables.insert(
            BuildVariables::PROJECT_CONFIG,
            self.config.path().to_string_lossy(),
        );
        if let Some(name) = &self.ctx.session.test_running_name {
            variables.insert(BuildVariables::TEST_RUNNING_NAME, name.as_str());
        }
        // Without an override the platform reads `upload_port` from the config itself.
        if let Some(port) = &self.upload_port {
            variables.insert(BuildVariables::UPLOAD_PORT, port.as_str());
        }
        variables
    }

    /// Explicit targets win over the `targets` option of the environment.
    pub fn get_build_targets(&self) -> Vec<String> {
        if !self.targets.is_empty() {
            return self.targets.clone();
        }
        self.options
            .get("targets")
            .map(|value| value.to_list())
            .unwrap_or_default()
    }

    fn run_platform(&self) -> Result<RunResult, PlatformError> {
        let platform_id = self
            .options
            .get("platform")
            .map(|value| value.to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PlatformError::UndefinedEnvPlatform(self.name.clone()))?;

        let variables = self.get_build_variables();
        let mut targets = self.get_build_targets();

        self.ctx.telemetry.on_run_environment(&self.options, &targets);

        targets.retain(|target| target != MONITOR_TARGET);

        let acquired = acquire_platform(
            self.ctx.factory.as_ref(),
            self.ctx.installer.as_ref(),
            &platform_id,
        )?;
        if acquired.installed {
            log::info!("Platform {} installed for environment {}", platform_id, self.name);
        }

        acquired
            .platform
            .run(&variables, &targets, self.silent, self.verbose, self.jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionMeta;
    use crate::orchestrator::testing::{MockFactory, MockInstaller, RecordingTelemetry};
    use crate::orchestrator::RunContext;
    use crate::platform::CommandMonitor;
    use crate::ui::console::{unstyle, Console, SharedBuffer};
    use std::collections::HashMap;

    const UNO: &str = "[env:uno]\nplatform = atmelavr\nframework = arduino\nboard = uno\n\
                       upload_speed = 115200\n";

    fn context(
        factory: MockFactory,
        session: SessionMeta,
    ) -> (RunContext, SharedBuffer, SharedBuffer) {
        let (console, out, err) = Console::buffered(40);
        let ctx = RunContext {
            session,
            factory: Box::new(factory),
            installer: Box::new(MockInstaller::default()),
            telemetry: Box::new(RecordingTelemetry::default()),
            monitor: Box::new(CommandMonitor::new(Vec::new())),
            console,
        };
        (ctx, out, err)
    }

    fn config(content: &str) -> ProjectConfig {
        ProjectConfig::parse("/project/platformio.ini", content)
            .unwrap()
            .with_sysenv(HashMap::new())
    }

    fn processor<'a>(
        ctx: &'a RunContext,
        name: &str,
        config: &'a ProjectConfig,
        silent: bool,
        verbose: bool,
    ) -> EnvironmentProcessor<'a> {
        EnvironmentProcessor::new(ctx, name, config, &[], None, silent, verbose, 1).unwrap()
    }

    #[test]
    fn test_option_dump_whitelist_and_verbose() {
        let (ctx, _, _) = context(MockFactory::missing_for(0), SessionMeta::default());
        let config = config(UNO);

        let quiet = processor(&ctx, "uno", &config, false, false);
        assert_eq!(
            quiet.option_dump(),
            "platform: atmelavr; framework: arduino; board: uno"
        );

        let verbose = processor(&ctx, "uno", &config, false, true);
        assert_eq!(
            verbose.option_dump(),
            "platform: atmelavr; framework: arduino; board: uno; upload_speed: 115200"
        );
    }

    #[test]
    fn test_build_variables() {
        let (ctx, _, _) = context(
            MockFactory::missing_for(0),
            SessionMeta::test("test_blink"),
        );
        let config = config(UNO);
        let processor = EnvironmentProcessor::new(
            &ctx,
            "uno",
            &config,
            &[],
            Some("/dev/ttyUSB1"),
            false,
            false,
            1,
        )
        .unwrap();

        let vars = processor.get_build_variables();
        assert_eq!(vars.get("pioenv"), Some("uno"));
        assert_eq!(vars.get("project_config"), Some("/project/platformio.ini"));
        assert_eq!(vars.get("piotest_running_name"), Some("test_blink"));
        assert_eq!(vars.get("upload_port"), Some("/dev/ttyUSB1"));
    }

    #[test]
    fn test_build_variables_without_override() {
        let (ctx, _, _) = context(MockFactory::missing_for(0), SessionMeta::default());
        let config = config("[env:uno]\nplatform = atmelavr\nupload_port = COM3\n");
        let processor = processor(&ctx, "uno", &config, false, false);

        let vars = processor.get_build_variables();
        assert_eq!(vars.len(), 2);
        assert!(!vars.contains_key("upload_port"));
        assert!(!vars.contains_key("piotest_running_name"));
    }

    #[test]
    fn test_build_targets_from_config_and_override() {
        let (ctx, _, _) = context(MockFactory::missing_for(0), SessionMeta::default());
        let config = config("[env]\ntargets = upload, monitor\n\n[env:uno]\nplatform = atmelavr\n");

        let from_config = processor(&ctx, "uno", &config, false, false);
        assert_eq!(from_config.get_build_targets(), vec!["upload", "monitor"]);

        let explicit = vec!["clean".to_string()];
        let overridden =
            EnvironmentProcessor::new(&ctx, "uno", &config, &explicit, None, false, false, 1)
                .unwrap();
        assert_eq!(overridden.get_build_targets(), vec!["clean"]);
    }

    #[test]
    fn test_missing_platform_never_reaches_factory() {
        let factory = MockFactory::missing_for(0);
        let lookups = factory.lookups();
        let (ctx, _, _) = context(factory, SessionMeta::default());
        let config = config("[env:native]\nboard = none\n");
        let processor = processor(&ctx, "native", &config, false, false);

        let result = processor.process();
        assert!(matches!(
            result,
            Err(PlatformError::UndefinedEnvPlatform(name)) if name == "native"
        ));
        assert_eq!(*lookups.lock().unwrap(), 0);
    }

    #[test]
    fn test_empty_platform_value_is_undefined() {
        let (ctx, _, _) = context(MockFactory::missing_for(0), SessionMeta::default());
        let config = config("[env:native]\nplatform =\n");
        let processor = processor(&ctx, "native", &config, false, false);

        assert!(matches!(
            processor.process(),
            Err(PlatformError::UndefinedEnvPlatform(_))
        ));
    }

    #[test]
    fn test_success_prints_header_and_footer() {
        let factory = MockFactory::missing_for(0);
        let runs = factory.runs();
        let (ctx, out, err) = context(factory, SessionMeta::default());
        let config = config(UNO);
        let targets = vec!["upload".to_string(), "monitor".to_string()];
        let processor =
            EnvironmentProcessor::new(&ctx, "uno", &config, &targets, None, false, false, 4)
                .unwrap();

        assert!(processor.process().unwrap());

        let stdout = unstyle(&out.contents());
        let lines: Vec<&str> = stdout.lines().collect();
        assert_eq!(
            lines[0],
            "Processing uno (platform: atmelavr; framework: arduino; board: uno)"
        );
        assert_eq!(lines[1], "-".repeat(40));
        assert!(lines[2].contains("[SUCCESS] Took "));
        assert!(lines[2].starts_with('='));
        assert!(err.contents().is_empty());

        let runs = runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].targets, vec!["upload"]);
        assert_eq!(runs[0].jobs, 4);
    }

    #[test]
    fn test_silent_success_prints_nothing() {
        let (ctx, out, err) = context(MockFactory::missing_for(0), SessionMeta::default());
        let config = config(UNO);
        let processor = processor(&ctx, "uno", &config, true, false);

        assert!(processor.process().unwrap());
        assert!(out.contents().is_empty());
        assert!(err.contents().is_empty());
    }

    #[test]
    fn test_failure_footer_goes_to_stderr() {
        let (ctx, out, err) = context(
            MockFactory::missing_for(0).with_returncode(2),
            SessionMeta::default(),
        );
        let config = config(UNO);
        let processor = processor(&ctx, "uno", &config, true, false);

        assert!(!processor.process().unwrap());
        assert!(out.contents().is_empty());
        let stderr = unstyle(&err.contents());
        assert!(stderr.contains("build failed"));
        assert!(stderr.contains("[ERROR] Took "));
    }

    #[test]
    fn test_test_session_suppresses_success_footer() {
        let (ctx, out, _) = context(
            MockFactory::missing_for(0),
            SessionMeta::test("test_blink"),
        );
        let config = config(UNO);
        let processor = processor(&ctx, "uno", &config, false, false);

        assert!(processor.process().unwrap());
        let stdout = out.contents();
        assert!(stdout.contains("Processing uno"));
        assert!(!stdout.contains("Took"));
    }

    #[test]
    fn test_test_session_keeps_error_footer() {
        let (ctx, out, err) = context(
            MockFactory::missing_for(0).with_returncode(1),
            SessionMeta::test("test_common"),
        );
        let config = config(UNO);
        let processor = processor(&ctx, "uno", &config, false, false);

        assert!(!processor.process().unwrap());
        assert!(!out.contents().contains("Took"));
        assert!(unstyle(&err.contents()).contains("[ERROR] Took "));
    }

    #[test]
    fn test_missing_platform_installed_then_run() {
        let factory = MockFactory::missing_for(1);
        let lookups = factory.lookups();
        let runs = factory.runs();
        let installer = MockInstaller::default();
        let installs = installer.calls();
        let (console, _, _) = Console::buffered(40);
        let ctx = RunContext {
            session: SessionMeta::default(),
            factory: Box::new(factory),
            installer: Box::new(installer),
            telemetry: Box::new(RecordingTelemetry::default()),
            monitor: Box::new(CommandMonitor::new(Vec::new())),
            console,
        };
        let config = config(UNO);
        let processor = processor(&ctx, "uno", &config, false, false);

        assert!(processor.process().unwrap());
        assert_eq!(*lookups.lock().unwrap(), 2);
        assert_eq!(
            *installs.lock().unwrap(),
            vec![(vec!["atmelavr".to_string()], true)]
        );
        assert_eq!(runs.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_telemetry_sees_targets_before_monitor_removal() {
        let telemetry = RecordingTelemetry::default();
        let events = telemetry.events();
        let (console, _, _) = Console::buffered(40);
        let ctx = RunContext {
            session: SessionMeta::default(),
            factory: Box::new(MockFactory::missing_for(0)),
            installer: Box::new(MockInstaller::default()),
            telemetry: Box::new(telemetry),
            monitor: Box::new(CommandMonitor::new(Vec::new())),
            console,
        };
        let config = config(UNO);
        let targets = vec!["upload".to_string(), "monitor".to_string()];
        let processor =
            EnvironmentProcessor::new(&ctx, "uno", &config, &targets, None, true, false, 1)
                .unwrap();

        processor.process().unwrap();
        assert_eq!(*events.lock().unwrap(), vec![targets]);
    }
}
