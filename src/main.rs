use anyhow::{Context, Result};
use clap::Parser;

use pio_run::cli::Cli;
use pio_run::config::{get_global_settings_path, load_settings, ToolSettings};
use pio_run::log_collector::get_global_logs_path;
use pio_run::orchestrator::{run_environments, Project, RunContext};
use pio_run::{
    CommandInstaller, CommandMonitor, Console, LocalPlatformFactory, LogCollector, LogTelemetry,
    NullTelemetry, RunError, SessionMeta, Telemetry,
};

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(()) => 0,
        Err(e) => match e.downcast_ref::<RunError>() {
            // The summary already told the user what failed.
            Some(RunError::ReturnErrorCode(code)) => *code,
            Some(run_error) => {
                eprintln!("Error: {:#}", e);
                run_error.exit_code()
            }
            None => {
                eprintln!("Error: {:#}", e);
                1
            }
        },
    };
    log::logger().flush();
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<()> {
    let opts = cli.into_run_options();

    let settings = match get_global_settings_path() {
        Ok(path) => load_settings(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        Err(_) => ToolSettings::default(),
    };

    // =========================================================================
    // LOG COLLECTOR - FILE ONLY, CONSOLE OUTPUT STAYS UNTOUCHED
    // =========================================================================
    if settings.log_to_file {
        let level = if opts.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        };
        match get_global_logs_path().and_then(|dir| LogCollector::new(&dir, level)) {
            Ok(collector) => {
                if let Err(e) = collector.install() {
                    eprintln!("Warning: {}", e);
                }
            }
            Err(e) => eprintln!("Warning: file logging disabled: {}", e),
        }
    }
    log::info!(target: "parsed", "pio_run {} started", pio_run::VERSION);

    let console = Console::stdio(settings.color);
    let project = Project::prepare(&opts, &console)?;

    let platforms_dir = project
        .dirs()
        .platforms_dir()
        .context("Failed to resolve platforms directory")?;
    log::debug!("Platforms directory: {}", platforms_dir.display());

    let telemetry: Box<dyn Telemetry> = if settings.telemetry_enabled {
        Box::new(LogTelemetry)
    } else {
        Box::new(NullTelemetry)
    };

    let ctx = RunContext {
        session: SessionMeta::default(),
        factory: Box::new(LocalPlatformFactory::new(platforms_dir)),
        installer: Box::new(CommandInstaller::new(settings.installer_command.clone())),
        telemetry,
        monitor: Box::new(CommandMonitor::new(settings.monitor_command.clone())),
        console,
    };

    let results = run_environments(&project, &opts, &ctx)?;
    log::info!(target: "parsed", "Processed {} environment(s)", results.len());
    Ok(())
}
