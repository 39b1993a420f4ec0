//! pio_run: the `run` command of an embedded build-automation tool
//!
//! Reads an INI project configuration, selects build environments, and
//! drives each one through an [`EnvironmentProcessor`]. Building is delegated
//! to development platforms reached through the traits in [`platform`].
//!
//! The crate is organized into functional modules:
//! - **error**: Unified error type hierarchy
//! - **models**: Core data structures and types
//! - **config**: Project configuration, option registry, tool settings
//! - **system**: Project directory layout
//! - **platform**: Platform, factory, installer and monitor seams
//! - **orchestrator**: Environment processing and the run command
//! - **telemetry**: Run events
//! - **ui**: Console output
//! - **cli**: Command-line parsing for the binary

// Core foundational modules
pub mod error;
pub mod models;

pub mod cli;
pub mod config;
pub mod system;
pub mod platform;
pub mod telemetry;
pub mod ui;

// Robust, decoupled logging system
pub mod log_collector;

pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

pub use log_collector::{LogCollector, LogLine};

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{ConfigError, PlatformError, Result, RunError};

pub use models::{
    BuildVariables, EnvOptions, EnvOutcome, EnvStatus, OptionValue, RunResult, SessionMeta,
};

pub use config::{ProjectConfig, ToolSettings};

pub use orchestrator::{run_environments, EnvironmentProcessor, Project, RunContext, RunOptions};

pub use platform::{
    acquire_platform, CommandInstaller, CommandMonitor, CommandPlatform, LocalPlatformFactory,
    MonitorLauncher, Platform, PlatformFactory, PlatformInstaller,
};

pub use telemetry::{LogTelemetry, NullTelemetry, Telemetry};

pub use ui::Console;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
