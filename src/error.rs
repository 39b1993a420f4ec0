//! Unified error type hierarchy for pio_run
//!
//! Provides structured error handling with ConfigError, PlatformError and RunError.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Project configuration parsing, lookup and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid project configuration {}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Not a project (no `platformio.ini` found at {})", .0.display())]
    NotProject(PathBuf),

    #[error("Please setup environments in `platformio.ini` file")]
    EnvsNotAvailable,

    #[error("Unknown environment names '{unknown}'. Valid names are '{known}'")]
    UnknownEnvNames { unknown: String, known: String },

    #[error("{message} for option `{option}` in section [{section}]")]
    OptionValue {
        option: String,
        section: String,
        message: String,
    },

    #[error("Interpolation failed for `{section}.{option}`: {reason}")]
    Interpolation {
        section: String,
        option: String,
        reason: String,
    },

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Platform acquisition and delegated run errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The environment has no `platform` option.
    #[error("Please specify platform for '{0}' environment")]
    UndefinedEnvPlatform(String),

    /// The platform is not installed locally.
    #[error("Unknown development platform '{0}'")]
    UnknownPlatform(String),

    #[error("Could not install platform '{platform}': {reason}")]
    InstallFailed { platform: String, reason: String },

    #[error("Invalid platform manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("Command '{cmd}' failed: {reason}")]
    Command { cmd: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised by the run command itself.
#[derive(Error, Debug)]
pub enum RunError {
    /// One or more environments failed; the process should exit with this code.
    #[error("Exited with return code {0}")]
    ReturnErrorCode(i32),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Process exit code that corresponds to this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::ReturnErrorCode(code) => *code,
            _ => 1,
        }
    }
}

/// Top-level result type for operations that may fail.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
