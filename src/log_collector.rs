//! Decoupled logging pipeline for run sessions.
//!
//! ```text
//! log::info!() / log::warn!() ...
//!     |
//! [LogCollector] (non-blocking, crossbeam unbounded channel)
//!     |
//! [writer thread]
//!     |
//! logs/full/<ts>_run.log     every record
//! logs/parsed/<ts>_run.log   records with target "parsed"
//! ```
//!
//! The console output of a run is produced by [`crate::ui::Console`]; this
//! pipeline only persists diagnostics, so a broken log directory never
//! affects what the user sees.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Target routed to the parsed log in addition to the full log.
pub const PARSED_TARGET: &str = "parsed";

enum LogMessage {
    Line(LogLine),
    /// Flush marker; the sender is signalled once every earlier line is written.
    Flush(std::sync::mpsc::Sender<()>),
}

/// Directory holding run logs: `<cache dir>/pio-run/logs`.
pub fn get_global_logs_path() -> Result<PathBuf, String> {
    let cache = dirs::cache_dir().ok_or_else(|| "Failed to resolve cache directory".to_string())?;
    Ok(cache.join("pio-run").join("logs"))
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    pub parsed: bool,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        LogLine {
            message,
            parsed: false,
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: String) -> Self {
        LogLine {
            parsed: true,
            ..LogLine::new(message)
        }
    }
}

/// Unified logger writing to disk on a background thread.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    level: LevelFilter,
    full_log: PathBuf,
    parsed_log: PathBuf,
}

impl LogCollector {
    /// Create the log files for a new session and start the writer thread.
    pub fn new(log_dir: &Path, level: LevelFilter) -> Result<Self, String> {
        let full_dir = log_dir.join("full");
        let parsed_dir = log_dir.join("parsed");
        std::fs::create_dir_all(&full_dir)
            .map_err(|e| format!("Failed to create full log dir: {}", e))?;
        std::fs::create_dir_all(&parsed_dir)
            .map_err(|e| format!("Failed to create parsed log dir: {}", e))?;

        let name = format!("{}_run.log", Local::now().format("%Y%m%d_%H%M%S"));
        let full_log = full_dir.join(&name);
        let parsed_log = parsed_dir.join(&name);
        let mut full = open_append(&full_log)?;
        let mut parsed = open_append(&parsed_log)?;

        let (tx, rx) = unbounded::<LogMessage>();
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(line) => {
                        let formatted = format!("[{}] {}\n", line.timestamp, line.message);
                        let _ = full.write_all(formatted.as_bytes());
                        if line.parsed {
                            let _ = parsed.write_all(formatted.as_bytes());
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = full.flush();
                        let _ = parsed.flush();
                        let _ = done.send(());
                    }
                }
            }
        });

        Ok(LogCollector {
            tx,
            level,
            full_log,
            parsed_log,
        })
    }

    pub fn full_log_path(&self) -> &Path {
        &self.full_log
    }

    pub fn parsed_log_path(&self) -> &Path {
        &self.parsed_log
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Send a log line. Never blocks.
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(message.into()));
    }

    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(message.into()));
    }

    /// Block until every line sent before this call reached the files.
    pub fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();
        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;
        rx.recv()
            .map_err(|e| format!("Flush signal interrupted: {}", e))
    }

    /// Install as the global `log` backend.
    pub fn install(self) -> Result<(), String> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| format!("Failed to install logger: {}", e))?;
        log::set_max_level(level);
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

impl Log for LogCollector {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let message = format!("[{}] [{}] {}", record.level(), record.target(), record.args());
        if record.target() == PARSED_TARGET {
            self.log_parsed(message);
        } else {
            self.log_str(message);
        }
    }

    fn flush(&self) {
        let _ = self.wait_for_empty();
    }
}
