//! Console output: styled lines, separator rules and the run summary.
//!
//! Colours are plain ANSI sequences, emitted only when enabled. Width comes
//! from `$COLUMNS` (fallback 80). Writers are swappable so tests can capture
//! everything that would reach the terminal.

use crate::models::{EnvOutcome, EnvStatus};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

const DEFAULT_WIDTH: usize = 80;

static ANSI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*m").expect("Invalid ANSI regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Cyan,
}

impl Color {
    fn code(self) -> &'static str {
        match self {
            Color::Red => RED,
            Color::Green => GREEN,
            Color::Yellow => YELLOW,
            Color::Cyan => CYAN,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bold: bool,
}

impl Style {
    pub fn fg(color: Color) -> Self {
        Style {
            fg: Some(color),
            bold: false,
        }
    }

    pub fn bold() -> Self {
        Style {
            fg: None,
            bold: true,
        }
    }

    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Strip ANSI styling from `text`.
pub fn unstyle(text: &str) -> String {
    ANSI_RE.replace_all(text, "").to_string()
}

/// Terminal width from `$COLUMNS`, falling back to 80.
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// In-memory writer shared between a console and a test.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).to_string())
            .unwrap_or_default()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "buffer lock poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

type Sink = Mutex<Box<dyn Write + Send>>;

/// Styled console writer.
pub struct Console {
    out: Sink,
    err: Sink,
    color: bool,
    width: usize,
}

impl Console {
    /// Console on stdout/stderr. `color` forces styling on or off; `None`
    /// enables it for terminals unless `NO_COLOR` is set.
    pub fn stdio(color: Option<bool>) -> Self {
        let color = color.unwrap_or_else(|| {
            std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
        });
        Self::with_writers(
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            color,
            terminal_width(),
        )
    }

    pub fn with_writers(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        color: bool,
        width: usize,
    ) -> Self {
        Console {
            out: Mutex::new(out),
            err: Mutex::new(err),
            color,
            width,
        }
    }

    /// Uncoloured console writing into two buffers (stdout, stderr).
    pub fn buffered(width: usize) -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let console =
            Self::with_writers(Box::new(out.clone()), Box::new(err.clone()), false, width);
        (console, out, err)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn color_enabled(&self) -> bool {
        self.color
    }

    /// Wrap `text` in the ANSI codes for `style` when colour is enabled.
    pub fn style(&self, text: &str, style: Style) -> String {
        if !self.color || (style.fg.is_none() && !style.bold) {
            return text.to_string();
        }
        let mut prefix = String::new();
        if style.bold {
            prefix.push_str(BOLD);
        }
        if let Some(fg) = style.fg {
            prefix.push_str(fg.code());
        }
        format!("{}{}{}", prefix, text, RESET)
    }

    fn write_line(&self, sink: &Sink, text: &str) {
        if let Ok(mut w) = sink.lock() {
            let _ = writeln!(w, "{}", text);
            let _ = w.flush();
        }
    }

    /// Print a line to stdout.
    pub fn echo(&self, text: &str) {
        self.write_line(&self.out, text);
    }

    /// Print a line to stderr.
    pub fn echo_err(&self, text: &str) {
        self.write_line(&self.err, text);
    }

    /// Print a styled line to stdout, or stderr when `err` is set.
    pub fn secho(&self, text: &str, style: Style, err: bool) {
        let styled = self.style(text, style);
        if err {
            self.echo_err(&styled);
        } else {
            self.echo(&styled);
        }
    }

    /// Bold separator rule spanning the terminal width.
    pub fn print_rule(&self, ch: char) {
        let rule: String = std::iter::repeat(ch).take(self.width).collect();
        self.secho(&rule, Style::bold(), false);
    }

    /// Print `label` centred between `=` rules.
    pub fn print_header(&self, label: &str, is_error: bool, fg: Option<Color>) {
        let label_width = unstyle(label).chars().count();
        let half = self.width.saturating_sub(label_width + 2) / 2;
        let half_line = "=".repeat(half);
        let line = format!("{} {} {}", half_line, label, half_line);
        let style = Style { fg, bold: false };
        self.secho(&line, style, is_error);
    }

    /// Print the per-environment status table and the totals line.
    pub fn print_summary(&self, results: &[EnvOutcome], elapsed: Duration) {
        self.print_header("[SUMMARY]", false, None);

        let name_width = results
            .iter()
            .map(|r| r.name.chars().count())
            .max()
            .unwrap_or(0);
        let mut succeeded = 0;
        let mut failed = 0;

        for result in results {
            let status = match result.status {
                EnvStatus::Failed => {
                    failed += 1;
                    self.style("FAILED", Style::fg(Color::Red))
                }
                EnvStatus::Ignored => self.style("IGNORED", Style::fg(Color::Yellow)),
                EnvStatus::Success => {
                    succeeded += 1;
                    self.style("SUCCESS", Style::fg(Color::Green))
                }
            };
            let name = self.style(
                &format!("{:<width$}", result.name, width = name_width),
                Style::fg(Color::Cyan),
            );
            let line = format!("Environment {}\t[{}]", name, status);
            if result.status == EnvStatus::Failed {
                self.echo_err(&line);
            } else {
                self.echo(&line);
            }
        }

        let failed_part = if failed > 0 {
            format!("{} failed, ", failed)
        } else {
            String::new()
        };
        self.print_header(
            &format!(
                "{}{} succeeded in {:.2} seconds",
                failed_part,
                succeeded,
                elapsed.as_secs_f64()
            ),
            failed > 0,
            Some(if failed > 0 { Color::Red } else { Color::Green }),
        );
    }
}
