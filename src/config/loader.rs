//! INI reader and writer for `platformio.ini` style project files.
//!
//! Handles:
//! - `[section]` headers
//! - `key = value` and `key: value` options (keys are lower-cased)
//! - Indented continuation lines (joined with `\n`)
//! - Full-line `;` and `#` comments

use crate::error::ConfigError;
use std::fs;
use std::path::Path;

/// Comment block written at the top of saved project files.
pub const CONFIG_HEADER: &str = ";PlatformIO Project Configuration File
;
;   Build options: build flags, source filter
;   Upload options: custom upload port, speed and extra flags
;   Library options: dependencies, extra library storages
;   Advanced options: extra scripting
;
; Please visit documentation for the other options and examples
; https://docs.platformio.org/page/projectconf.html

";

/// One parsed section with its options in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    pub name: String,
    pub options: Vec<(String, String)>,
}

impl IniSection {
    pub fn new(name: impl Into<String>) -> Self {
        IniSection {
            name: name.into(),
            options: Vec::new(),
        }
    }

    pub fn get(&self, option: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == option)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, option: &str) -> bool {
        self.get(option).is_some()
    }

    /// Set an option, keeping its position when it already exists.
    pub fn set(&mut self, option: &str, value: impl Into<String>) {
        let value = value.into();
        match self.options.iter_mut().find(|(k, _)| k == option) {
            Some(entry) => entry.1 = value,
            None => self.options.push((option.to_string(), value)),
        }
    }

    pub fn remove(&mut self, option: &str) -> Option<String> {
        let idx = self.options.iter().position(|(k, _)| k == option)?;
        Some(self.options.remove(idx).1)
    }
}

/// Parse INI text. `path` is only used for error messages.
pub fn parse_ini(content: &str, path: &Path) -> Result<Vec<IniSection>, ConfigError> {
    let mut sections: Vec<IniSection> = Vec::new();
    // (section index, option index) of the value that continuation lines extend
    let mut current_option: Option<(usize, usize)> = None;

    let parse_err = |line: usize, message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        line,
        message,
    };

    for (idx, raw) in content.lines().enumerate() {
        let lineno = idx + 1;
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with(';') || trimmed.starts_with('#') {
            continue;
        }

        let indented = raw.starts_with(' ') || raw.starts_with('\t');
        if indented {
            if let Some((s, o)) = current_option {
                let value = &mut sections[s].options[o].1;
                value.push('\n');
                value.push_str(trimmed);
                continue;
            }
        }

        if trimmed.starts_with('[') {
            let name = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .map(str::trim)
                .ok_or_else(|| {
                    parse_err(lineno, format!("malformed section header: {}", trimmed))
                })?;
            if sections.iter().any(|s| s.name == name) {
                return Err(parse_err(lineno, format!("section [{}] already exists", name)));
            }
            sections.push(IniSection::new(name));
            current_option = None;
            continue;
        }

        let section_idx = match sections.len() {
            0 => {
                return Err(parse_err(
                    lineno,
                    "option outside of a section".to_string(),
                ))
            }
            n => n - 1,
        };

        let delim = trimmed
            .find(|c| c == '=' || c == ':')
            .ok_or_else(|| parse_err(lineno, format!("expected `key = value`, got: {}", trimmed)))?;
        let key = trimmed[..delim].trim().to_lowercase();
        let value = trimmed[delim + 1..].trim().to_string();
        if key.is_empty() {
            return Err(parse_err(lineno, "empty option name".to_string()));
        }

        let section = &mut sections[section_idx];
        if section.has(&key) {
            return Err(parse_err(
                lineno,
                format!("option `{}` in section [{}] already exists", key, section.name),
            ));
        }
        section.options.push((key, value));
        current_option = Some((section_idx, section.options.len() - 1));
    }

    Ok(sections)
}

/// Read and parse an INI file.
pub fn read_ini_file(path: &Path) -> Result<Vec<IniSection>, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.display().to_string())
        } else {
            ConfigError::IoError(e)
        }
    })?;
    parse_ini(&content, path)
}

/// Render sections back to INI text, prefixed with [`CONFIG_HEADER`].
pub fn write_ini(sections: &[IniSection]) -> String {
    let mut out = String::from(CONFIG_HEADER);
    for section in sections {
        out.push_str(&format!("[{}]\n", section.name));
        for (key, value) in &section.options {
            if value.contains('\n') {
                out.push_str(&format!("{} =", key));
                for line in value.split('\n') {
                    if line.is_empty() {
                        continue;
                    }
                    out.push_str(&format!("\n    {}", line));
                }
                out.push('\n');
            } else {
                out.push_str(&format!("{} = {}\n", key, value));
            }
        }
        out.push('\n');
    }
    out
}
