//! Project configuration module.
//!
//! Loads `platformio.ini` style project files and answers option lookups for
//! the run command and the environment processor.
//!
//! # Module Structure
//!
//! - `loader`: INI reading and writing
//! - `options`: Registry of known options (types, list semantics, env overrides)
//! - `settings`: Tool settings persisted as JSON
//!
//! # Lookup Rules
//!
//! 1. `env:<name>` sections inherit every option of the global `[env]` section
//! 2. `${section.option}` and `${sysenv.NAME}` references are expanded on read
//! 3. Options marked `multiple` are split into lists
//! 4. Options with a system environment variable pick it up when set
//! 5. Values are checked against the option's declared kind

pub mod loader;
pub mod options;
pub mod settings;

use crate::error::ConfigError;
use crate::models::{EnvOptions, OptionValue};
use loader::IniSection;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub use settings::{get_global_settings_path, load_settings, save_settings, ToolSettings};

/// File name of the project configuration.
pub const PROJECT_CONFIG_FILE: &str = "platformio.ini";

const MAX_INTERPOLATION_DEPTH: usize = 10;

static INLINE_COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+;.*$").expect("Invalid inline comment regex"));

static VARTPL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^.}]+)\.([^}]+)\}").expect("Invalid interpolation regex")
});

/// Scope of a section name: `env:uno` -> `env`.
fn scope_of(section: &str) -> &str {
    section.split(':').next().unwrap_or(section)
}

/// Parsed project configuration.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    path: PathBuf,
    sections: Vec<IniSection>,
    parsed: Vec<PathBuf>,
    warnings: Vec<String>,
    sysenv: HashMap<String, String>,
    expand_interpolations: bool,
}

impl ProjectConfig {
    fn empty(path: &Path) -> Self {
        ProjectConfig {
            path: path.to_path_buf(),
            sections: Vec::new(),
            parsed: Vec::new(),
            warnings: Vec::new(),
            sysenv: std::env::vars().collect(),
            expand_interpolations: true,
        }
    }

    /// Load a project file plus its `extra_configs`.
    ///
    /// A missing file yields an empty configuration; `validate` reports it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::empty(path);
        if path.is_file() {
            config.read(path)?;
        }
        config.maintain_renamed_options();
        Ok(config)
    }

    /// Parse configuration text without touching the filesystem.
    pub fn parse(path: impl AsRef<Path>, content: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::empty(path);
        let sections = loader::parse_ini(content, path)?;
        config.merge(sections);
        config.maintain_renamed_options();
        Ok(config)
    }

    /// Replace the captured process environment used for `sysenv` lookups.
    pub fn with_sysenv(mut self, sysenv: HashMap<String, String>) -> Self {
        self.sysenv = sysenv;
        self
    }

    /// Disable `${section.option}` expansion.
    pub fn without_interpolation(mut self) -> Self {
        self.expand_interpolations = false;
        self
    }

    fn read(&mut self, path: &Path) -> Result<(), ConfigError> {
        if self.parsed.iter().any(|p| p == path) {
            return Ok(());
        }
        self.parsed.push(path.to_path_buf());
        log::debug!("Reading project configuration {}", path.display());

        let sections = loader::read_ini_file(path)?;
        self.merge(sections);

        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        for pattern in self.get_list("platformio", "extra_configs")? {
            for item in expand_config_pattern(&base_dir, &pattern) {
                self.read(&item)?;
            }
        }
        Ok(())
    }

    fn merge(&mut self, sections: Vec<IniSection>) {
        for incoming in sections {
            match self.sections.iter_mut().find(|s| s.name == incoming.name) {
                Some(existing) => {
                    for (key, value) in incoming.options {
                        existing.set(&key, value);
                    }
                }
                None => self.sections.push(incoming),
            }
        }
    }

    fn maintain_renamed_options(&mut self) {
        // legacy `lib_extra_dirs` in [platformio]
        let legacy = self
            .section_mut("platformio")
            .and_then(|s| s.remove("lib_extra_dirs"));
        if let Some(value) = legacy {
            self.add_section("env");
            if let Some(env) = self.section_mut("env") {
                env.set("lib_extra_dirs", value);
            }
            self.warnings.push(
                "`lib_extra_dirs` configuration option is deprecated in section [platformio]! \
                 Please move it to global `env` section"
                    .to_string(),
            );
        }

        let renamed = options::renamed_options();
        let mut warnings = Vec::new();

        for section in self.sections.iter_mut() {
            let scope = scope_of(&section.name).to_string();
            if scope != "platformio" && scope != "env" {
                continue;
            }
            let names: Vec<String> = section.options.iter().map(|(k, _)| k.clone()).collect();
            for option in names {
                if let Some((_, new_name)) = renamed.iter().find(|(old, _)| *old == option) {
                    warnings.push(format!(
                        "`{}` configuration option in section [{}] is deprecated and will be \
                         removed in the next release! Please use `{}` instead",
                        option, section.name, new_name
                    ));
                    if section.has(new_name) {
                        if let Some(value) = section.remove(&option) {
                            section.set(new_name, value);
                        }
                    } else if let Some(entry) =
                        section.options.iter_mut().find(|(k, _)| *k == option)
                    {
                        entry.0 = new_name.to_string();
                    }
                    continue;
                }

                let known = options::lookup(&scope, &option).is_some();
                let custom = scope == "env"
                    && (option.starts_with("custom_") || option.starts_with("board_"));
                if !known && !custom {
                    warnings.push(format!(
                        "Ignore unknown configuration option `{}` in section [{}]",
                        option, section.name
                    ));
                }
            }
        }
        self.warnings.extend(warnings);
    }

    fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    fn section_mut(&mut self, name: &str) -> Option<&mut IniSection> {
        self.sections.iter_mut().find(|s| s.name == name)
    }

    /// Split a raw multi-value string into items.
    ///
    /// Newline separated values win over `", "` separated ones. Empty items,
    /// comment items and inline ` ; comments` are dropped.
    pub fn parse_multi_values(items: &str) -> Vec<String> {
        let parts: Vec<&str> = if items.contains('\n') {
            items.split('\n').collect()
        } else {
            items.split(", ").collect()
        };

        parts
            .into_iter()
            .map(str::trim)
            .filter(|item| !item.is_empty() && !item.starts_with(';') && !item.starts_with('#'))
            .map(|item| {
                if item.contains(';') {
                    INLINE_COMMENT_RE.replace(item, "").trim().to_string()
                } else {
                    item.to_string()
                }
            })
            .collect()
    }

    /// Path of the primary configuration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deprecation and unknown-option warnings collected while loading.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn sections(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.section(name).is_some()
    }

    pub fn add_section(&mut self, name: &str) {
        if !self.has_section(name) {
            self.sections.push(IniSection::new(name));
        }
    }

    /// Environment names in declaration order.
    pub fn envs(&self) -> Vec<String> {
        self.sections
            .iter()
            .filter_map(|s| s.name.strip_prefix("env:"))
            .map(str::to_string)
            .collect()
    }

    pub fn default_envs(&self) -> Result<Vec<String>, ConfigError> {
        self.get_list("platformio", "default_envs")
    }

    /// Option names visible in a section, including inherited `[env]` options
    /// and options provided through system environment variables.
    pub fn options(&self, section: &str) -> Vec<String> {
        let mut result: Vec<String> = self
            .section(section)
            .map(|s| s.options.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default();

        if section.starts_with("env:") {
            if let Some(global) = self.section("env") {
                for (key, _) in &global.options {
                    if !result.contains(key) {
                        result.push(key.clone());
                    }
                }
            }
        }

        let scope = scope_of(section);
        for meta in options::all() {
            if meta.scope != scope || result.iter().any(|o| o == meta.name) {
                continue;
            }
            if let Some(var) = meta.sysenvvar {
                if self.sysenv.contains_key(var) {
                    result.push(meta.name.to_string());
                }
            }
        }
        result
    }

    pub fn has_option(&self, section: &str, option: &str) -> bool {
        if self.section(section).map_or(false, |s| s.has(option)) {
            return true;
        }
        section.starts_with("env:") && self.section("env").map_or(false, |s| s.has(option))
    }

    /// Raw string value with `[env]` fallback and interpolation applied.
    pub fn getraw(&self, section: &str, option: &str) -> Result<Option<String>, ConfigError> {
        self.getraw_at_depth(section, option, 0)
    }

    fn getraw_at_depth(
        &self,
        section: &str,
        option: &str,
        depth: usize,
    ) -> Result<Option<String>, ConfigError> {
        let value = match self.section(section).and_then(|s| s.get(option)) {
            Some(v) => v.to_string(),
            None if section.starts_with("env:") => {
                match self.section("env").and_then(|s| s.get(option)) {
                    Some(v) => v.to_string(),
                    None => return Ok(None),
                }
            }
            None => return Ok(None),
        };

        if !self.expand_interpolations || !value.contains("${") || !value.contains('}') {
            return Ok(Some(value));
        }
        if depth >= MAX_INTERPOLATION_DEPTH {
            return Err(ConfigError::Interpolation {
                section: section.to_string(),
                option: option.to_string(),
                reason: "maximum interpolation depth exceeded".to_string(),
            });
        }

        let mut failure: Option<ConfigError> = None;
        let expanded = VARTPL_RE.replace_all(&value, |caps: &Captures| {
            let (ref_section, ref_option) = (&caps[1], &caps[2]);
            if ref_section == "sysenv" {
                return self.sysenv.get(ref_option).cloned().unwrap_or_default();
            }
            match self.getraw_at_depth(ref_section, ref_option, depth + 1) {
                Ok(Some(v)) => v,
                Ok(None) => {
                    failure.get_or_insert(ConfigError::Interpolation {
                        section: section.to_string(),
                        option: option.to_string(),
                        reason: format!("unknown reference ${{{}.{}}}", ref_section, ref_option),
                    });
                    String::new()
                }
                Err(e) => {
                    failure.get_or_insert(e);
                    String::new()
                }
            }
        });
        let expanded = expanded.into_owned();

        match failure {
            Some(e) => Err(e),
            None => Ok(Some(expanded)),
        }
    }

    /// Typed option lookup.
    ///
    /// Returns `None` when the option is not set anywhere.
    pub fn get(&self, section: &str, option: &str) -> Result<Option<OptionValue>, ConfigError> {
        let raw = self.getraw(section, option)?;
        let scope = scope_of(section);

        let meta = match options::lookup(scope, option) {
            Some(meta) => meta,
            None => return Ok(raw.filter(|v| !v.is_empty()).map(OptionValue::Scalar)),
        };

        let mut value = if meta.multiple {
            raw.map(|v| OptionValue::List(Self::parse_multi_values(&v)))
        } else {
            raw.map(OptionValue::Scalar)
        };

        if let Some(var) = meta.sysenvvar {
            let mut envvar_value = self.sysenv.get(var).filter(|v| !v.is_empty()).cloned();
            if envvar_value.is_none() {
                envvar_value = meta.oldnames.iter().find_map(|old| {
                    self.sysenv
                        .get(&format!("PLATFORMIO_{}", old.to_uppercase()))
                        .filter(|v| !v.is_empty())
                        .cloned()
                });
            }
            if let Some(envvar_value) = envvar_value {
                if meta.multiple {
                    let mut items = value.map(|v| v.to_list()).unwrap_or_default();
                    items.extend(Self::parse_multi_values(&envvar_value));
                    value = Some(OptionValue::List(items));
                } else if value.as_ref().map_or(true, OptionValue::is_empty) {
                    value = Some(OptionValue::Scalar(envvar_value));
                }
            }
        }

        let value = match value {
            Some(value) => value,
            None => return Ok(None),
        };

        for item in value.to_list() {
            meta.kind
                .check(&item)
                .map_err(|message| ConfigError::OptionValue {
                    option: option.to_string(),
                    section: section.to_string(),
                    message,
                })?;
        }
        Ok(Some(value))
    }

    /// List lookup; unset options yield an empty list.
    pub fn get_list(&self, section: &str, option: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self
            .get(section, option)?
            .map(|v| v.to_list())
            .unwrap_or_default())
    }

    /// Scalar lookup; list values are rendered comma-joined.
    pub fn get_str(&self, section: &str, option: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.get(section, option)?.map(|v| v.to_string()))
    }

    /// All options of an environment, in configuration order.
    pub fn items(&self, env: &str) -> Result<EnvOptions, ConfigError> {
        let section = format!("env:{}", env);
        self.section_items(&section)
    }

    /// All options of an arbitrary section.
    pub fn section_items(&self, section: &str) -> Result<EnvOptions, ConfigError> {
        let mut result = EnvOptions::new();
        for option in self.options(section) {
            if let Some(value) = self.get(section, &option)? {
                result.insert(option, value);
            }
        }
        Ok(result)
    }

    /// Set an option; list values are stored one item per line.
    pub fn set(&mut self, section: &str, option: &str, value: OptionValue) {
        let raw = match value {
            OptionValue::Scalar(s) => s,
            OptionValue::List(items) if items.is_empty() => String::new(),
            OptionValue::List(items) => format!("\n{}", items.join("\n")),
        };
        self.add_section(section);
        if let Some(s) = self.section_mut(section) {
            s.set(option, raw);
        }
    }

    /// Check that the project exists and that requested environments are known.
    pub fn validate(&self, envs: &[String]) -> Result<(), ConfigError> {
        if !self.path.is_file() {
            return Err(ConfigError::NotProject(self.path.clone()));
        }

        let known = self.envs();
        if known.is_empty() {
            return Err(ConfigError::EnvsNotAvailable);
        }

        let mut unknown: Vec<String> = Vec::new();
        for name in envs.iter().cloned().chain(self.default_envs()?) {
            if !known.contains(&name) && !unknown.contains(&name) {
                unknown.push(name);
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigError::UnknownEnvNames {
                unknown: unknown.join(", "),
                known: known.join(", "),
            });
        }
        Ok(())
    }

    /// Render every section as a JSON object of option values.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        let mut root = serde_json::Map::new();
        for section in &self.sections {
            let items = self.section_items(&section.name)?;
            let mut obj = serde_json::Map::new();
            for (key, value) in items.iter() {
                obj.insert(key.to_string(), serde_json::to_value(value)?);
            }
            root.insert(section.name.clone(), serde_json::Value::Object(obj));
        }
        Ok(serde_json::to_string(&serde_json::Value::Object(root))?)
    }

    /// Write the configuration to `path` (or back to its own path).
    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let target = path.unwrap_or(&self.path);
        fs::write(target, loader::write_ini(&self.sections))?;
        Ok(())
    }
}

/// Resolve an `extra_configs` entry to existing files.
///
/// `*` and `?` are honoured in the file-name component only.
fn expand_config_pattern(base_dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let pattern_path = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        base_dir.join(pattern)
    };

    let file_pattern = match pattern_path.file_name().and_then(|n| n.to_str()) {
        Some(name) if name.contains('*') || name.contains('?') => name.to_string(),
        _ => {
            return if pattern_path.is_file() {
                vec![pattern_path]
            } else {
                log::warn!("Extra config {} not found", pattern_path.display());
                Vec::new()
            };
        }
    };

    let dir = pattern_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());
    let regex_src = format!(
        "^{}$",
        regex::escape(&file_pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".")
    );
    let re = match Regex::new(&regex_src) {
        Ok(re) => re,
        Err(_) => return Vec::new(),
    };

    let mut matches: Vec<PathBuf> = match fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| re.is_match(n))
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    matches.sort();
    matches
}
