//! Core data types for pio_run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Value of a single configuration option.
///
/// Options declared as `multiple` in the registry are always lists, everything
/// else stays a scalar string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Scalar(String),
    List(Vec<String>),
}

impl OptionValue {
    /// Items of the value; a scalar yields a single item.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            OptionValue::Scalar(s) => vec![s.clone()],
            OptionValue::List(items) => items.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            OptionValue::Scalar(s) => s.is_empty(),
            OptionValue::List(items) => items.is_empty(),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Scalar(s) => write!(f, "{}", s),
            OptionValue::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(s: &str) -> Self {
        OptionValue::Scalar(s.to_string())
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(items: Vec<String>) -> Self {
        OptionValue::List(items)
    }
}

/// Options of one environment, in configuration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOptions {
    entries: Vec<(String, OptionValue)>,
}

impl EnvOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an option, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: OptionValue) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, OptionValue)> for EnvOptions {
    fn from_iter<I: IntoIterator<Item = (K, OptionValue)>>(iter: I) -> Self {
        let mut options = EnvOptions::new();
        for (k, v) in iter {
            options.insert(k, v);
        }
        options
    }
}

/// Variables handed to the platform's build run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BuildVariables(BTreeMap<String, String>);

impl BuildVariables {
    pub const ENV_NAME: &'static str = "pioenv";
    pub const PROJECT_CONFIG: &'static str = "project_config";
    pub const TEST_RUNNING_NAME: &'static str = "piotest_running_name";
    pub const UPLOAD_PORT: &'static str = "upload_port";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of a delegated platform run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunResult {
    /// Zero means success.
    pub returncode: i32,
    /// Captured builder output (silent runs only).
    pub output: Option<String>,
}

impl RunResult {
    pub fn new(returncode: i32) -> Self {
        RunResult {
            returncode,
            output: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.returncode == 0
    }
}

/// Session metadata supplied by the caller.
///
/// Set by the unit-test runner when it drives the run command for a test build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionMeta {
    /// Suppresses the per-environment result footer.
    pub test_is_running: bool,
    /// Name of the test currently being built, exported as a build variable.
    pub test_running_name: Option<String>,
}

impl SessionMeta {
    pub fn test(name: impl Into<String>) -> Self {
        SessionMeta {
            test_is_running: true,
            test_running_name: Some(name.into()),
        }
    }
}

/// Final status of one environment in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvStatus {
    Success,
    Failed,
    /// Not selected for this run.
    Ignored,
}

impl EnvStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvStatus::Success => "SUCCESS",
            EnvStatus::Failed => "FAILED",
            EnvStatus::Ignored => "IGNORED",
        }
    }
}

impl fmt::Display for EnvStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An environment name paired with its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOutcome {
    pub name: String,
    pub status: EnvStatus,
}
