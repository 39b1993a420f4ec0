//! Shared fixtures for integration tests: project directories and recording
//! collaborators.

#![allow(dead_code)]

use pio_run::config::PROJECT_CONFIG_FILE;
use pio_run::ui::{Console, SharedBuffer};
use pio_run::{
    BuildVariables, EnvOptions, MonitorLauncher, Platform, PlatformError, PlatformFactory,
    PlatformInstaller, RunContext, RunResult, SessionMeta, Telemetry,
};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub fn write_project(content: &str) -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    fs::write(temp.path().join(PROJECT_CONFIG_FILE), content).expect("Failed to write project");
    temp
}

#[derive(Debug, Clone)]
pub struct PlatformCall {
    pub platform: String,
    pub variables: BuildVariables,
    pub targets: Vec<String>,
    pub silent: bool,
    pub verbose: bool,
    pub jobs: usize,
}

/// Everything the fake collaborators observed during a run.
#[derive(Default, Clone)]
pub struct Recorder {
    pub lookups: Arc<Mutex<Vec<String>>>,
    pub installs: Arc<Mutex<Vec<(Vec<String>, bool)>>>,
    pub runs: Arc<Mutex<Vec<PlatformCall>>>,
    pub telemetry: Arc<Mutex<Vec<(Vec<String>, Vec<String>)>>>,
    pub monitors: Arc<Mutex<Vec<Option<String>>>>,
}

impl Recorder {
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn installs(&self) -> Vec<(Vec<String>, bool)> {
        self.installs.lock().unwrap().clone()
    }

    pub fn runs(&self) -> Vec<PlatformCall> {
        self.runs.lock().unwrap().clone()
    }

    pub fn telemetry(&self) -> Vec<(Vec<String>, Vec<String>)> {
        self.telemetry.lock().unwrap().clone()
    }

    pub fn monitors(&self) -> Vec<Option<String>> {
        self.monitors.lock().unwrap().clone()
    }
}

struct FakePlatform {
    id: String,
    returncode: i32,
    delay: Duration,
    recorder: Recorder,
}

impl Platform for FakePlatform {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(
        &self,
        variables: &BuildVariables,
        targets: &[String],
        silent: bool,
        verbose: bool,
        jobs: usize,
    ) -> Result<RunResult, PlatformError> {
        self.recorder.runs.lock().unwrap().push(PlatformCall {
            platform: self.id.clone(),
            variables: variables.clone(),
            targets: targets.to_vec(),
            silent,
            verbose,
            jobs,
        });
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(RunResult::new(self.returncode))
    }
}

/// Factory whose platforms become available once installed.
pub struct FakeFactory {
    pub installed: Arc<Mutex<Vec<String>>>,
    /// Platform ids that fail their builds with this return code.
    pub failing: Vec<(String, i32)>,
    /// How long every platform run takes.
    pub build_delay: Duration,
    pub recorder: Recorder,
}

impl PlatformFactory for FakeFactory {
    fn new_platform(&self, id: &str) -> Result<Box<dyn Platform>, PlatformError> {
        self.recorder.lookups.lock().unwrap().push(id.to_string());
        if !self.installed.lock().unwrap().iter().any(|p| p == id) {
            return Err(PlatformError::UnknownPlatform(id.to_string()));
        }
        let returncode = self
            .failing
            .iter()
            .find(|(p, _)| p == id)
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(Box::new(FakePlatform {
            id: id.to_string(),
            returncode,
            delay: self.build_delay,
            recorder: self.recorder.clone(),
        }))
    }
}

/// Installer that makes the platform visible to [`FakeFactory`].
pub struct FakeInstaller {
    pub installed: Arc<Mutex<Vec<String>>>,
    /// Installation "succeeds" without making the platform available.
    pub broken: bool,
    pub recorder: Recorder,
}

impl PlatformInstaller for FakeInstaller {
    fn install(
        &self,
        platforms: &[String],
        skip_default_package: bool,
    ) -> Result<(), PlatformError> {
        self.recorder
            .installs
            .lock()
            .unwrap()
            .push((platforms.to_vec(), skip_default_package));
        if !self.broken {
            self.installed.lock().unwrap().extend(platforms.iter().cloned());
        }
        Ok(())
    }
}

struct FakeTelemetry(Recorder);

impl Telemetry for FakeTelemetry {
    fn on_run_environment(&self, options: &EnvOptions, targets: &[String]) {
        let names = options.iter().map(|(k, _)| k.to_string()).collect();
        self.0.telemetry.lock().unwrap().push((names, targets.to_vec()));
    }
}

struct FakeMonitor(Recorder);

impl MonitorLauncher for FakeMonitor {
    fn launch(&self, environment: Option<&str>) -> Result<(), PlatformError> {
        self.0.monitors.lock().unwrap().push(environment.map(str::to_string));
        Ok(())
    }
}

/// Builder for a [`RunContext`] backed by recording fakes.
pub struct Harness {
    pub installed: Vec<String>,
    pub failing: Vec<(String, i32)>,
    pub broken_installer: bool,
    pub build_delay: Duration,
    pub session: SessionMeta,
    pub width: usize,
}

impl Default for Harness {
    fn default() -> Self {
        Harness {
            installed: vec!["atmelavr".to_string()],
            failing: Vec::new(),
            broken_installer: false,
            build_delay: Duration::ZERO,
            session: SessionMeta::default(),
            width: 60,
        }
    }
}

impl Harness {
    pub fn build(self) -> (RunContext, Recorder, SharedBuffer, SharedBuffer) {
        let recorder = Recorder::default();
        let installed = Arc::new(Mutex::new(self.installed));
        let (console, out, err) = Console::buffered(self.width);
        let ctx = RunContext {
            session: self.session,
            factory: Box::new(FakeFactory {
                installed: Arc::clone(&installed),
                failing: self.failing,
                build_delay: self.build_delay,
                recorder: recorder.clone(),
            }),
            installer: Box::new(FakeInstaller {
                installed,
                broken: self.broken_installer,
                recorder: recorder.clone(),
            }),
            telemetry: Box::new(FakeTelemetry(recorder.clone())),
            monitor: Box::new(FakeMonitor(recorder.clone())),
            console,
        };
        (ctx, recorder, out, err)
    }
}
