//! Shared fixtures for daemon integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use tailpost_core::config::TailpostConfig;
use tailpost_core::error::{PipelineError, TailpostError};
use tailpost_core::pipeline::{BoxFuture, DynPipeline, HealthStatus};

/// Ordered log of lifecycle calls shared between mock modules.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Mock module that records `start`/`stop` calls into a shared log.
pub struct MockModule {
    name: String,
    log: CallLog,
    running: bool,
    fail_start: bool,
    health: HealthStatus,
}

impl MockModule {
    pub fn new(name: &str, log: &CallLog) -> Self {
        Self {
            name: name.to_owned(),
            log: Arc::clone(log),
            running: false,
            fail_start: false,
            health: HealthStatus::Healthy,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }
}

impl DynPipeline for MockModule {
    fn start(&mut self) -> BoxFuture<'_, Result<(), TailpostError>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("start:{}", self.name));
            if self.fail_start {
                return Err(PipelineError::InitFailed(format!("{} refused", self.name)).into());
            }
            self.running = true;
            Ok(())
        })
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), TailpostError>> {
        Box::pin(async move {
            if !self.running {
                return Err(PipelineError::NotRunning.into());
            }
            self.log.lock().unwrap().push(format!("stop:{}", self.name));
            self.running = false;
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        let health = self.health.clone();
        Box::pin(async move { health })
    }
}

/// Config tailing `*.log` under `dir` with a fast watcher and one trigger.
pub fn tailing_config(dir: &Path) -> TailpostConfig {
    let glob = dir.join("*.log");
    let toml_str = format!(
        r#"
[general]
application = "orders"
hostname = "test-host"

[watcher]
discovery_interval_ms = 20
cleanup_interval_ms = 20
poll_interval_ms = 10

[[parsers]]
name = "plain"
mode = "regex"
regex_pattern = '^(?P<level>\w+) (?P<msg>.*)$'
files_included = ['{}']

[[alerts.triggers]]
name = "errors"
conditions = [{{ field = "level", operator = "is", value = "error" }}]
"#,
        glob.display()
    );
    TailpostConfig::parse(&toml_str).expect("fixture config should parse")
}
