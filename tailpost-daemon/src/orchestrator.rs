//! Module orchestration -- assembly, bus wiring, and lifecycle management.
//!
//! The [`Orchestrator`] is the central coordinator of `tailpost-daemon`.
//! It owns the validated configuration and the record bus shared by all
//! modules, and drives startup and shutdown ordering.
//!
//! # Startup Order (consumers before the producer)
//!
//! 1. Alerter (subscribes to `record.discovered`)
//! 2. Emitter (subscribes to `record.discovered`)
//! 3. Watcher (publishes `record.discovered`)
//!
//! # Shutdown Order (reverse)
//!
//! 1. Watcher (stop tailing, no more records)
//! 2. Emitter (final flush of buffered records)
//! 3. Alerter (drain queue, final notification)

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;

use tailpost_core::config::TailpostConfig;
use tailpost_core::event::EventBus;
use tailpost_core::metrics as m;
use tailpost_core::types::Record;

use crate::health::DaemonHealth;
use crate::metrics_server;
use crate::modules::{self, ModuleRegistry};

/// Interval between uptime gauge updates.
const UPTIME_INTERVAL: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: TailpostConfig,
    /// Record bus shared by the watcher, alerter and emitter.
    bus: Arc<EventBus<Record>>,
    /// Registered modules (ordered for start/stop).
    modules: ModuleRegistry,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon build time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// Applies environment overrides and validates before building.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = TailpostConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    ///
    /// # Errors
    ///
    /// - Configuration validation fails
    /// - A parser pattern, include glob or trigger rule is invalid
    /// - The metrics listener cannot be installed
    pub async fn build_from_config(config: TailpostConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        // Recorder must exist before components register their metrics
        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let bus = Arc::new(EventBus::new());
        let modules = modules::build_registry(&config, &bus).await?;
        let (shutdown_tx, _) = broadcast::channel(4);

        tracing::info!(
            modules = ?modules.names(),
            application = %config.general.application,
            "orchestrator initialized"
        );

        if config.metrics.enabled {
            record_daemon_metrics(modules.count());
        }

        Ok(Self {
            config,
            bus,
            modules,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Validate configuration and compile every parser and trigger rule
    /// without starting anything.
    ///
    /// Returns the names of the modules that would run.
    pub async fn check(config: &TailpostConfig) -> Result<Vec<String>> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        let bus = Arc::new(EventBus::new());
        let registry = modules::build_registry(config, &bus).await?;
        Ok(registry.names().into_iter().map(str::to_owned).collect())
    }

    /// Start all modules.
    ///
    /// On failure, modules that already started are stopped again.
    pub async fn start(&mut self) -> Result<()> {
        tracing::info!("starting all modules");
        if let Err(e) = self.modules.start_all().await {
            tracing::warn!("startup failed, rolling back already-started modules");
            if let Err(stop_err) = self.modules.stop_all().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Start all modules and block until SIGTERM or SIGINT.
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Start all modules, wait for `shutdown` to resolve, then stop them.
    ///
    /// `shutdown` yields the name of the trigger for logging.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = Result<&'static str>>,
    {
        self.start().await?;

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe()));

        tracing::info!("tailpost running");
        let signal = match shutdown.await {
            Ok(signal) => signal,
            Err(e) => {
                tracing::error!(error = %e, "shutdown signal handler failed");
                "error"
            }
        };
        tracing::info!(signal, "shutdown signal received");

        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        self.shutdown().await
    }

    /// Stop all modules in reverse start order.
    pub async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping all modules");
        self.modules.stop_all().await?;
        tracing::info!("tailpost shut down");
        Ok(())
    }

    /// Current aggregated health.
    pub async fn health(&self) -> DaemonHealth {
        let modules = self.modules.health_statuses().await;
        DaemonHealth::from_modules(modules, self.start_time.elapsed())
    }

    /// Names of the registered modules in start order.
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.names()
    }

    /// The record bus shared by all modules.
    pub fn bus(&self) -> &Arc<EventBus<Record>> {
        &self.bus
    }

    /// The loaded configuration.
    pub fn config(&self) -> &TailpostConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for Ctrl+C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to install Ctrl+C handler: {}", e))?;
    Ok("SIGINT")
}

fn record_daemon_metrics(module_count: usize) {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_COMPONENTS_REGISTERED).set(module_count as f64);
}

/// Periodically refresh the uptime gauge until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
