//! Emitter module initialization.

use std::sync::Arc;

use anyhow::Result;
use tailpost_core::config::TailpostConfig;
use tailpost_core::event::EventBus;
use tailpost_core::types::Record;
use tailpost_log_pipeline::{BatchTransport, Emitter, EmitterSettings, HttpTransport};

use super::ModuleHandle;

/// Module name used in logs and health reports.
pub const NAME: &str = "emitter";

/// Initialize the emitter module.
///
/// Returns `None` when `[emitter].enabled` is false.
pub fn init(config: &TailpostConfig, bus: Arc<EventBus<Record>>) -> Result<Option<ModuleHandle>> {
    if !config.emitter.enabled {
        tracing::info!("emitter disabled in configuration");
        return Ok(None);
    }

    let settings = EmitterSettings::from_core(&config.emitter);
    let transport: Arc<dyn BatchTransport> = Arc::new(
        HttpTransport::new(&settings)
            .map_err(|e| anyhow::anyhow!("failed to build HTTP transport: {}", e))?,
    );

    tracing::info!(
        endpoint = transport.target(),
        batch_size = settings.batch_size,
        "initializing emitter"
    );

    let emitter = Emitter::new(settings, transport, bus)
        .map_err(|e| anyhow::anyhow!("failed to build emitter: {}", e))?;

    Ok(Some(ModuleHandle::new(NAME, true, Box::new(emitter))))
}
