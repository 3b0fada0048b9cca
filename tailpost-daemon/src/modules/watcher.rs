//! Watcher module initialization.
//!
//! Compiles every `[[parsers]]` definition, warms the shared regex cache
//! and wraps the [`Watcher`] in a [`ModuleHandle`].

use std::sync::Arc;

use anyhow::Result;
use tailpost_core::config::TailpostConfig;
use tailpost_core::event::EventBus;
use tailpost_core::types::Record;
use tailpost_log_pipeline::{LineParser, ParserDefinition, Watcher, WatcherSettings};

use super::ModuleHandle;

/// Module name used in logs and health reports.
pub const NAME: &str = "watcher";

/// Compile parser definitions from configuration.
///
/// Fails on the first invalid regex or include glob.
pub fn compile_parsers(config: &TailpostConfig) -> Result<(Vec<ParserDefinition>, Arc<LineParser>)> {
    let definitions = config
        .parsers
        .iter()
        .map(ParserDefinition::from_config)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("invalid parser definition: {}", e))?;

    let parser =
        LineParser::new(config.identity()).with_max_line_length(config.watcher.max_line_length);
    parser
        .warm(&definitions)
        .map_err(|e| anyhow::anyhow!("failed to compile parser patterns: {}", e))?;

    Ok((definitions, Arc::new(parser)))
}

/// Initialize the watcher module.
///
/// The watcher is always enabled; with no parsers it idles.
pub fn init(config: &TailpostConfig, bus: Arc<EventBus<Record>>) -> Result<Option<ModuleHandle>> {
    let (definitions, parser) = compile_parsers(config)?;
    if definitions.is_empty() {
        tracing::warn!("no parsers configured, watcher will not follow any file");
    }

    tracing::info!(parsers = definitions.len(), "initializing watcher");

    let settings = WatcherSettings::from_core(&config.watcher);
    let watcher = Watcher::new(settings, definitions, parser, bus)
        .map_err(|e| anyhow::anyhow!("failed to build watcher: {}", e))?;

    Ok(Some(ModuleHandle::new(NAME, true, Box::new(watcher))))
}
