//! Alerter module initialization.
//!
//! Loads inline and directory trigger rules, builds the notifier set from
//! `[[alerts.recipients]]` and wraps the [`Alerter`] in a [`ModuleHandle`].

use std::sync::Arc;

use anyhow::Result;
use tailpost_core::config::TailpostConfig;
use tailpost_core::event::EventBus;
use tailpost_core::pipeline::Notifier;
use tailpost_core::types::Record;
use tailpost_log_pipeline::trigger::load_rules;
use tailpost_log_pipeline::{Alerter, AlerterSettings, NotifierSet};

use super::ModuleHandle;

/// Module name used in logs and health reports.
pub const NAME: &str = "alerter";

/// Initialize the alerter module.
///
/// # Returns
///
/// * `Ok(Some(ModuleHandle))` - at least one trigger rule is configured
/// * `Ok(None)` - no inline triggers and no rule directory
/// * `Err(_)` - a rule file or recipient is invalid
pub async fn init(
    config: &TailpostConfig,
    bus: Arc<EventBus<Record>>,
) -> Result<Option<ModuleHandle>> {
    if !config.alerts.has_rules() {
        tracing::info!("no trigger rules configured, alerter disabled");
        return Ok(None);
    }

    let matcher = load_rules(&config.alerts)
        .await
        .map_err(|e| anyhow::anyhow!("failed to load trigger rules: {}", e))?;

    let notifiers = NotifierSet::from_recipients(&config.alerts.recipients)
        .map_err(|e| anyhow::anyhow!("failed to build notifiers: {}", e))?;

    tracing::info!(
        rules = matcher.rule_count(),
        notifiers = ?notifiers.names(),
        "initializing alerter"
    );

    let notifier: Arc<dyn Notifier> = Arc::new(notifiers);
    let settings = AlerterSettings::from_core(&config.general, &config.alerts);
    let alerter = Alerter::new(settings, matcher, notifier, bus)
        .map_err(|e| anyhow::anyhow!("failed to build alerter: {}", e))?;

    Ok(Some(ModuleHandle::new(NAME, true, Box::new(alerter))))
}
