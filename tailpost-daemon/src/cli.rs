//! CLI argument definitions for tailpost-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use tailpost_core::config::TailpostConfig;

/// Log level forced by `--debug`.
const DEBUG_LEVEL: &str = "debug";

/// tailpost log shipping agent.
///
/// Tails log files, parses each line into a record, raises alerts on
/// matching triggers and ships batches to a remote collector.
#[derive(Parser, Debug)]
#[command(name = "tailpost-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to tailpost.toml configuration file.
    #[arg(short, long, default_value = "/etc/tailpost/tailpost.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Force the `debug` log level, ignoring `--log-level`.
    #[arg(long)]
    pub debug: bool,

    /// Validate configuration, parsers and trigger rules, then exit.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut TailpostConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if self.debug {
            config.general.log_level = DEBUG_LEVEL.to_owned();
        }
    }
}
