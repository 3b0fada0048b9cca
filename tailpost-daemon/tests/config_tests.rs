//! Configuration layering tests.
//!
//! file -> environment -> command line -> validate, as the binary does it.

use clap::Parser;
use serial_test::serial;
use tailpost_core::config::TailpostConfig;
use tailpost_daemon::cli::DaemonCli;
use tailpost_daemon::orchestrator::Orchestrator;

const EXAMPLE: &str = include_str!("../../tailpost.toml.example");

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("tailpost.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[tokio::test]
async fn example_config_passes_check() {
    let config = TailpostConfig::parse(EXAMPLE).expect("example should parse");
    config.validate().expect("example should validate");

    let modules = Orchestrator::check(&config).await.expect("example should compile");
    assert_eq!(modules, vec!["alerter", "watcher"]);
}

#[tokio::test]
#[serial]
async fn cli_overrides_environment() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[general]\nlog_level = \"info\"\n");

    // SAFETY: serialized with #[serial], no other thread reads the environment
    unsafe {
        std::env::set_var("TAILPOST_GENERAL_LOG_LEVEL", "warn");
    }

    let mut config = TailpostConfig::from_file(&path).await.unwrap();
    config.apply_env_overrides();
    assert_eq!(config.general.log_level, "warn");

    let cli = DaemonCli::try_parse_from(["tailpost-daemon", "--debug"]).unwrap();
    cli.apply_overrides(&mut config);
    assert_eq!(config.general.log_level, "debug");
    config.validate().unwrap();

    // SAFETY: see above
    unsafe {
        std::env::remove_var("TAILPOST_GENERAL_LOG_LEVEL");
    }
}

#[tokio::test]
#[serial]
async fn cli_override_can_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");

    let mut config = TailpostConfig::from_file(&path).await.unwrap();
    let cli = DaemonCli::try_parse_from(["tailpost-daemon", "--log-format", "xml"]).unwrap();
    cli.apply_overrides(&mut config);

    assert!(config.validate().is_err());
}

#[tokio::test]
async fn emitter_without_secret_fails_validation() {
    let config = TailpostConfig::parse(
        r#"
[emitter]
enabled = true
server = "collector.local"
"#,
    )
    .unwrap();

    assert!(Orchestrator::check(&config).await.is_err());
}

#[tokio::test]
async fn duplicate_inline_triggers_fail_check() {
    let config = TailpostConfig::parse(
        r#"
[[alerts.triggers]]
name = "dup"
conditions = [{ field = "level", operator = "is", value = "error" }]

[[alerts.triggers]]
name = "dup"
conditions = [{ field = "level", operator = "is", value = "warn" }]
"#,
    )
    .unwrap();

    let err = Orchestrator::check(&config).await.unwrap_err();
    assert!(err.to_string().contains("trigger"), "got: {err}");
}
