//! tailpost.toml 통합 설정 테스트
//!
//! - tailpost.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use tailpost_core::config::{ParserMode, RecipientKind, TailpostConfig, TriggerOperator};
use tailpost_core::error::{ConfigError, TailpostError};

const EXAMPLE: &str = include_str!("../../../tailpost.toml.example");

// =============================================================================
// tailpost.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = TailpostConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.general.application, "tailpost");
    assert_eq!(config.general.workspace, "default");
}

#[test]
fn example_config_passes_validation() {
    let config = TailpostConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_both_parser_modes() {
    let config = TailpostConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(config.parsers.len(), 2);
    let nginx = &config.parsers[0];
    assert_eq!(nginx.name, "nginx");
    assert_eq!(nginx.mode, ParserMode::Regex);
    assert_eq!(nginx.files_excluded, vec!["/var/log/nginx/*error*.log"]);
    assert_eq!(
        nginx.date_extract.as_ref().map(|d| d.field.as_str()),
        Some("time")
    );

    let app = &config.parsers[1];
    assert_eq!(app.mode, ParserMode::Json);
    assert_eq!(app.json_fields["user"], "context.user.id");
    assert!(app.regex_pattern.is_none());
}

#[test]
fn example_config_has_triggers_and_recipients() {
    let config = TailpostConfig::parse(EXAMPLE).expect("should parse");

    assert_eq!(config.alerts.recipients.len(), 1);
    assert_eq!(config.alerts.recipients[0].kind, RecipientKind::Email);
    assert_eq!(config.alerts.triggers.len(), 2);

    let nginx = &config.alerts.triggers[0];
    assert_eq!(nginx.conditions.len(), 2);
    assert_eq!(nginx.conditions[1].operator, TriggerOperator::StartWith);
    assert_eq!(
        config.alerts.triggers[1].conditions[1].operator,
        TriggerOperator::NotContains
    );
}

#[test]
fn example_config_matches_code_defaults() {
    let from_file = TailpostConfig::parse(EXAMPLE).expect("should parse");
    let from_code = TailpostConfig::default();

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);

    assert_eq!(
        from_file.watcher.discovery_interval_ms,
        from_code.watcher.discovery_interval_ms
    );
    assert_eq!(
        from_file.watcher.poll_interval_ms,
        from_code.watcher.poll_interval_ms
    );
    assert_eq!(
        from_file.watcher.max_line_length,
        from_code.watcher.max_line_length
    );

    assert_eq!(
        from_file.alerts.frequency_secs,
        from_code.alerts.frequency_secs
    );
    assert_eq!(from_file.alerts.workers, from_code.alerts.workers);

    assert_eq!(from_file.emitter.enabled, from_code.emitter.enabled);
    assert_eq!(from_file.emitter.port, from_code.emitter.port);
    assert_eq!(
        from_file.emitter.frequency_secs,
        from_code.emitter.frequency_secs
    );
    assert_eq!(from_file.emitter.batch_size, from_code.emitter.batch_size);
    assert_eq!(
        from_file.emitter.buffer_capacity,
        from_code.emitter.buffer_capacity
    );

    assert_eq!(from_file.metrics.port, from_code.metrics.port);
    assert_eq!(from_file.metrics.endpoint, from_code.metrics.endpoint);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_general_only() {
    let toml = r#"
[general]
log_level = "debug"
log_format = "pretty"
"#;
    let config = TailpostConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    // 나머지 섹션은 기본값
    assert!(config.parsers.is_empty());
    assert!(!config.emitter.enabled);
    assert!(!config.alerts.has_rules());
}

#[test]
fn partial_config_emitter_only() {
    let toml = r#"
[emitter]
enabled = true
scheme = "https"
server = "collector.internal"
secret = "s3cret"
batch_size = 500
"#;
    let config = TailpostConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.emitter.scheme, "https");
    assert_eq!(config.emitter.batch_size, 500);
    // 생략된 필드는 기본값
    assert_eq!(config.emitter.port, 59302);
    assert_eq!(config.emitter.timeout_secs, 30);
}

#[test]
fn partial_config_watcher_only() {
    let toml = r#"
[watcher]
poll_interval_ms = 50
"#;
    let config = TailpostConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.watcher.poll_interval_ms, 50);
    assert_eq!(config.watcher.discovery_interval_ms, 1000);
}

#[test]
fn partial_config_rule_dir_enables_alerts() {
    let toml = r#"
[alerts]
rule_dir = "/etc/tailpost/triggers"
"#;
    let config = TailpostConfig::parse(toml).expect("should parse");
    config.validate().expect("should validate");
    assert!(config.alerts.has_rules());
    assert!(config.alerts.triggers.is_empty());
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[general]
log_level = "info"
"#;

    let original = std::env::var("TAILPOST_GENERAL_LOG_LEVEL").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TAILPOST_GENERAL_LOG_LEVEL", "error");
    }

    let mut config = TailpostConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.general.log_level.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TAILPOST_GENERAL_LOG_LEVEL", val),
            None => std::env::remove_var("TAILPOST_GENERAL_LOG_LEVEL"),
        }
    }

    assert_eq!(result, "error");
}

#[test]
#[serial_test::serial]
fn env_override_secret_fills_disabled_default() {
    let original = std::env::var("TAILPOST_EMITTER_SECRET").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TAILPOST_EMITTER_SECRET", "from-env");
    }

    let mut config = TailpostConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.emitter.secret.clone();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TAILPOST_EMITTER_SECRET", val),
            None => std::env::remove_var("TAILPOST_EMITTER_SECRET"),
        }
    }

    assert_eq!(result, "from-env");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("TAILPOST_METRICS_ENABLED").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TAILPOST_METRICS_ENABLED", "true");
    }

    let mut config = TailpostConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.metrics.enabled;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TAILPOST_METRICS_ENABLED", val),
            None => std::env::remove_var("TAILPOST_METRICS_ENABLED"),
        }
    }

    assert!(result);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_number_is_ignored() {
    let original = std::env::var("TAILPOST_EMITTER_FREQUENCY_SECS").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("TAILPOST_EMITTER_FREQUENCY_SECS", "soon");
    }

    let mut config = TailpostConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.emitter.frequency_secs;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("TAILPOST_EMITTER_FREQUENCY_SECS", val),
            None => std::env::remove_var("TAILPOST_EMITTER_FREQUENCY_SECS"),
        }
    }

    assert_eq!(result, 5);
}

// =============================================================================
// 파일 로딩 / 에러 테스트
// =============================================================================

#[tokio::test]
async fn load_from_file_applies_validation() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tailpost.toml");
    std::fs::write(&path, "[general]\nlog_level = \"loud\"\n").expect("write");

    let err = TailpostConfig::from_file(&path).await.unwrap_err();
    assert!(matches!(
        err,
        TailpostError::Config(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn load_from_file_reads_example() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tailpost.toml");
    std::fs::write(&path, EXAMPLE).expect("write");

    let config = TailpostConfig::from_file(&path).await.expect("should load");
    assert_eq!(config.parsers.len(), 2);
}

#[test]
fn empty_file_yields_defaults() {
    let config = TailpostConfig::parse("").expect("empty config is valid");
    config.validate().expect("defaults validate");
    assert_eq!(config.general.application, "tailpost");
}

#[test]
fn wrong_type_is_parse_error() {
    let err = TailpostConfig::parse("[emitter]\nport = \"high\"\n").unwrap_err();
    assert!(matches!(
        err,
        TailpostError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_parser_mode_is_parse_error() {
    let toml = r#"
[[parsers]]
name = "x"
mode = "xml"
files_included = ["/tmp/*.log"]
"#;
    assert!(TailpostConfig::parse(toml).is_err());
}
