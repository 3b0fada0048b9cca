//! 설정 관리 -- tailpost.toml 파싱 및 런타임 설정
//!
//! [`TailpostConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//! 시작 시 한 번 로드되어 각 컴포넌트 생성자에 전달되며,
//! 컴포넌트는 전역 상태를 참조하지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TAILPOST_EMITTER_SERVER=collector.local` 형식)
//! 3. 설정 파일 (`tailpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tailpost_core::error::TailpostError> {
//! use tailpost_core::config::TailpostConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TailpostConfig::load("tailpost.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TailpostConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TailpostError};
use crate::types::HostIdentity;

/// tailpost 통합 설정
///
/// `tailpost.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 컴포넌트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TailpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 파일 감시 설정
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// 파서 정의 목록
    #[serde(default)]
    pub parsers: Vec<ParserConfig>,
    /// 알림 설정
    #[serde(default)]
    pub alerts: AlertsConfig,
    /// 원격 전송 설정
    #[serde(default)]
    pub emitter: EmitterConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl TailpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TailpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TailpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TailpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TailpostError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TailpostError> {
        toml::from_str(toml_str).map_err(|e| {
            TailpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 레코드 메타데이터에 들어갈 호스트 식별 정보를 만듭니다.
    pub fn identity(&self) -> HostIdentity {
        HostIdentity::new(
            self.general.application.clone(),
            self.general.workspace.clone(),
            self.general.resolved_hostname(),
        )
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TAILPOST_{SECTION}_{FIELD}`
    /// 예: `TAILPOST_EMITTER_SECRET=...`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TAILPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TAILPOST_GENERAL_LOG_FORMAT");
        override_string(
            &mut self.general.application,
            "TAILPOST_GENERAL_APPLICATION",
        );
        override_string(&mut self.general.hostname, "TAILPOST_GENERAL_HOSTNAME");
        override_string(&mut self.general.workspace, "TAILPOST_GENERAL_WORKSPACE");

        // Watcher
        override_u64(
            &mut self.watcher.discovery_interval_ms,
            "TAILPOST_WATCHER_DISCOVERY_INTERVAL_MS",
        );
        override_u64(
            &mut self.watcher.cleanup_interval_ms,
            "TAILPOST_WATCHER_CLEANUP_INTERVAL_MS",
        );
        override_u64(
            &mut self.watcher.poll_interval_ms,
            "TAILPOST_WATCHER_POLL_INTERVAL_MS",
        );

        // Alerts
        override_u64(
            &mut self.alerts.frequency_secs,
            "TAILPOST_ALERTS_FREQUENCY_SECS",
        );
        override_string(&mut self.alerts.rule_dir, "TAILPOST_ALERTS_RULE_DIR");

        // Emitter
        override_bool(&mut self.emitter.enabled, "TAILPOST_EMITTER_ENABLED");
        override_string(&mut self.emitter.scheme, "TAILPOST_EMITTER_SCHEME");
        override_string(&mut self.emitter.server, "TAILPOST_EMITTER_SERVER");
        override_u16(&mut self.emitter.port, "TAILPOST_EMITTER_PORT");
        override_string(&mut self.emitter.secret, "TAILPOST_EMITTER_SECRET");
        override_u64(
            &mut self.emitter.frequency_secs,
            "TAILPOST_EMITTER_FREQUENCY_SECS",
        );
        override_u64(
            &mut self.emitter.timeout_secs,
            "TAILPOST_EMITTER_TIMEOUT_SECS",
        );
        override_usize(&mut self.emitter.batch_size, "TAILPOST_EMITTER_BATCH_SIZE");
        override_usize(
            &mut self.emitter.buffer_capacity,
            "TAILPOST_EMITTER_BUFFER_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TAILPOST_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "TAILPOST_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "TAILPOST_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailpostError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.general.application.is_empty() {
            return Err(invalid("general.application", "must not be empty"));
        }

        self.watcher.validate()?;

        let mut seen = HashSet::new();
        for (idx, parser) in self.parsers.iter().enumerate() {
            parser.validate(idx)?;
            if !seen.insert(parser.name.as_str()) {
                return Err(invalid(
                    &format!("parsers[{idx}].name"),
                    format!("duplicate parser name '{}'", parser.name),
                ));
            }
        }

        self.alerts.validate()?;
        self.emitter.validate()?;

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 애플리케이션 이름 (레코드 메타데이터, 알림 제목)
    pub application: String,
    /// 호스트명 (비어 있으면 자동 감지)
    pub hostname: String,
    /// 워크스페이스
    pub workspace: String,
}

impl GeneralConfig {
    /// 설정된 호스트명, 없으면 `HOSTNAME` 환경변수, `/etc/hostname` 순으로 조회합니다.
    pub fn resolved_hostname(&self) -> String {
        if !self.hostname.is_empty() {
            return self.hostname.clone();
        }
        if let Ok(name) = std::env::var("HOSTNAME") {
            let name = name.trim();
            if !name.is_empty() {
                return name.to_owned();
            }
        }
        std::fs::read_to_string("/etc/hostname")
            .ok()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "localhost".to_owned())
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            application: "tailpost".to_owned(),
            hostname: String::new(),
            workspace: String::new(),
        }
    }
}

/// 파일 감시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// 파일 탐색 주기 (밀리초)
    pub discovery_interval_ms: u64,
    /// 사라진 파일 정리 주기 (밀리초)
    pub cleanup_interval_ms: u64,
    /// 새 라인 폴링 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트, 초과분은 잘림)
    pub max_line_length: usize,
}

impl WatcherConfig {
    fn validate(&self) -> Result<(), TailpostError> {
        for (field, value) in [
            ("watcher.discovery_interval_ms", self.discovery_interval_ms),
            ("watcher.cleanup_interval_ms", self.cleanup_interval_ms),
            ("watcher.poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(invalid(field, "must be greater than 0"));
            }
        }
        if self.max_line_length == 0 {
            return Err(invalid("watcher.max_line_length", "must be greater than 0"));
        }
        Ok(())
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            discovery_interval_ms: 1000,
            cleanup_interval_ms: 1000,
            poll_interval_ms: 250,
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 파서 모드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParserMode {
    /// 정규식 named capture group
    Regex,
    /// JSON 객체 필드 매핑
    Json,
}

impl fmt::Display for ParserMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex => write!(f, "regex"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// 날짜 추출 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateExtractConfig {
    /// 날짜가 담긴 추출 필드 이름
    pub field: String,
    /// chrono 형식 문자열 (`%Y-%m-%d %H:%M:%S`) 또는 `rfc3339`, `rfc2822`
    pub format: String,
}

/// 파서 정의
///
/// ```toml
/// [[parsers]]
/// name = "nginx"
/// mode = "regex"
/// regex_pattern = '^(?P<ip>\S+) .* "(?P<method>\w+) (?P<path>\S+).*" (?P<status>\d+)'
/// files_included = ["/var/log/nginx/*.log"]
/// files_excluded = ["/var/log/nginx/*.gz"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserConfig {
    /// 파서 이름 (고유)
    pub name: String,
    /// 파싱 모드
    pub mode: ParserMode,
    /// regex 모드 패턴
    #[serde(default)]
    pub regex_pattern: Option<String>,
    /// json 모드 필드 매핑: 출력 필드 -> 점(.) 구분 소스 경로
    #[serde(default)]
    pub json_fields: BTreeMap<String, String>,
    /// 포함 glob 패턴
    #[serde(default)]
    pub files_included: Vec<String>,
    /// 제외 glob 패턴
    #[serde(default)]
    pub files_excluded: Vec<String>,
    /// 날짜 추출
    #[serde(default)]
    pub date_extract: Option<DateExtractConfig>,
}

impl ParserConfig {
    fn validate(&self, idx: usize) -> Result<(), TailpostError> {
        let prefix = format!("parsers[{idx}]");

        if self.name.is_empty() {
            return Err(invalid(&format!("{prefix}.name"), "must not be empty"));
        }

        match self.mode {
            ParserMode::Regex => {
                if self.regex_pattern.as_deref().is_none_or(str::is_empty) {
                    return Err(invalid(
                        &format!("{prefix}.regex_pattern"),
                        format!("parser '{}' in regex mode requires a pattern", self.name),
                    ));
                }
            }
            ParserMode::Json => {
                if self.json_fields.is_empty() {
                    return Err(invalid(
                        &format!("{prefix}.json_fields"),
                        format!("parser '{}' in json mode requires at least one field", self.name),
                    ));
                }
                if let Some((field, _)) = self
                    .json_fields
                    .iter()
                    .find(|(k, v)| k.is_empty() || v.is_empty() || v.split('.').any(str::is_empty))
                {
                    return Err(invalid(
                        &format!("{prefix}.json_fields.{field}"),
                        "field name and source path must be non-empty",
                    ));
                }
            }
        }

        if self.files_included.is_empty() {
            return Err(invalid(
                &format!("{prefix}.files_included"),
                format!("parser '{}' must include at least one glob", self.name),
            ));
        }

        if let Some(date) = &self.date_extract {
            if date.field.is_empty() || date.format.is_empty() {
                return Err(invalid(
                    &format!("{prefix}.date_extract"),
                    "field and format must not be empty",
                ));
            }
        }

        Ok(())
    }
}

/// 알림 수신자 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    /// 이메일 주소
    Email,
    /// Slack 호환 웹훅 URL
    SlackWebhook,
}

/// 알림 수신자
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientConfig {
    /// 수신자 종류
    pub kind: RecipientKind,
    /// 주소 또는 URL
    pub recipient: String,
}

/// 트리거 조건 연산자
///
/// `match_regex`를 제외한 모든 연산자는 대소문자를 구분하지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerOperator {
    /// 정규식 매칭 (`regex` 별칭 허용)
    #[serde(alias = "regex")]
    MatchRegex,
    /// 일치
    Is,
    /// 불일치
    IsNot,
    /// 부분 문자열 포함
    Contains,
    /// 부분 문자열 미포함
    NotContains,
    /// 접두사 일치
    StartWith,
    /// 접두사 불일치
    NotStartWith,
}

impl fmt::Display for TriggerOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MatchRegex => "match_regex",
            Self::Is => "is",
            Self::IsNot => "is_not",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::StartWith => "start_with",
            Self::NotStartWith => "not_start_with",
        };
        f.write_str(name)
    }
}

/// 트리거 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionConfig {
    /// 필드 이름 (`_parser`, `_filename`은 메타데이터)
    pub field: String,
    /// 연산자
    pub operator: TriggerOperator,
    /// 비교 값
    pub value: String,
}

/// 트리거 규칙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// 규칙 이름
    pub name: String,
    /// 조건 목록 (AND 결합)
    #[serde(default)]
    pub conditions: Vec<ConditionConfig>,
}

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// 알림 플러시 주기 (초)
    pub frequency_secs: u64,
    /// 평가 대기 큐 용량
    pub queue_capacity: usize,
    /// 평가 워커 수
    pub workers: usize,
    /// YAML 트리거 규칙 디렉토리 (비어 있으면 사용 안 함)
    pub rule_dir: String,
    /// 수신자 목록
    pub recipients: Vec<RecipientConfig>,
    /// 인라인 트리거 규칙
    pub triggers: Vec<TriggerConfig>,
}

impl AlertsConfig {
    /// 알림 엔진을 구동할 필요가 있는지 확인합니다.
    pub fn has_rules(&self) -> bool {
        !self.triggers.is_empty() || !self.rule_dir.is_empty()
    }

    fn validate(&self) -> Result<(), TailpostError> {
        if self.frequency_secs == 0 {
            return Err(invalid("alerts.frequency_secs", "must be greater than 0"));
        }
        if self.queue_capacity == 0 {
            return Err(invalid("alerts.queue_capacity", "must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(invalid("alerts.workers", "must be greater than 0"));
        }
        for (idx, r) in self.recipients.iter().enumerate() {
            if r.recipient.trim().is_empty() {
                return Err(invalid(
                    &format!("alerts.recipients[{idx}].recipient"),
                    "must not be empty",
                ));
            }
        }
        for (idx, t) in self.triggers.iter().enumerate() {
            if t.name.is_empty() {
                return Err(invalid(
                    &format!("alerts.triggers[{idx}].name"),
                    "must not be empty",
                ));
            }
            if t.conditions.is_empty() {
                return Err(invalid(
                    &format!("alerts.triggers[{idx}].conditions"),
                    format!("trigger '{}' must have at least one condition", t.name),
                ));
            }
        }
        Ok(())
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            frequency_secs: 10,
            queue_capacity: 4096,
            workers: 4,
            rule_dir: String::new(),
            recipients: Vec::new(),
            triggers: Vec::new(),
        }
    }
}

/// 원격 전송 설정
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// URL 스킴 (http, https)
    pub scheme: String,
    /// 수집 서버 호스트
    pub server: String,
    /// 수집 서버 포트
    pub port: u16,
    /// 공유 비밀 (basic auth 비밀번호, 암호화 키 유도)
    pub secret: String,
    /// 전송 주기 (초)
    pub frequency_secs: u64,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 배치당 최대 레코드 수
    pub batch_size: usize,
    /// 버퍼 최대 레코드 수
    pub buffer_capacity: usize,
}

impl EmitterConfig {
    fn validate(&self) -> Result<(), TailpostError> {
        if !self.enabled {
            return Ok(());
        }
        if !["http", "https"].contains(&self.scheme.as_str()) {
            return Err(invalid("emitter.scheme", "must be one of: http, https"));
        }
        if self.server.is_empty() {
            return Err(invalid(
                "emitter.server",
                "server must not be empty when emitter is enabled",
            ));
        }
        if self.secret.is_empty() {
            return Err(invalid(
                "emitter.secret",
                "secret must not be empty when emitter is enabled",
            ));
        }
        if self.port == 0 {
            return Err(invalid("emitter.port", "must be greater than 0"));
        }
        if self.frequency_secs == 0 || self.timeout_secs == 0 {
            return Err(invalid(
                "emitter.frequency_secs",
                "frequency and timeout must be greater than 0",
            ));
        }
        if self.batch_size == 0 {
            return Err(invalid("emitter.batch_size", "must be greater than 0"));
        }
        if self.buffer_capacity < self.batch_size {
            return Err(invalid(
                "emitter.buffer_capacity",
                format!("must be at least batch_size ({})", self.batch_size),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for EmitterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterConfig")
            .field("enabled", &self.enabled)
            .field("scheme", &self.scheme)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("secret", &"[REDACTED]")
            .field("frequency_secs", &self.frequency_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("batch_size", &self.batch_size)
            .field("buffer_capacity", &self.buffer_capacity)
            .finish()
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scheme: "http".to_owned(),
            server: String::new(),
            port: 59302,
            secret: String::new(),
            frequency_secs: 5,
            timeout_secs: 30,
            batch_size: 10_000,
            buffer_capacity: 200_000,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인딩 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> TailpostError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}
