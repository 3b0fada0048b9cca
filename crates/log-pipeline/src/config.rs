//! 파이프라인 컴포넌트 설정
//!
//! core의 [`TailpostConfig`](tailpost_core::config::TailpostConfig) 섹션에서
//! 감시기/알림 엔진/전송기가 실제로 사용하는 런타임 설정을 파생합니다.
//! 밀리초/초 단위 정수는 여기서 [`Duration`]으로 바뀝니다.
//!
//! # 사용 예시
//! ```ignore
//! use tailpost_core::config::TailpostConfig;
//! use tailpost_log_pipeline::config::EmitterSettings;
//!
//! let core_config = TailpostConfig::default();
//! let settings = EmitterSettings::from_core(&core_config.emitter);
//! ```

use std::time::Duration;

use tailpost_core::config::{AlertsConfig, EmitterConfig, GeneralConfig, WatcherConfig};

use crate::error::LogPipelineError;

/// 수집 서버의 레코드 수신 경로
pub const RECORDS_PATH: &str = "/v1/records";

/// basic auth 사용자명
pub const BASIC_AUTH_USER: &str = "tailpost";

/// 감시기 설정
#[derive(Debug, Clone)]
pub struct WatcherSettings {
    /// 파일 탐색 주기
    pub discovery_interval: Duration,
    /// 사라진 파일 정리 주기
    pub cleanup_interval: Duration,
    /// 새 라인 폴링 주기
    pub poll_interval: Duration,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
}

impl WatcherSettings {
    /// core 설정에서 감시기 설정을 생성합니다.
    pub fn from_core(core: &WatcherConfig) -> Self {
        Self {
            discovery_interval: Duration::from_millis(core.discovery_interval_ms),
            cleanup_interval: Duration::from_millis(core.cleanup_interval_ms),
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            max_line_length: core.max_line_length,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024; // 16MB

        for (field, value) in [
            ("discovery_interval", self.discovery_interval),
            ("cleanup_interval", self.cleanup_interval),
            ("poll_interval", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(config_err(field, "must be greater than 0"));
            }
        }

        if self.max_line_length == 0 || self.max_line_length > MAX_LINE_LENGTH {
            return Err(config_err(
                "max_line_length",
                format!("must be 1-{MAX_LINE_LENGTH}"),
            ));
        }
        Ok(())
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self::from_core(&WatcherConfig::default())
    }
}

/// 알림 엔진 설정
#[derive(Debug, Clone)]
pub struct AlerterSettings {
    /// 알림 제목에 쓰는 애플리케이션 이름
    pub application: String,
    /// 플러시 주기
    pub frequency: Duration,
    /// 평가 대기 큐 용량
    pub queue_capacity: usize,
    /// 평가 워커 수
    pub workers: usize,
}

impl AlerterSettings {
    /// core 설정에서 알림 엔진 설정을 생성합니다.
    pub fn from_core(general: &GeneralConfig, alerts: &AlertsConfig) -> Self {
        Self {
            application: general.application.clone(),
            frequency: Duration::from_secs(alerts.frequency_secs),
            queue_capacity: alerts.queue_capacity,
            workers: alerts.workers,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_WORKERS: usize = 256;
        const MAX_QUEUE_CAPACITY: usize = 1_000_000;

        if self.frequency.is_zero() {
            return Err(config_err("frequency", "must be greater than 0"));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(config_err("workers", format!("must be 1-{MAX_WORKERS}")));
        }
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(config_err(
                "queue_capacity",
                format!("must be 1-{MAX_QUEUE_CAPACITY}"),
            ));
        }
        Ok(())
    }
}

impl Default for AlerterSettings {
    fn default() -> Self {
        Self::from_core(&GeneralConfig::default(), &AlertsConfig::default())
    }
}

/// 전송기 설정
#[derive(Clone)]
pub struct EmitterSettings {
    /// 전체 수신 URL (`{scheme}://{server}:{port}/v1/records`)
    pub endpoint: String,
    /// 공유 비밀
    pub secret: String,
    /// 전송 주기
    pub frequency: Duration,
    /// 요청 타임아웃
    pub timeout: Duration,
    /// 배치당 최대 레코드 수
    pub batch_size: usize,
    /// 버퍼 최대 레코드 수
    pub buffer_capacity: usize,
}

impl EmitterSettings {
    /// core 설정에서 전송기 설정을 생성합니다.
    pub fn from_core(core: &EmitterConfig) -> Self {
        Self {
            endpoint: format!(
                "{}://{}:{}{RECORDS_PATH}",
                core.scheme, core.server, core.port
            ),
            secret: core.secret.clone(),
            frequency: Duration::from_secs(core.frequency_secs),
            timeout: Duration::from_secs(core.timeout_secs),
            batch_size: core.batch_size,
            buffer_capacity: core.buffer_capacity,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_BATCH_SIZE: usize = 100_000;
        const MAX_BUFFER_CAPACITY: usize = 10_000_000;
        const MAX_FREQUENCY: Duration = Duration::from_secs(3600); // 1 hour

        if self.secret.is_empty() {
            return Err(config_err("secret", "must not be empty"));
        }
        if self.frequency.is_zero() || self.frequency > MAX_FREQUENCY {
            return Err(config_err("frequency", "must be 1s-3600s"));
        }
        if self.timeout.is_zero() {
            return Err(config_err("timeout", "must be greater than 0"));
        }
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(config_err(
                "batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }
        if self.buffer_capacity < self.batch_size || self.buffer_capacity > MAX_BUFFER_CAPACITY {
            return Err(config_err(
                "buffer_capacity",
                format!("must be {}-{MAX_BUFFER_CAPACITY}", self.batch_size),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for EmitterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitterSettings")
            .field("endpoint", &self.endpoint)
            .field("secret", &"[REDACTED]")
            .field("frequency", &self.frequency)
            .field("timeout", &self.timeout)
            .field("batch_size", &self.batch_size)
            .field("buffer_capacity", &self.buffer_capacity)
            .finish()
    }
}

fn config_err(field: &str, reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}
