//! 에러 타입 -- 도메인별 에러 정의

/// tailpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TailpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 배치 봉인/개봉 에러
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// 알림 전달 에러
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,
}

/// 배치 봉인/개봉 에러 (압축, 암호화)
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// 직렬화 실패
    #[error("serialize failed: {0}")]
    Serialize(String),

    /// 압축/해제 실패
    #[error("compression failed: {0}")]
    Compression(String),

    /// 암호화 실패
    #[error("encryption failed: {0}")]
    Encrypt(String),

    /// 복호화 실패 (키 불일치, 변조, 잘린 입력)
    #[error("decryption failed: {0}")]
    Decrypt(String),
}

/// 알림 전달 에러
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// 채널 전달 실패
    #[error("notifier '{notifier}' failed: {reason}")]
    Delivery { notifier: String, reason: String },
}
