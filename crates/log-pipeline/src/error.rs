//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 감시기/파서/알림 엔진/전송기 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for TailpostError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use tailpost_core::error::{CodecError, PipelineError, TailpostError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 정규식 파서가 라인과 매칭되지 않음
    #[error("parser '{parser}': line did not match pattern")]
    NoMatch {
        /// 파서 이름
        parser: String,
    },

    /// 라인 파싱 실패 (잘못된 JSON 등)
    #[error("parser '{parser}': {reason}")]
    Parse {
        /// 파서 이름
        parser: String,
        /// 실패 사유
        reason: String,
    },

    /// 날짜 필드 해석 실패
    #[error("date extract failed for field '{field}' with format '{format}': {reason}")]
    DateExtract {
        /// 날짜 필드 이름
        field: String,
        /// 형식 문자열
        format: String,
        /// 실패 사유
        reason: String,
    },

    /// 파일 감시 에러 (열기, 읽기, 메타데이터)
    #[error("collector error: {path}: {reason}")]
    Collector {
        /// 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 트리거 규칙 파일 로딩 실패
    #[error("rule load error: {path}: {reason}")]
    RuleLoad {
        /// 규칙 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 트리거 규칙 검증 실패
    #[error("rule validation error: rule '{rule}': {reason}")]
    RuleValidation {
        /// 규칙 이름
        rule: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 배치 전송 실패
    #[error("transport error: {0}")]
    Transport(String),

    /// 배치 봉인 실패
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// glob 패턴 에러
    #[error("glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl From<LogPipelineError> for TailpostError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Codec(e) => TailpostError::Codec(e),
            LogPipelineError::Io(e) => TailpostError::Io(e),
            other => TailpostError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
