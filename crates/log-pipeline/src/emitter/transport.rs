//! 배치 전송 계층
//!
//! [`BatchTransport`]는 봉인된 배치 바이트를 수집 서버로 보냅니다.
//! 테스트에서는 기록/실패용 구현으로 교체합니다.

use std::time::Duration;

use tailpost_core::pipeline::BoxFuture;

use crate::config::{BASIC_AUTH_USER, EmitterSettings};
use crate::error::LogPipelineError;

/// 봉인된 배치의 Content-Type
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// 배치 전송 trait
///
/// 성공은 전송 에러가 없고 서버가 200을 반환한 경우뿐입니다.
pub trait BatchTransport: Send + Sync {
    /// 전송 대상 (로그용)
    fn target(&self) -> &str;

    /// 봉인된 배치를 전송합니다.
    fn send<'a>(&'a self, sealed: Vec<u8>) -> BoxFuture<'a, Result<(), LogPipelineError>>;
}

/// HTTP POST 전송
pub struct HttpTransport {
    endpoint: String,
    secret: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// 전송기 설정으로 HTTP 전송을 만듭니다.
    pub fn new(settings: &EmitterSettings) -> Result<Self, LogPipelineError> {
        Self::with_timeout(&settings.endpoint, &settings.secret, settings.timeout)
    }

    /// 엔드포인트와 타임아웃을 직접 지정합니다.
    pub fn with_timeout(
        endpoint: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LogPipelineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LogPipelineError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            secret: secret.into(),
            client,
        })
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl BatchTransport for HttpTransport {
    fn target(&self) -> &str {
        &self.endpoint
    }

    fn send<'a>(&'a self, sealed: Vec<u8>) -> BoxFuture<'a, Result<(), LogPipelineError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(&self.endpoint)
                .basic_auth(BASIC_AUTH_USER, Some(&self.secret))
                .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
                .body(sealed)
                .send()
                .await
                .map_err(|e| LogPipelineError::Transport(format!("request to {} failed: {e}", self.endpoint)))?;

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(LogPipelineError::Transport(format!(
                    "{} responded with status {status}",
                    self.endpoint
                )));
            }
            Ok(())
        })
    }
}
