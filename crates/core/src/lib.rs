//! # tailpost-core
//!
//! tailpost 에이전트의 공통 기반 크레이트입니다.
//!
//! - [`config`]: `tailpost.toml` 로딩, 환경변수 오버라이드, 검증
//! - [`error`]: 도메인별 에러 타입
//! - [`event`]: 토픽 기반 이벤트 버스
//! - [`pipeline`]: 컴포넌트 생명주기와 알림 협력자 trait
//! - [`types`]: 레코드, 알림 등 도메인 타입
//! - [`codec`]: 전송 배치 압축 및 암호화
//! - [`metrics`]: Prometheus 메트릭 이름 상수

pub mod codec;
pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{CodecError, ConfigError, NotifyError, PipelineError, TailpostError};

// 설정
pub use config::TailpostConfig;

// 이벤트
pub use event::{EventBus, Subscriber, SubscriptionId};

// 파이프라인 trait
pub use pipeline::{DynPipeline, HealthStatus, Notification, Notifier, Pipeline};

// 도메인 타입
pub use types::{Alert, HostIdentity, Record};
