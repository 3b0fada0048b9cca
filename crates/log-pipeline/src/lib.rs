//! # tailpost-log-pipeline
//!
//! 로그 파일을 tail하여 레코드로 파싱하고, 트리거 알림과 원격 전송으로 흘려보내는 파이프라인입니다.
//!
//! # 모듈 구성
//!
//! - [`watcher`]: glob 기반 파일 탐색, tail 세션, 로테이션 처리
//! - [`parser`]: 정규식/JSON 라인 파서와 날짜 추출
//! - [`trigger`]: 트리거 규칙 타입, 매처, YAML 로더
//! - [`alerter`]: 트리거 평가 워커 풀과 주기적 알림 전달
//! - [`notify`]: 로그/웹훅 알림 협력자
//! - [`emitter`]: 레코드 버퍼링과 수집 서버로의 배치 전송
//! - [`config`]: core 설정에서 파생한 컴포넌트 설정
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Watcher --(tail)--> LineParser --Record--> EventBus --+--> Alerter (priority 10) --> Notifier
//!                                                       +--> Emitter (priority 20) --> BatchTransport
//! ```

pub mod alerter;
pub mod config;
pub mod emitter;
pub mod error;
pub mod notify;
pub mod parser;
pub mod trigger;
pub mod watcher;

mod state;

// --- 주요 타입 re-export ---

// 컴포넌트
pub use alerter::Alerter;
pub use emitter::{BatchTransport, Emitter, HttpTransport};
pub use watcher::Watcher;

// 설정
pub use config::{AlerterSettings, EmitterSettings, WatcherSettings};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::{LineParser, ParserDefinition};

// 트리거
pub use trigger::{TriggerLoader, TriggerMatcher, TriggerRule};

// 알림
pub use notify::{LogNotifier, NotifierSet, WebhookNotifier};
