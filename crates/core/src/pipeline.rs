//! 파이프라인 trait -- 컴포넌트 생명주기와 확장 포인트 정의
//!
//! - [`Pipeline`]: 감시기/알림 엔진/전송기 공통 생명주기 (start/stop/health_check)
//! - [`DynPipeline`]: `Box<dyn ..>`로 관리하기 위한 dyn-compatible 버전
//! - [`Notifier`]: 알림 배치를 외부(웹훅, 로그 등)로 전달하는 협력자

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::error::{NotifyError, TailpostError};
use crate::types::Alert;

/// `Send` 가능한 박스 Future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 컴포넌트 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작은 하지만 주의 필요
    Degraded(String),
    /// 비정상
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

/// 컴포넌트 생명주기 trait
///
/// `stop`은 현재 주기의 작업을 마친 뒤 반환해야 합니다
/// (감시기는 모든 세션 정리, 알림 엔진/전송기는 마지막 플러시).
pub trait Pipeline: Send + Sync {
    /// 컴포넌트를 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), TailpostError>> + Send;

    /// 컴포넌트를 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), TailpostError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// dyn-compatible 파이프라인 trait
///
/// `Pipeline`은 RPITIT를 사용하므로 `dyn Pipeline`이 불가합니다.
/// `DynPipeline`은 `BoxFuture`를 반환하여 `Vec<Box<dyn DynPipeline>>`으로
/// 컴포넌트를 동적으로 관리할 수 있게 합니다.
pub trait DynPipeline: Send + Sync {
    /// 컴포넌트를 시작합니다.
    fn start(&mut self) -> BoxFuture<'_, Result<(), TailpostError>>;

    /// 컴포넌트를 정지합니다.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), TailpostError>>;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> BoxFuture<'_, HealthStatus>;
}

impl<T: Pipeline> DynPipeline for T {
    fn start(&mut self) -> BoxFuture<'_, Result<(), TailpostError>> {
        Box::pin(Pipeline::start(self))
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), TailpostError>> {
        Box::pin(Pipeline::stop(self))
    }

    fn health_check(&self) -> BoxFuture<'_, HealthStatus> {
        Box::pin(Pipeline::health_check(self))
    }
}

/// 알림 템플릿 식별자
pub const ALERT_TEMPLATE: &str = "alert";

/// 알림 협력자에게 전달되는 메시지
///
/// 제목, 템플릿 식별자, 템플릿 데이터로 구성됩니다.
/// 템플릿 해석과 전달 방식(이메일, 웹훅)은 [`Notifier`] 구현의 몫입니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// 제목
    pub subject: String,
    /// 템플릿 식별자
    pub template: String,
    /// 템플릿 데이터
    pub data: BTreeMap<String, serde_json::Value>,
}

impl Notification {
    /// 알림 배치로 메시지를 생성합니다.
    ///
    /// 제목 형식: `"{application} - {n} new alert(s)"`
    pub fn for_alerts(application: &str, alerts: &[Alert]) -> Self {
        let mut data = BTreeMap::new();
        data.insert(
            "Application".to_owned(),
            serde_json::Value::String(application.to_owned()),
        );
        data.insert(
            "Alerts".to_owned(),
            serde_json::to_value(alerts).unwrap_or_else(|_| serde_json::Value::Array(Vec::new())),
        );

        Self {
            subject: format!("{application} - {} new alert(s)", alerts.len()),
            template: ALERT_TEMPLATE.to_owned(),
            data,
        }
    }

    /// 데이터에 담긴 알림 수
    pub fn alert_count(&self) -> usize {
        self.data
            .get("Alerts")
            .and_then(serde_json::Value::as_array)
            .map_or(0, Vec::len)
    }
}

/// 알림 협력자 trait
///
/// 알림 엔진은 플러시마다 한 번 `notify`를 호출합니다.
/// 실패한 배치는 재시도하지 않습니다.
pub trait Notifier: Send + Sync {
    /// 협력자 이름 (로그용)
    fn name(&self) -> &str;

    /// 메시지를 전달합니다.
    fn notify<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, Result<(), NotifyError>>;
}
