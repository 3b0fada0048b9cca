//! 컴포넌트 실행 상태

use tailpost_core::error::{PipelineError, TailpostError};
use tailpost_core::pipeline::HealthStatus;

/// 컴포넌트 실행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComponentState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

impl ComponentState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }

    /// 시작 가능 여부를 확인합니다.
    pub(crate) fn ensure_startable(self) -> Result<(), TailpostError> {
        if self == Self::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }
        Ok(())
    }

    /// 정지 가능 여부를 확인합니다.
    pub(crate) fn ensure_running(self) -> Result<(), TailpostError> {
        if self != Self::Running {
            return Err(PipelineError::NotRunning.into());
        }
        Ok(())
    }

    /// 실행 중이면 `running`의 결과를, 아니면 비정상 상태를 반환합니다.
    pub(crate) fn health(self, running: impl FnOnce() -> HealthStatus) -> HealthStatus {
        match self {
            Self::Running => running(),
            Self::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            Self::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_cannot_start_twice() {
        assert!(ComponentState::Running.ensure_startable().is_err());
        assert!(ComponentState::Stopped.ensure_startable().is_ok());
    }

    #[test]
    fn only_running_can_stop() {
        assert!(ComponentState::Initialized.ensure_running().is_err());
        assert!(ComponentState::Running.ensure_running().is_ok());
    }

    #[test]
    fn health_delegates_when_running() {
        let status = ComponentState::Running.health(|| HealthStatus::Degraded("x".to_owned()));
        assert_eq!(status, HealthStatus::Degraded("x".to_owned()));
        assert!(ComponentState::Stopped.health(|| HealthStatus::Healthy).is_unhealthy());
    }
}
