//! 트리거 규칙 -- 레코드 필드 조건 평가
//!
//! - [`types`]: 규칙/조건 타입
//! - [`matcher`]: 조건 평가와 정규식 캐시
//! - [`loader`]: YAML 규칙 디렉토리 로더

pub mod loader;
pub mod matcher;
pub mod types;

pub use loader::TriggerLoader;
pub use matcher::TriggerMatcher;
pub use types::{Condition, TriggerRule};

use tailpost_core::config::AlertsConfig;

use crate::error::LogPipelineError;

/// 인라인 규칙과 규칙 디렉토리를 합쳐 매처를 만듭니다.
///
/// 인라인 규칙이 먼저 오며, 이름이 겹치면 매처 생성이 실패합니다.
pub async fn load_rules(alerts: &AlertsConfig) -> Result<TriggerMatcher, LogPipelineError> {
    let mut rules: Vec<TriggerRule> = alerts.triggers.iter().map(TriggerRule::from_core).collect();
    if !alerts.rule_dir.is_empty() {
        rules.extend(TriggerLoader::load_directory(&alerts.rule_dir).await?);
    }
    TriggerMatcher::new(rules)
}
