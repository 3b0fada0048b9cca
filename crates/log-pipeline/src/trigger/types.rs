//! 트리거 규칙 데이터 타입
//!
//! 인라인 설정(`[[alerts.triggers]]`)과 YAML 규칙 파일이 같은 구조로 역직렬화됩니다.

use serde::{Deserialize, Serialize};
use tailpost_core::config::{TriggerConfig, TriggerOperator};

use crate::error::LogPipelineError;

const MAX_RULE_NAME_LEN: usize = 256;

/// 트리거 규칙
///
/// # YAML 스키마
/// ```yaml
/// name: server_errors
/// description: 5xx responses from nginx
/// enabled: true
/// conditions:
///   - field: _parser
///     operator: is
///     value: nginx
///   - field: status
///     operator: start_with
///     value: "5"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// 규칙 이름 (알림의 `trigger` 값, 규칙 집합 안에서 유일)
    pub name: String,
    /// 설명
    #[serde(default)]
    pub description: String,
    /// 활성화 여부
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 조건 목록 (AND 결합)
    pub conditions: Vec<Condition>,
}

fn default_enabled() -> bool {
    true
}

/// 단일 필드 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    /// 필드 이름
    pub field: String,
    /// 연산자
    pub operator: TriggerOperator,
    /// 비교 값
    pub value: String,
}

impl TriggerRule {
    /// 인라인 설정에서 규칙을 만듭니다.
    pub fn from_core(config: &TriggerConfig) -> Self {
        Self {
            name: config.name.clone(),
            description: String::new(),
            enabled: true,
            conditions: config
                .conditions
                .iter()
                .map(|c| Condition {
                    field: c.field.clone(),
                    operator: c.operator,
                    value: c.value.clone(),
                })
                .collect(),
        }
    }

    /// 규칙의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.name.is_empty() {
            return Err(invalid("(empty)", "rule name must not be empty"));
        }
        if self.name.len() > MAX_RULE_NAME_LEN {
            return Err(invalid(
                &self.name,
                &format!("rule name must not exceed {MAX_RULE_NAME_LEN} characters"),
            ));
        }
        if self.conditions.is_empty() {
            return Err(invalid(&self.name, "rule must have at least one condition"));
        }
        for (idx, condition) in self.conditions.iter().enumerate() {
            if condition.field.is_empty() {
                return Err(invalid(
                    &self.name,
                    &format!("condition[{idx}] field must not be empty"),
                ));
            }
        }
        Ok(())
    }
}

fn invalid(rule: &str, reason: &str) -> LogPipelineError {
    LogPipelineError::RuleValidation {
        rule: rule.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailpost_core::config::ConditionConfig;

    fn rule(name: &str, conditions: Vec<Condition>) -> TriggerRule {
        TriggerRule {
            name: name.to_owned(),
            description: String::new(),
            enabled: true,
            conditions,
        }
    }

    fn cond(field: &str) -> Condition {
        Condition {
            field: field.to_owned(),
            operator: TriggerOperator::Is,
            value: "x".to_owned(),
        }
    }

    #[test]
    fn from_core_copies_conditions() {
        let config = TriggerConfig {
            name: "errors".to_owned(),
            conditions: vec![ConditionConfig {
                field: "level".to_owned(),
                operator: TriggerOperator::Contains,
                value: "err".to_owned(),
            }],
        };
        let rule = TriggerRule::from_core(&config);
        assert_eq!(rule.name, "errors");
        assert!(rule.enabled);
        assert_eq!(rule.conditions[0].operator, TriggerOperator::Contains);
    }

    #[test]
    fn empty_name_is_rejected() {
        assert!(rule("", vec![cond("a")]).validate().is_err());
    }

    #[test]
    fn long_name_is_rejected() {
        assert!(rule(&"n".repeat(257), vec![cond("a")]).validate().is_err());
    }

    #[test]
    fn rule_without_conditions_is_rejected() {
        let err = rule("r", Vec::new()).validate().unwrap_err();
        assert!(err.to_string().contains("at least one condition"));
    }

    #[test]
    fn empty_condition_field_is_rejected() {
        assert!(rule("r", vec![cond("a"), cond("")]).validate().is_err());
    }

    #[test]
    fn enabled_defaults_to_true() {
        let yaml = "name: r\nconditions:\n  - field: a\n    operator: regex\n    value: x\n";
        let rule: TriggerRule = serde_yaml::from_str(yaml).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.conditions[0].operator, TriggerOperator::MatchRegex);
    }
}
