//! 트리거 매칭 -- 조건 평가 및 정규식 캐싱
//!
//! [`TriggerMatcher`]는 규칙 집합을 소유하며 레코드마다 모든 활성 규칙을 평가합니다.
//! 정규식은 생성 시 한 번만 컴파일하며 (규칙 인덱스, 조건 인덱스)로 캐싱합니다.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use tailpost_core::config::TriggerOperator;
use tailpost_core::types::Record;
use tracing::error;

use super::types::{Condition, TriggerRule};
use crate::error::LogPipelineError;

/// 트리거 매처
#[derive(Debug)]
pub struct TriggerMatcher {
    rules: Vec<TriggerRule>,
    /// 컴파일된 정규식: (rule index, condition index) -> Regex
    regex_cache: HashMap<(usize, usize), Regex>,
}

impl TriggerMatcher {
    /// 규칙 집합으로 매처를 만듭니다.
    ///
    /// 규칙 검증 실패, 중복 이름, 잘못된 정규식이 하나라도 있으면 전체를 거부합니다.
    pub fn new(rules: Vec<TriggerRule>) -> Result<Self, LogPipelineError> {
        let mut names = HashSet::new();
        let mut regex_cache = HashMap::new();

        for (rule_idx, rule) in rules.iter().enumerate() {
            rule.validate()?;
            if !names.insert(rule.name.as_str()) {
                return Err(LogPipelineError::RuleValidation {
                    rule: rule.name.clone(),
                    reason: "duplicate rule name".to_owned(),
                });
            }

            for (idx, condition) in rule.conditions.iter().enumerate() {
                if condition.operator != TriggerOperator::MatchRegex {
                    continue;
                }
                let regex = Regex::new(&condition.value).map_err(|e| {
                    LogPipelineError::RuleValidation {
                        rule: rule.name.clone(),
                        reason: format!(
                            "invalid regex in condition[{idx}] for field '{}': {e}",
                            condition.field
                        ),
                    }
                })?;
                regex_cache.insert((rule_idx, idx), regex);
            }
        }

        Ok(Self { rules, regex_cache })
    }

    /// 규칙 수
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// 규칙 목록
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// 레코드에 매칭되는 활성 규칙 이름을 등록 순서대로 반환합니다.
    pub fn matching<'a>(&'a self, record: &Record) -> Vec<&'a str> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(rule_idx, rule)| rule.enabled && self.matches(*rule_idx, rule, record))
            .map(|(_, rule)| rule.name.as_str())
            .collect()
    }

    /// 규칙의 모든 조건이 레코드에 매칭되는지 평가합니다.
    ///
    /// 필드가 없으면 에러 로그를 남기고 매칭 실패로 처리합니다.
    fn matches(&self, rule_idx: usize, rule: &TriggerRule, record: &Record) -> bool {
        rule.conditions.iter().enumerate().all(|(idx, condition)| {
            match record.resolve(&condition.field) {
                Some(value) => self.evaluate((rule_idx, idx), condition, value),
                None => {
                    error!(
                        trigger = rule.name.as_str(),
                        field = condition.field.as_str(),
                        parser = record.metadata.parser.as_str(),
                        "trigger field not found in record"
                    );
                    false
                }
            }
        })
    }

    fn evaluate(&self, key: (usize, usize), condition: &Condition, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }

        if condition.operator == TriggerOperator::MatchRegex {
            return self
                .regex_cache
                .get(&key)
                .is_some_and(|re| re.is_match(value));
        }

        let value = value.to_lowercase();
        let expected = condition.value.to_lowercase();
        match condition.operator {
            TriggerOperator::Is => value == expected,
            TriggerOperator::IsNot => value != expected,
            TriggerOperator::Contains => value.contains(&expected),
            TriggerOperator::NotContains => !value.contains(&expected),
            TriggerOperator::StartWith => value.starts_with(&expected),
            TriggerOperator::NotStartWith => !value.starts_with(&expected),
            TriggerOperator::MatchRegex => false,
        }
    }
}
