#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use tailpost_core::config::TriggerOperator;
use tailpost_core::types::{HostIdentity, Record};
use tailpost_log_pipeline::trigger::{Condition, TriggerMatcher, TriggerRule};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 규칙 조건 목록 (최대 8개만 사용)
    conditions: Vec<FuzzCondition>,
    level: String,
    msg: String,
}

#[derive(Arbitrary, Debug)]
struct FuzzCondition {
    field: FuzzField,
    operator: FuzzOperator,
    value: String,
}

#[derive(Arbitrary, Debug)]
enum FuzzField {
    Level,
    Msg,
    Parser,
    Missing,
}

#[derive(Arbitrary, Debug)]
enum FuzzOperator {
    MatchRegex,
    Is,
    IsNot,
    Contains,
    NotContains,
    StartWith,
    NotStartWith,
}

impl FuzzField {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Level => "level",
            Self::Msg => "msg",
            Self::Parser => "_parser",
            Self::Missing => "missing",
        }
    }
}

impl FuzzOperator {
    fn to_operator(&self) -> TriggerOperator {
        match self {
            Self::MatchRegex => TriggerOperator::MatchRegex,
            Self::Is => TriggerOperator::Is,
            Self::IsNot => TriggerOperator::IsNot,
            Self::Contains => TriggerOperator::Contains,
            Self::NotContains => TriggerOperator::NotContains,
            Self::StartWith => TriggerOperator::StartWith,
            Self::NotStartWith => TriggerOperator::NotStartWith,
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let conditions: Vec<Condition> = input
        .conditions
        .iter()
        .take(8)
        .map(|c| Condition {
            field: c.field.as_str().to_owned(),
            operator: c.operator.to_operator(),
            value: c.value.clone(),
        })
        .collect();

    let rule = TriggerRule {
        name: "fuzz".to_owned(),
        description: String::new(),
        enabled: true,
        conditions,
    };

    // 조건이 없거나 정규식이 잘못되면 Err
    let Ok(matcher) = TriggerMatcher::new(vec![rule]) else {
        return;
    };

    let identity = HostIdentity::new("fuzz", "fuzz", "fuzz");
    let raw = format!("{} {}", input.level, input.msg);
    let mut record = Record::new(&identity, "plain", "fuzz.log", raw);
    record.fields.insert("level".to_owned(), input.level);
    record.fields.insert("msg".to_owned(), input.msg);

    assert!(matcher.matching(&record).len() <= 1);
});
