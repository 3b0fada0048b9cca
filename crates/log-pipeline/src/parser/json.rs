//! JSON 모드 파서
//!
//! 라인은 최상위 JSON 객체여야 합니다. 설정된 출력 필드마다 점(.) 구분 경로를
//! 객체를 따라 내려가며 해석하고, 찾은 값을 문자열로 정규화합니다.
//!
//! # 값 정규화
//! | JSON 값 | 결과 |
//! |---|---|
//! | 문자열 | 그대로 |
//! | 정수 값 숫자 (`42`, `42.0`) | `"42"` |
//! | 소수 (`42.5`) | `"42.500000"` |
//! | 객체 / 배열 | compact JSON 텍스트 |
//! | `null` | `""` |
//! | `true` / `false` | `"true"` / `"false"` |

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::error::LogPipelineError;

/// 출력 필드와 소스 경로
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonField {
    /// 출력 필드 이름
    pub name: String,
    /// 미리 분리한 경로 세그먼트
    pub path: Vec<String>,
}

impl JsonField {
    /// 점 구분 경로로 필드를 생성합니다.
    pub fn new(name: impl Into<String>, dotted_path: &str) -> Self {
        Self {
            name: name.into(),
            path: dotted_path.split('.').map(str::to_owned).collect(),
        }
    }
}

/// 라인을 디코딩하여 설정된 필드를 추출합니다.
///
/// 찾지 못한 경로는 결과에 포함되지 않습니다.
pub(crate) fn extract(
    fields: &[JsonField],
    parser: &str,
    line: &str,
) -> Result<BTreeMap<String, String>, LogPipelineError> {
    let root: Value = serde_json::from_str(line).map_err(|e| LogPipelineError::Parse {
        parser: parser.to_owned(),
        reason: format!("invalid JSON: {e}"),
    })?;

    if !root.is_object() {
        return Err(LogPipelineError::Parse {
            parser: parser.to_owned(),
            reason: "top-level JSON value must be an object".to_owned(),
        });
    }

    Ok(fields
        .iter()
        .filter_map(|field| resolve(&root, &field.path).map(|v| (field.name.clone(), coerce(v))))
        .collect())
}

/// 객체만 따라 내려가며 경로를 해석합니다.
///
/// 중간 값이 객체가 아니거나 세그먼트가 없으면 `None`입니다.
pub fn resolve<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |current, segment| current.as_object()?.get(segment))
}

/// JSON 값을 필드 문자열로 정규화합니다.
pub fn coerce(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => coerce_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn coerce_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.0}"),
        Some(f) => format!("{f:.6}"),
        None => n.to_string(),
    }
}
