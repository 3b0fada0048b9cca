//! 정규식 모드 파서
//!
//! named capture group 이름이 곧 필드 이름입니다.
//! 매칭에 참여하지 않은 그룹과 이름 없는 그룹은 필드를 만들지 않습니다.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use regex::Regex;

use crate::error::LogPipelineError;

/// 파서 이름별 컴파일된 정규식 캐시
///
/// 같은 파서를 쓰는 여러 tail 세션이 하나의 컴파일 결과를 공유합니다.
/// 컴파일은 락 안에서 일어나므로 동시에 첫 사용이 몰려도 한 번만 컴파일됩니다.
#[derive(Debug, Default)]
pub struct RegexCache {
    entries: Mutex<HashMap<String, Arc<Regex>>>,
}

impl RegexCache {
    /// 빈 캐시를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 캐시된 정규식을 반환하거나, 없으면 컴파일하여 저장합니다.
    pub fn get_or_compile(&self, key: &str, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        let mut entries = self.entries.lock();
        if let Some(regex) = entries.get(key) {
            return Ok(Arc::clone(regex));
        }

        let regex = Arc::new(Regex::new(pattern)?);
        entries.insert(key.to_owned(), Arc::clone(&regex));
        tracing::debug!(parser = key, "compiled parser pattern");
        Ok(regex)
    }

    /// 캐시된 패턴 수
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// 캐시가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// 라인에서 named group 값을 추출합니다.
pub(crate) fn extract(
    regex: &Regex,
    parser: &str,
    line: &str,
) -> Result<BTreeMap<String, String>, LogPipelineError> {
    let captures = regex.captures(line).ok_or_else(|| LogPipelineError::NoMatch {
        parser: parser.to_owned(),
    })?;

    let fields = regex
        .capture_names()
        .flatten()
        .filter_map(|name| {
            captures
                .name(name)
                .map(|m| (name.to_owned(), m.as_str().to_owned()))
        })
        .collect();
    Ok(fields)
}
