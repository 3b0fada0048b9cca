//! 파일 탐색 -- 포함 glob에서 제외 glob을 뺀 일반 파일 집합

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::error::LogPipelineError;
use crate::parser::ParserDefinition;

/// glob 패턴 목록을 확장합니다.
///
/// 읽을 수 없는 항목은 건너뜁니다.
fn expand(patterns: &[String]) -> Result<BTreeSet<PathBuf>, LogPipelineError> {
    let mut paths = BTreeSet::new();
    for pattern in patterns {
        for entry in glob::glob(pattern)? {
            match entry {
                Ok(path) => {
                    paths.insert(path);
                }
                Err(e) => debug!(pattern = pattern.as_str(), error = %e, "skipping unreadable glob entry"),
            }
        }
    }
    Ok(paths)
}

/// 한 파서 정의에 해당하는 파일 목록을 찾습니다.
pub fn discover(def: &ParserDefinition) -> Result<BTreeSet<PathBuf>, LogPipelineError> {
    let included = expand(&def.files_included)?;
    let excluded = expand(&def.files_excluded)?;

    Ok(included
        .difference(&excluded)
        .filter(|path| std::fs::metadata(path).is_ok_and(|m| m.is_file()))
        .cloned()
        .collect())
}

/// 모든 파서 정의에 대해 (정의, 파일) 쌍을 찾습니다.
///
/// 같은 파일이 여러 파서에 매칭되면 각각 별개의 쌍이 됩니다.
pub fn discover_all(
    definitions: &[Arc<ParserDefinition>],
) -> Result<Vec<(Arc<ParserDefinition>, PathBuf)>, LogPipelineError> {
    let mut found = Vec::new();
    for def in definitions {
        for path in discover(def)? {
            found.push((Arc::clone(def), path));
        }
    }
    Ok(found)
}
