//! 트리거 규칙 파일 로더 -- 디렉토리의 YAML 규칙을 로드합니다.
//!
//! `.yml`/`.yaml` 파일 하나에 규칙 하나가 들어 있습니다.
//! 개별 파일 파싱 실패는 경고 로그를 남기고 건너뜁니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::io::AsyncReadExt;

use crate::error::LogPipelineError;

use super::types::TriggerRule;

/// 규칙 파일 하나의 최대 크기 (1MB)
const MAX_RULE_FILE_SIZE: u64 = 1024 * 1024;
/// 디렉토리 하나에서 로드할 수 있는 최대 규칙 수
const MAX_RULES_COUNT: usize = 10_000;

fn load_error(path: &Path, reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::RuleLoad {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// 디렉토리의 `.yml`/`.yaml` 파일을 이름 순서로 나열합니다.
async fn rule_files(dir: &Path) -> Result<Vec<PathBuf>, LogPipelineError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| load_error(dir, format!("failed to read directory: {e}")))?;

    let mut paths = Vec::new();
    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let path = entry.path();
                if matches!(path.extension().and_then(|e| e.to_str()), Some("yml" | "yaml")) {
                    paths.push(path);
                }
            }
            Ok(None) => break,
            Err(e) => return Err(load_error(dir, format!("failed to read directory entry: {e}"))),
        }
    }
    paths.sort();
    Ok(paths)
}

/// 규칙 파일 로더
pub struct TriggerLoader;

impl TriggerLoader {
    /// 디렉토리에서 모든 YAML 규칙 파일을 파일 이름 순서로 로드합니다.
    ///
    /// 읽을 수 없거나 잘못된 파일, 앞선 파일과 이름이 겹치는 규칙은 경고 후 건너뜁니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 규칙 수가 `MAX_RULES_COUNT`를 초과하는 경우
    pub async fn load_directory(dir: impl AsRef<Path>) -> Result<Vec<TriggerRule>, LogPipelineError> {
        let dir = dir.as_ref();
        let mut rules: Vec<TriggerRule> = Vec::new();
        let mut names = HashSet::new();

        for path in rule_files(dir).await? {
            let rule = match Self::load_file(&path).await {
                Ok(rule) => rule,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to load rule file, skipping");
                    continue;
                }
            };
            if !names.insert(rule.name.clone()) {
                tracing::warn!(rule = %rule.name, path = %path.display(), "duplicate rule name, skipping");
                continue;
            }
            if rules.len() == MAX_RULES_COUNT {
                return Err(load_error(dir, format!("too many rules: max {MAX_RULES_COUNT}")));
            }
            rules.push(rule);
        }

        tracing::info!(dir = %dir.display(), count = rules.len(), "loaded trigger rules");
        Ok(rules)
    }

    /// 단일 YAML 파일에서 규칙을 로드합니다.
    ///
    /// `MAX_RULE_FILE_SIZE`를 넘는 파일은 끝까지 읽지 않고 거부합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<TriggerRule, LogPipelineError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| load_error(path, format!("failed to open file: {e}")))?;

        let mut content = String::new();
        file.take(MAX_RULE_FILE_SIZE + 1)
            .read_to_string(&mut content)
            .await
            .map_err(|e| load_error(path, format!("failed to read file: {e}")))?;
        if content.len() as u64 > MAX_RULE_FILE_SIZE {
            return Err(load_error(path, format!("file too large (max: {MAX_RULE_FILE_SIZE} bytes)")));
        }

        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// YAML 문자열을 파싱하고 검증합니다.
    pub fn parse_yaml(yaml: &str, source: &str) -> Result<TriggerRule, LogPipelineError> {
        let rule: TriggerRule = serde_yaml::from_str(yaml)
            .map_err(|e| load_error(Path::new(source), format!("YAML parse error: {e}")))?;
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailpost_core::config::TriggerOperator;

    const RULE: &str = r#"
name: server_errors
description: 5xx from nginx
conditions:
  - field: status
    operator: start_with
    value: "5"
"#;

    #[test]
    fn parse_valid_yaml() {
        let rule = TriggerLoader::parse_yaml(RULE, "test.yml").unwrap();
        assert_eq!(rule.name, "server_errors");
        assert_eq!(rule.conditions[0].operator, TriggerOperator::StartWith);
    }

    #[test]
    fn parse_invalid_yaml_returns_error() {
        assert!(TriggerLoader::parse_yaml("not: [valid: yaml: {{{", "bad.yml").is_err());
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let yaml = "name: r\nconditions:\n  - field: a\n    operator: ends_with\n    value: x\n";
        assert!(TriggerLoader::parse_yaml(yaml, "op.yml").is_err());
    }

    #[tokio::test]
    async fn load_nonexistent_directory_returns_error() {
        assert!(TriggerLoader::load_directory("/nonexistent/tailpost/rules").await.is_err());
    }

    #[tokio::test]
    async fn load_directory_skips_bad_and_duplicate_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.yml"), RULE).unwrap();
        std::fs::write(dir.path().join("b.yaml"), RULE).unwrap();
        std::fs::write(dir.path().join("c.yml"), "name: \"\"\nconditions: []\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let rules = TriggerLoader::load_directory(dir.path()).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "server_errors");
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("huge.yml");
        let mut content = RULE.to_owned();
        content.push_str(&"#".repeat(MAX_RULE_FILE_SIZE as usize));
        std::fs::write(&path, content).unwrap();

        let err = TriggerLoader::load_file(&path).await.unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
        assert!(TriggerLoader::load_directory(dir.path()).await.unwrap().is_empty());
    }
}
