//! 라인 파서 -- 원시 로그 라인을 구조화된 [`Record`]로 변환
//!
//! [`ParserDefinition`]은 설정의 `[[parsers]]` 항목 하나를 검증한 불변 정의이고,
//! [`LineParser`]는 호스트 식별 정보와 정규식 캐시를 가지고 정의에 따라 라인을 파싱합니다.
//!
//! # 지원 모드
//! - 정규식 named capture group ([`pattern`])
//! - JSON 필드 경로 매핑 ([`json`])
//!
//! 필드 추출 뒤 선택적으로 날짜 필드를 해석하여 [`Record::date`]를 덮어씁니다 ([`date`]).
//!
//! # 사용 예시
//! ```ignore
//! use tailpost_core::types::HostIdentity;
//! use tailpost_log_pipeline::parser::{LineParser, ParserDefinition};
//!
//! let def = ParserDefinition::regex("app", r"^(?P<level>\w+) (?P<msg>.*)$", ["/var/log/app.log"]);
//! let parser = LineParser::new(HostIdentity::new("tailpost", "", "web-01"));
//! let parsed = parser.parse(&def, "/var/log/app.log", "ERROR disk full")?;
//! assert_eq!(parsed.record.fields["level"], "ERROR");
//! ```

pub mod date;
pub mod json;
pub mod pattern;

pub use json::JsonField;
pub use pattern::RegexCache;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Instant;

use metrics::{counter, histogram};
use tailpost_core::config::{DateExtractConfig, ParserConfig, ParserMode};
use tailpost_core::metrics as m;
use tailpost_core::types::{HostIdentity, Record};
use tracing::warn;

use crate::error::LogPipelineError;

/// 기본 최대 라인 길이 (64KB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// 파싱 방식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseMode {
    /// 정규식 named capture group
    Regex {
        /// 정규식 패턴
        pattern: String,
    },
    /// JSON 경로 매핑
    Json {
        /// 출력 필드 목록
        fields: Vec<JsonField>,
    },
}

/// 검증된 파서 정의
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserDefinition {
    /// 파서 이름 (고유)
    pub name: String,
    /// 파싱 방식
    pub mode: ParseMode,
    /// 포함 glob 패턴
    pub files_included: Vec<String>,
    /// 제외 glob 패턴
    pub files_excluded: Vec<String>,
    /// 날짜 추출 설정
    pub date_extract: Option<DateExtractConfig>,
}

impl ParserDefinition {
    /// 설정 항목에서 정의를 생성합니다.
    ///
    /// glob 패턴 문법과 모드별 필수 항목을 검증합니다.
    /// 정규식 컴파일은 [`LineParser::warm`]에서 수행합니다.
    pub fn from_config(config: &ParserConfig) -> Result<Self, LogPipelineError> {
        let mode = match config.mode {
            ParserMode::Regex => ParseMode::Regex {
                pattern: config
                    .regex_pattern
                    .clone()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| LogPipelineError::Config {
                        field: format!("parsers.{}.regex_pattern", config.name),
                        reason: "regex mode requires a pattern".to_owned(),
                    })?,
            },
            ParserMode::Json => ParseMode::Json {
                fields: config
                    .json_fields
                    .iter()
                    .map(|(name, path)| JsonField::new(name.clone(), path))
                    .collect(),
            },
        };

        for pattern in config.files_included.iter().chain(&config.files_excluded) {
            glob::Pattern::new(pattern)?;
        }

        Ok(Self {
            name: config.name.clone(),
            mode,
            files_included: config.files_included.clone(),
            files_excluded: config.files_excluded.clone(),
            date_extract: config.date_extract.clone(),
        })
    }

    /// 정규식 모드 정의를 생성합니다.
    pub fn regex<I, S>(name: impl Into<String>, pattern: impl Into<String>, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            mode: ParseMode::Regex {
                pattern: pattern.into(),
            },
            files_included: includes.into_iter().map(Into::into).collect(),
            files_excluded: Vec::new(),
            date_extract: None,
        }
    }

    /// JSON 모드 정의를 생성합니다. `fields`는 (출력 필드, 점 구분 경로) 쌍입니다.
    pub fn json<'a, F, I, S>(name: impl Into<String>, fields: F, includes: I) -> Self
    where
        F: IntoIterator<Item = (&'a str, &'a str)>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            mode: ParseMode::Json {
                fields: fields
                    .into_iter()
                    .map(|(name, path)| JsonField::new(name, path))
                    .collect(),
            },
            files_included: includes.into_iter().map(Into::into).collect(),
            files_excluded: Vec::new(),
            date_extract: None,
        }
    }

    /// 제외 glob 패턴을 설정합니다.
    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files_excluded = excludes.into_iter().map(Into::into).collect();
        self
    }

    /// 날짜 추출을 설정합니다.
    pub fn with_date(mut self, field: impl Into<String>, format: impl Into<String>) -> Self {
        self.date_extract = Some(DateExtractConfig {
            field: field.into(),
            format: format.into(),
        });
        self
    }

    /// 세션 키에 쓰는 파서 이름 해시
    pub fn name_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.name.hash(&mut hasher);
        hasher.finish()
    }
}

/// 파싱 결과
///
/// 날짜 해석 실패는 치명적이지 않으므로 레코드와 함께 반환됩니다.
#[derive(Debug)]
pub struct ParsedLine {
    /// 생성된 레코드
    pub record: Record,
    /// 날짜 해석 실패 (레코드 날짜는 캡처 시각 유지)
    pub date_error: Option<LogPipelineError>,
}

/// 라인 파서
///
/// 모든 tail 세션이 `Arc`로 공유합니다.
#[derive(Debug)]
pub struct LineParser {
    identity: HostIdentity,
    cache: RegexCache,
    max_line_length: usize,
}

impl LineParser {
    /// 호스트 식별 정보로 파서를 생성합니다.
    pub fn new(identity: HostIdentity) -> Self {
        Self {
            identity,
            cache: RegexCache::new(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// 호스트 식별 정보
    pub fn identity(&self) -> &HostIdentity {
        &self.identity
    }

    /// 모든 정규식 파서를 미리 컴파일합니다.
    ///
    /// 시작 시 호출하여 잘못된 패턴으로는 기동하지 않게 합니다.
    pub fn warm(&self, definitions: &[ParserDefinition]) -> Result<(), LogPipelineError> {
        for def in definitions {
            if let ParseMode::Regex { pattern } = &def.mode {
                self.cache
                    .get_or_compile(&def.name, pattern)
                    .map_err(|e| LogPipelineError::Config {
                        field: format!("parsers.{}.regex_pattern", def.name),
                        reason: e.to_string(),
                    })?;
            }
        }
        Ok(())
    }

    /// 라인 하나를 파싱합니다.
    ///
    /// 최대 길이를 넘는 라인은 문자 경계에서 잘린 뒤 파싱됩니다.
    pub fn parse(
        &self,
        def: &ParserDefinition,
        filename: &str,
        line: &str,
    ) -> Result<ParsedLine, LogPipelineError> {
        let start = Instant::now();
        let result = self.parse_inner(def, filename, truncate_line(line, self.max_line_length));
        histogram!(m::PARSER_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        match &result {
            Ok(_) => counter!(m::PARSER_RECORDS_TOTAL, m::LABEL_PARSER => def.name.clone())
                .increment(1),
            Err(_) => counter!(m::PARSER_ERRORS_TOTAL, m::LABEL_PARSER => def.name.clone())
                .increment(1),
        }
        result
    }

    fn parse_inner(
        &self,
        def: &ParserDefinition,
        filename: &str,
        line: &str,
    ) -> Result<ParsedLine, LogPipelineError> {
        let fields = match &def.mode {
            ParseMode::Regex { pattern: source } => {
                let regex = self.cache.get_or_compile(&def.name, source)?;
                pattern::extract(&regex, &def.name, line)?
            }
            ParseMode::Json { fields } => json::extract(fields, &def.name, line)?,
        };

        let mut record = Record::new(&self.identity, &def.name, filename, line);
        record.fields = fields;

        let date_error = def
            .date_extract
            .as_ref()
            .and_then(|extract| apply_date(&mut record, extract));

        Ok(ParsedLine { record, date_error })
    }
}

/// 날짜 필드가 있으면 해석하여 레코드 날짜를 덮어씁니다.
fn apply_date(record: &mut Record, extract: &DateExtractConfig) -> Option<LogPipelineError> {
    let value = record.fields.get(&extract.field)?;
    match date::parse_date(value, &extract.format) {
        Ok(date) => {
            record.date = date;
            None
        }
        Err(e) => {
            warn!(
                parser = record.metadata.parser.as_str(),
                field = extract.field.as_str(),
                format = extract.format.as_str(),
                value = value.as_str(),
                error = %e,
                "failed to parse record date, keeping capture time"
            );
            counter!(m::PARSER_DATE_ERRORS_TOTAL, m::LABEL_PARSER => record.metadata.parser.clone())
                .increment(1);
            Some(LogPipelineError::DateExtract {
                field: extract.field.clone(),
                format: extract.format.clone(),
                reason: e.to_string(),
            })
        }
    }
}

/// 최대 길이 이하의 가장 가까운 문자 경계에서 자릅니다.
pub fn truncate_line(line: &str, max_len: usize) -> &str {
    if line.len() <= max_len {
        return line;
    }
    let mut end = max_len;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn parser() -> LineParser {
        LineParser::new(HostIdentity::new("billing", "prod", "web-01"))
    }

    #[test]
    fn regex_mode_extracts_named_groups() {
        let def = ParserDefinition::regex("app", r"^(?P<level>\w+) (?P<msg>.*)$", ["/tmp/*.log"]);
        let parsed = parser().parse(&def, "/tmp/a.log", "ERROR disk full").unwrap();

        let record = parsed.record;
        assert_eq!(record.fields["level"], "ERROR");
        assert_eq!(record.fields["msg"], "disk full");
        assert_eq!(record.metadata.parser, "app");
        assert_eq!(record.metadata.filename, "/tmp/a.log");
        assert_eq!(record.metadata.server, "web-01");
        assert_eq!(record.raw, "ERROR disk full");
        assert!(parsed.date_error.is_none());
    }

    #[test]
    fn regex_no_match_is_error() {
        let def = ParserDefinition::regex("digits", r"^\d+$", ["/tmp/*.log"]);
        let err = parser().parse(&def, "/tmp/a.log", "letters").unwrap_err();
        assert!(matches!(err, LogPipelineError::NoMatch { .. }));
    }

    #[test]
    fn json_mode_maps_paths() {
        let def = ParserDefinition::json(
            "api",
            [("user", "meta.user.name"), ("missing", "nope")],
            ["/tmp/*.json"],
        );
        let parsed = parser()
            .parse(&def, "/tmp/a.json", r#"{"meta":{"user":{"name":"bob"}}}"#)
            .unwrap();
        let expected: BTreeMap<_, _> = [("user".to_owned(), "bob".to_owned())].into();
        assert_eq!(parsed.record.fields, expected);
    }

    #[test]
    fn date_extract_overwrites_record_date() {
        let def = ParserDefinition::json("api", [("ts", "time")], ["/tmp/*.json"])
            .with_date("ts", "rfc3339");
        let parsed = parser()
            .parse(&def, "/tmp/a.json", r#"{"time":"2026-05-01T00:00:00Z"}"#)
            .unwrap();
        assert_eq!(
            parsed.record.date,
            Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap()
        );
        assert_ne!(parsed.record.date, parsed.record.metadata.capture_date);
    }

    #[test]
    fn bad_date_keeps_capture_time_and_reports() {
        let def = ParserDefinition::regex("app", r"^(?P<ts>\S+) (?P<msg>.*)$", ["/tmp/*.log"])
            .with_date("ts", "%Y-%m-%d");
        let parsed = parser().parse(&def, "/tmp/a.log", "notadate hello").unwrap();

        assert_eq!(parsed.record.date, parsed.record.metadata.capture_date);
        assert!(matches!(
            parsed.date_error,
            Some(LogPipelineError::DateExtract { ref field, .. }) if field == "ts"
        ));
    }

    #[test]
    fn absent_date_field_is_not_an_error() {
        let def = ParserDefinition::json("api", [("msg", "msg")], ["/tmp/*.json"])
            .with_date("ts", "rfc3339");
        let parsed = parser().parse(&def, "/tmp/a.json", r#"{"msg":"hi"}"#).unwrap();
        assert!(parsed.date_error.is_none());
    }

    #[test]
    fn long_lines_are_truncated_before_parsing() {
        let def = ParserDefinition::regex("all", r"^(?P<all>.*)$", ["/tmp/*.log"]);
        let parser = parser().with_max_line_length(8);
        let parsed = parser.parse(&def, "/tmp/a.log", "0123456789abcdef").unwrap();
        assert_eq!(parsed.record.raw, "01234567");
        assert_eq!(parsed.record.fields["all"], "01234567");
    }

    #[test]
    fn truncate_respects_char_boundary() {
        // "é"는 2바이트
        assert_eq!(truncate_line("aé", 2), "a");
        assert_eq!(truncate_line("short", 100), "short");
    }

    #[test]
    fn warm_rejects_invalid_pattern() {
        let defs = vec![ParserDefinition::regex("bad", "(unclosed", ["/tmp/*.log"])];
        let err = parser().warm(&defs).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn from_config_validates_globs() {
        let config = ParserConfig {
            name: "p".to_owned(),
            mode: ParserMode::Regex,
            regex_pattern: Some(".*".to_owned()),
            json_fields: BTreeMap::new(),
            files_included: vec!["/var/log/[".to_owned()],
            files_excluded: Vec::new(),
            date_extract: None,
        };
        assert!(matches!(
            ParserDefinition::from_config(&config).unwrap_err(),
            LogPipelineError::Glob(_)
        ));
    }

    #[test]
    fn from_config_splits_json_paths() {
        let config = ParserConfig {
            name: "api".to_owned(),
            mode: ParserMode::Json,
            regex_pattern: None,
            json_fields: [("user".to_owned(), "meta.user".to_owned())].into(),
            files_included: vec!["/var/log/*.json".to_owned()],
            files_excluded: Vec::new(),
            date_extract: None,
        };
        let def = ParserDefinition::from_config(&config).unwrap();
        assert_eq!(
            def.mode,
            ParseMode::Json {
                fields: vec![JsonField::new("user", "meta.user")]
            }
        );
    }

    #[test]
    fn name_hash_differs_per_parser() {
        let a = ParserDefinition::regex("a", ".*", ["/x"]);
        let b = ParserDefinition::regex("b", ".*", ["/x"]);
        assert_ne!(a.name_hash(), b.name_hash());
        assert_eq!(a.name_hash(), a.clone().name_hash());
    }

    proptest! {
        #[test]
        fn truncate_never_exceeds_limit(s in ".*", max in 0usize..64) {
            let out = truncate_line(&s, max);
            prop_assert!(out.len() <= max);
            prop_assert!(s.starts_with(out));
        }

        #[test]
        fn regex_parser_never_panics(line in ".*") {
            let def = ParserDefinition::regex("p", r"^(?P<a>\w+)?\s*(?P<b>.*)$", ["/x"]);
            let _ = parser().parse(&def, "/x", &line);
        }
    }
}
