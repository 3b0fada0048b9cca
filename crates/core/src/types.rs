//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 파서가 만든 [`Record`]는 이벤트 버스를 통해 알림 엔진과 전송기에
//! `Arc`로 공유되며, 발행 이후에는 변경되지 않습니다.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `_parser` 특수 필드 -- 레코드 메타데이터의 파서 이름을 참조합니다.
pub const FIELD_PARSER: &str = "_parser";
/// `_filename` 특수 필드 -- 레코드 메타데이터의 파일 경로를 참조합니다.
pub const FIELD_FILENAME: &str = "_filename";

/// 에이전트가 실행 중인 호스트의 식별 정보
///
/// 시작 시 한 번 만들어지고 모든 레코드 메타데이터에 복사됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostIdentity {
    /// 에이전트 버전
    pub agent_version: String,
    /// 애플리케이션 이름
    pub application: String,
    /// 워크스페이스 (수집 서버 측 구분자)
    pub workspace: String,
    /// 호스트명
    pub server: String,
}

impl HostIdentity {
    /// 현재 크레이트 버전으로 식별 정보를 생성합니다.
    pub fn new(
        application: impl Into<String>,
        workspace: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            agent_version: env!("CARGO_PKG_VERSION").to_owned(),
            application: application.into(),
            workspace: workspace.into(),
            server: server.into(),
        }
    }
}

/// 레코드 캡처 메타데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// 에이전트 버전
    pub agent_version: String,
    /// 애플리케이션 이름
    pub application: String,
    /// 워크스페이스
    pub workspace: String,
    /// 호스트명
    pub server: String,
    /// 원본 파일 경로
    pub filename: String,
    /// 레코드를 만든 파서 이름
    pub parser: String,
    /// 캡처 시각
    pub capture_date: DateTime<Utc>,
}

/// 로그 레코드
///
/// 하나의 로그 라인에서 추출된 구조화된 데이터입니다.
/// 모든 필드 값은 문자열로 정규화됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// 캡처 메타데이터
    pub metadata: RecordMetadata,
    /// 이벤트 시각 (기본: 캡처 시각, 날짜 추출 성공 시 덮어씀)
    pub date: DateTime<Utc>,
    /// 원본 라인
    pub raw: String,
    /// 추출된 필드
    pub fields: BTreeMap<String, String>,
}

impl Record {
    /// 캡처 시각을 지금으로 하는 빈 레코드를 생성합니다.
    pub fn new(
        identity: &HostIdentity,
        parser: impl Into<String>,
        filename: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            metadata: RecordMetadata {
                agent_version: identity.agent_version.clone(),
                application: identity.application.clone(),
                workspace: identity.workspace.clone(),
                server: identity.server.clone(),
                filename: filename.into(),
                parser: parser.into(),
                capture_date: now,
            },
            date: now,
            raw: raw.into(),
            fields: BTreeMap::new(),
        }
    }

    /// 조건 평가용 필드 값을 조회합니다.
    ///
    /// `_parser`, `_filename`은 메타데이터에서, 나머지는 필드 맵에서 읽습니다.
    pub fn resolve(&self, field: &str) -> Option<&str> {
        match field {
            FIELD_PARSER => Some(&self.metadata.parser),
            FIELD_FILENAME => Some(&self.metadata.filename),
            _ => self.fields.get(field).map(String::as_str),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.metadata.parser,
            self.date.to_rfc3339(),
            self.metadata.filename,
            self.raw,
        )
    }
}

/// 트리거 알림
///
/// 레코드가 트리거 규칙에 매칭되면 생성됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID
    pub id: String,
    /// 이벤트 시각
    pub date: DateTime<Utc>,
    /// 원본 파일 경로
    pub filename: String,
    /// 파서 이름
    pub parser: String,
    /// 매칭된 트리거 이름
    pub trigger: String,
    /// 원본 라인
    pub raw: String,
    /// 레코드 필드
    pub fields: BTreeMap<String, String>,
}

impl Alert {
    /// 레코드와 트리거 이름으로 알림을 생성합니다.
    pub fn from_record(record: &Record, trigger: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            date: record.date,
            filename: record.metadata.filename.clone(),
            parser: record.metadata.parser.clone(),
            trigger: trigger.into(),
            raw: record.raw.clone(),
            fields: record.fields.clone(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.trigger, self.filename, self.parser, self.raw,
        )
    }
}
