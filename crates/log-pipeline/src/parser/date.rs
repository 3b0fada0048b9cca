//! 날짜 추출
//!
//! 형식 문자열은 chrono `strftime` 문법(`%Y-%m-%d %H:%M:%S`)이며,
//! `rfc3339`, `rfc2822` 키워드도 받습니다.
//! 오프셋이 없는 형식은 UTC로, 날짜만 있는 형식은 UTC 자정으로 해석합니다.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// RFC 3339 키워드
pub const RFC3339: &str = "rfc3339";
/// RFC 2822 키워드
pub const RFC2822: &str = "rfc2822";

/// 값을 형식에 맞춰 UTC 시각으로 해석합니다.
pub fn parse_date(value: &str, format: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let value = value.trim();
    match format {
        RFC3339 => DateTime::parse_from_rfc3339(value).map(|d| d.with_timezone(&Utc)),
        RFC2822 => DateTime::parse_from_rfc2822(value).map(|d| d.with_timezone(&Utc)),
        _ => {
            if let Ok(with_offset) = DateTime::parse_from_str(value, format) {
                return Ok(with_offset.with_timezone(&Utc));
            }
            match NaiveDateTime::parse_from_str(value, format) {
                Ok(naive) => Ok(naive.and_utc()),
                Err(err) => NaiveDate::parse_from_str(value, format)
                    .map(|date| date.and_time(NaiveTime::MIN).and_utc())
                    .map_err(|_| err),
            }
        }
    }
}
