//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 컴포넌트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tailpost_`
//! - 컴포넌트명: `watcher_`, `parser_`, `alerter_`, `emitter_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tailpost_core::metrics::WATCHER_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 파서 이름 레이블 키
pub const LABEL_PARSER: &str = "parser";

/// 트리거 이름 레이블 키
pub const LABEL_TRIGGER: &str = "trigger";

/// 알림 협력자 레이블 키 (log, webhook)
pub const LABEL_NOTIFIER: &str = "notifier";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Watcher 메트릭 ─────────────────────────────────────────────────

/// Watcher: 활성 tail 세션 수 (gauge)
pub const WATCHER_SESSIONS_ACTIVE: &str = "tailpost_watcher_sessions_active";

/// Watcher: 새로 발견한 파일 수 (counter)
pub const WATCHER_FILES_DISCOVERED_TOTAL: &str = "tailpost_watcher_files_discovered_total";

/// Watcher: 읽은 라인 수 (counter)
pub const WATCHER_LINES_READ_TOTAL: &str = "tailpost_watcher_lines_read_total";

/// Watcher: 파일 회전/잘림 감지 수 (counter)
pub const WATCHER_ROTATIONS_TOTAL: &str = "tailpost_watcher_rotations_total";

// ─── Parser 메트릭 ──────────────────────────────────────────────────

/// Parser: 생성된 레코드 수 (counter, label: parser)
pub const PARSER_RECORDS_TOTAL: &str = "tailpost_parser_records_total";

/// Parser: 파싱 실패로 버린 라인 수 (counter, label: parser)
pub const PARSER_ERRORS_TOTAL: &str = "tailpost_parser_errors_total";

/// Parser: 날짜 추출 실패 수 (counter, label: parser)
pub const PARSER_DATE_ERRORS_TOTAL: &str = "tailpost_parser_date_errors_total";

/// Parser: 라인 파싱 지연 시간 (histogram, 초)
pub const PARSER_DURATION_SECONDS: &str = "tailpost_parser_duration_seconds";

// ─── Alerter 메트릭 ─────────────────────────────────────────────────

/// Alerter: 트리거 매칭 수 (counter, label: trigger)
pub const ALERTER_MATCHES_TOTAL: &str = "tailpost_alerter_matches_total";

/// Alerter: 평가 큐 포화로 버린 레코드 수 (counter)
pub const ALERTER_QUEUE_DROPPED_TOTAL: &str = "tailpost_alerter_queue_dropped_total";

/// Alerter: 전달한 알림 배치 수 (counter, labels: notifier, result)
pub const ALERTER_NOTIFICATIONS_TOTAL: &str = "tailpost_alerter_notifications_total";

/// Alerter: 플러시 대기 중인 알림 수 (gauge)
pub const ALERTER_PENDING_ALERTS: &str = "tailpost_alerter_pending_alerts";

// ─── Emitter 메트릭 ─────────────────────────────────────────────────

/// Emitter: 전송 성공한 배치 수 (counter)
pub const EMITTER_BATCHES_SENT_TOTAL: &str = "tailpost_emitter_batches_sent_total";

/// Emitter: 전송 성공한 레코드 수 (counter)
pub const EMITTER_RECORDS_SENT_TOTAL: &str = "tailpost_emitter_records_sent_total";

/// Emitter: 전송 실패 수 (counter)
pub const EMITTER_SEND_FAILURES_TOTAL: &str = "tailpost_emitter_send_failures_total";

/// Emitter: 버퍼 용량 초과로 버린 레코드 수 (counter)
pub const EMITTER_RECORDS_DROPPED_TOTAL: &str = "tailpost_emitter_records_dropped_total";

/// Emitter: 버퍼 내 레코드 수 (gauge)
pub const EMITTER_BUFFER_SIZE: &str = "tailpost_emitter_buffer_size";

/// Emitter: 배치 전송 소요 시간 (histogram, 초)
pub const EMITTER_SEND_DURATION_SECONDS: &str = "tailpost_emitter_send_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "tailpost_daemon_uptime_seconds";

/// Daemon: 등록된 컴포넌트 수 (gauge)
pub const DAEMON_COMPONENTS_REGISTERED: &str = "tailpost_daemon_components_registered";

/// Daemon: 빌드 정보 (gauge, 항상 1, labels: version, rust_version)
pub const DAEMON_BUILD_INFO: &str = "tailpost_daemon_build_info";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 라인 파싱 지연 시간 히스토그램 버킷 (초)
///
/// 10us ~ 100ms 범위
pub const PARSE_DURATION_BUCKETS: [f64; 9] = [
    0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1,
];

/// 배치 전송 소요 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 30s 범위 (기본 타임아웃 30초)
pub const SEND_DURATION_BUCKETS: [f64; 9] = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 10.0, 30.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `tailpost-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Watcher
    describe_gauge!(
        WATCHER_SESSIONS_ACTIVE,
        "Number of (parser, file) tail sessions currently running"
    );
    describe_counter!(
        WATCHER_FILES_DISCOVERED_TOTAL,
        "Total number of files that started a new tail session"
    );
    describe_counter!(
        WATCHER_LINES_READ_TOTAL,
        "Total number of complete lines read from tailed files"
    );
    describe_counter!(
        WATCHER_ROTATIONS_TOTAL,
        "Total number of file rotations or truncations detected"
    );

    // Parser
    describe_counter!(
        PARSER_RECORDS_TOTAL,
        "Total number of records produced, by parser"
    );
    describe_counter!(
        PARSER_ERRORS_TOTAL,
        "Total number of lines dropped because they failed to parse"
    );
    describe_counter!(
        PARSER_DATE_ERRORS_TOTAL,
        "Total number of records whose date field could not be parsed"
    );
    describe_histogram!(
        PARSER_DURATION_SECONDS,
        "Time to parse a single line in seconds"
    );

    // Alerter
    describe_counter!(
        ALERTER_MATCHES_TOTAL,
        "Total number of trigger matches, by trigger"
    );
    describe_counter!(
        ALERTER_QUEUE_DROPPED_TOTAL,
        "Total number of records not evaluated because the queue was full"
    );
    describe_counter!(
        ALERTER_NOTIFICATIONS_TOTAL,
        "Total number of notification deliveries, by notifier and result"
    );
    describe_gauge!(
        ALERTER_PENDING_ALERTS,
        "Number of alerts waiting for the next flush"
    );

    // Emitter
    describe_counter!(
        EMITTER_BATCHES_SENT_TOTAL,
        "Total number of batches accepted by the collector"
    );
    describe_counter!(
        EMITTER_RECORDS_SENT_TOTAL,
        "Total number of records accepted by the collector"
    );
    describe_counter!(
        EMITTER_SEND_FAILURES_TOTAL,
        "Total number of failed batch transmissions"
    );
    describe_counter!(
        EMITTER_RECORDS_DROPPED_TOTAL,
        "Total number of records dropped due to buffer overflow"
    );
    describe_gauge!(
        EMITTER_BUFFER_SIZE,
        "Current number of records waiting to be sent"
    );
    describe_histogram!(
        EMITTER_SEND_DURATION_SECONDS,
        "Time to send a single batch in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Tailpost daemon uptime in seconds");
    describe_gauge!(
        DAEMON_COMPONENTS_REGISTERED,
        "Number of components registered in the daemon"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version labels)"
    );
}
