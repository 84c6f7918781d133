//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tkwatch_`
//! - 모듈명: `log_monitor_`, `notify_`, `daemon_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(tkwatch_core::metrics::LOG_MONITOR_LINES_READ_TOTAL, "server" => "main").increment(1);
//! ```

use metrics::{describe_counter, describe_gauge};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 서버 레이블 키
pub const LABEL_SERVER: &str = "server";

/// 어드민 카메라 전환 레이블 키 (enter, leave)
pub const LABEL_TRANSITION: &str = "transition";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Log Monitor 메트릭 ────────────────────────────────────────────

/// Log Monitor: 읽은 로그 라인 수 (counter)
pub const LOG_MONITOR_LINES_READ_TOTAL: &str = "tkwatch_log_monitor_lines_read_total";

/// Log Monitor: 디코딩 실패 라인 수 (counter)
pub const LOG_MONITOR_DECODE_ERRORS_TOTAL: &str = "tkwatch_log_monitor_decode_errors_total";

/// Log Monitor: 로그 파일 재오픈 횟수 (counter)
pub const LOG_MONITOR_REOPENS_TOTAL: &str = "tkwatch_log_monitor_reopens_total";

/// Log Monitor: 기록된 데미지 통지 수 (counter)
pub const LOG_MONITOR_DAMAGE_RECORDED_TOTAL: &str = "tkwatch_log_monitor_damage_recorded_total";

/// Log Monitor: 확정된 팀킬 수 (counter)
pub const LOG_MONITOR_TEAMKILLS_TOTAL: &str = "tkwatch_log_monitor_teamkills_total";

/// Log Monitor: 중복으로 억제된 팀킬 통지 수 (counter)
pub const LOG_MONITOR_DUPLICATES_TOTAL: &str = "tkwatch_log_monitor_duplicates_total";

/// Log Monitor: 대응 데미지가 없는 팀킬 통지 수 (counter)
pub const LOG_MONITOR_UNMATCHED_TEAMKILLS_TOTAL: &str =
    "tkwatch_log_monitor_unmatched_teamkills_total";

/// Log Monitor: 로그 ID wraparound 감지 횟수 (counter)
pub const LOG_MONITOR_WRAPAROUNDS_TOTAL: &str = "tkwatch_log_monitor_wraparounds_total";

/// Log Monitor: 어드민 카메라 이벤트 수 (counter, label: transition)
pub const LOG_MONITOR_ADMINCAM_EVENTS_TOTAL: &str = "tkwatch_log_monitor_admincam_events_total";

/// Log Monitor: 감사 로그 쓰기 실패 수 (counter)
pub const LOG_MONITOR_AUDIT_WRITE_FAILURES_TOTAL: &str =
    "tkwatch_log_monitor_audit_write_failures_total";

/// Log Monitor: 채널 포화로 버려진 팀킬 이벤트 수 (counter)
pub const LOG_MONITOR_EVENTS_DROPPED_TOTAL: &str = "tkwatch_log_monitor_events_dropped_total";

/// Log Monitor: 현재 데미지 윈도우 크기 (gauge)
pub const LOG_MONITOR_DAMAGE_WINDOW_SIZE: &str = "tkwatch_log_monitor_damage_window_size";

/// Log Monitor: 현재 어드민 카메라 사용자 수 (gauge)
pub const LOG_MONITOR_ACTIVE_ADMINCAM_USERS: &str = "tkwatch_log_monitor_active_admincam_users";

// ─── Notify 메트릭 ──────────────────────────────────────────────────

/// Notify: 전송 시도 수 (counter, label: result)
pub const NOTIFY_DELIVERIES_TOTAL: &str = "tkwatch_notify_deliveries_total";

// ─── Daemon 메트릭 ─────────────────────────────────────────────────

/// Daemon: 감시 중인 서버 수 (gauge)
pub const DAEMON_SERVERS_MONITORED: &str = "tkwatch_daemon_servers_monitored";

/// Daemon: 빌드 정보 (gauge, 항상 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "tkwatch_daemon_build_info";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    describe_counter!(
        LOG_MONITOR_LINES_READ_TOTAL,
        "Total number of log lines read from monitored files"
    );
    describe_counter!(
        LOG_MONITOR_DECODE_ERRORS_TOTAL,
        "Total number of log lines replaced by the decode error sentinel"
    );
    describe_counter!(
        LOG_MONITOR_REOPENS_TOTAL,
        "Total number of log file reopens after truncation or rotation"
    );
    describe_counter!(
        LOG_MONITOR_DAMAGE_RECORDED_TOTAL,
        "Total number of damage notifications recorded in the window"
    );
    describe_counter!(
        LOG_MONITOR_TEAMKILLS_TOTAL,
        "Total number of correlated teamkills"
    );
    describe_counter!(
        LOG_MONITOR_DUPLICATES_TOTAL,
        "Total number of duplicate teamkill notifications suppressed"
    );
    describe_counter!(
        LOG_MONITOR_UNMATCHED_TEAMKILLS_TOTAL,
        "Total number of teamkill notifications without a buffered damage notification"
    );
    describe_counter!(
        LOG_MONITOR_WRAPAROUNDS_TOTAL,
        "Total number of detected log identifier wraparounds"
    );
    describe_counter!(
        LOG_MONITOR_ADMINCAM_EVENTS_TOTAL,
        "Total number of admin camera transitions by direction"
    );
    describe_counter!(
        LOG_MONITOR_AUDIT_WRITE_FAILURES_TOTAL,
        "Total number of failed admin camera audit log writes"
    );
    describe_counter!(
        LOG_MONITOR_EVENTS_DROPPED_TOTAL,
        "Total number of teamkill events dropped because the dispatch channel was full or closed"
    );
    describe_gauge!(
        LOG_MONITOR_DAMAGE_WINDOW_SIZE,
        "Current number of damage notifications held in the correlation window"
    );
    describe_gauge!(
        LOG_MONITOR_ACTIVE_ADMINCAM_USERS,
        "Current number of users believed to be in admin camera"
    );

    describe_counter!(
        NOTIFY_DELIVERIES_TOTAL,
        "Total number of notification delivery attempts by result"
    );

    describe_gauge!(
        DAEMON_SERVERS_MONITORED,
        "Number of servers whose logs are being monitored"
    );
    describe_gauge!(
        DAEMON_BUILD_INFO,
        "Build information (always 1, with version label)"
    );
}
