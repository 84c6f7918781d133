//! 이벤트 봉투 — 모니터와 알림 디스패처 사이의 전달 단위
//!
//! 모니터는 상관 분석이 끝난 [`TeamKillRecord`]를 [`TeamKillEvent`]로 감싸
//! `tokio::mpsc` 채널로 내보냅니다. [`EventMetadata`]는 발생 시각, 생성 모듈,
//! 추적 ID를 담아 로그에서 한 건의 팀킬 흐름을 따라갈 수 있게 합니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::TeamKillRecord;

// --- 모듈명 상수 ---

/// 로그 모니터 모듈명
pub const MODULE_LOG_MONITOR: &str = "log-monitor";

// --- 이벤트 타입 상수 ---

/// 팀킬 이벤트 타입
pub const EVENT_TYPE_TEAMKILL: &str = "teamkill";

/// 이벤트 메타데이터 — 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 추적 ID — 같은 흐름의 로그 레코드를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 새로운 UUID v4 trace_id를 생성하여 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl fmt::Display for EventMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] source={} trace={}",
            unix_timestamp_str(self.timestamp),
            self.source_module,
            self.trace_id,
        )
    }
}

/// 모든 이벤트가 구현해야 하는 기본 trait
///
/// `Send + Sync + 'static` 바운드로 `tokio::mpsc` 채널을 통한 전송을 보장합니다.
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅에 사용)
    fn event_type(&self) -> &str;
}

/// 상관 분석으로 확정된 팀킬 이벤트
#[derive(Debug, Clone)]
pub struct TeamKillEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 이벤트가 발생한 서버 이름
    pub server: String,
    /// 팀킬 기록
    pub teamkill: TeamKillRecord,
}

impl TeamKillEvent {
    /// 새로운 trace를 시작하는 팀킬 이벤트를 생성합니다.
    pub fn new(server: impl Into<String>, teamkill: TeamKillRecord) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::with_new_trace(MODULE_LOG_MONITOR),
            server: server.into(),
            teamkill,
        }
    }
}

impl Event for TeamKillEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_TYPE_TEAMKILL
    }
}

impl fmt::Display for TeamKillEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TeamKillEvent[{}] server={} killer={} victim={} weapon={}",
            &self.id[..8.min(self.id.len())],
            self.server,
            self.teamkill.killer,
            self.teamkill.victim,
            self.teamkill.weapon,
        )
    }
}

/// SystemTime을 사람이 읽을 수 있는 형태로 변환합니다.
fn unix_timestamp_str(time: SystemTime) -> String {
    match time.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(duration) => {
            let secs = duration.as_secs();
            format!("{secs}")
        }
        Err(_) => "unknown".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample_record() -> TeamKillRecord {
        TeamKillRecord {
            time_utc: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            victim: "V".to_owned(),
            killer: "K".to_owned(),
            weapon: "AK47".to_owned(),
        }
    }

    #[test]
    fn teamkill_event_has_fresh_ids() {
        let a = TeamKillEvent::new("server-1", sample_record());
        let b = TeamKillEvent::new("server-1", sample_record());
        assert_ne!(a.id, b.id);
        assert_ne!(a.metadata.trace_id, b.metadata.trace_id);
        assert_eq!(a.metadata.source_module, MODULE_LOG_MONITOR);
        assert_eq!(a.event_type(), EVENT_TYPE_TEAMKILL);
    }

    #[test]
    fn teamkill_event_display() {
        let event = TeamKillEvent::new("server-1", sample_record());
        let display = event.to_string();
        assert!(display.starts_with("TeamKillEvent["));
        assert!(display.contains("server=server-1"));
        assert!(display.contains("killer=K"));
        assert!(display.contains("weapon=AK47"));
    }

    #[test]
    fn metadata_display_contains_source() {
        let meta = EventMetadata::with_new_trace(MODULE_LOG_MONITOR);
        assert!(meta.to_string().contains("source=log-monitor"));
    }
}
