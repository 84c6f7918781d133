//! 도메인 타입 — 모니터가 외부로 내보내는 데이터 구조
//!
//! [`TeamKillRecord`]는 엔진의 유일한 외부 출력이며,
//! [`AdminCamEvent`]는 감사 로그로만 기록되는 부수 출력입니다.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 서버가 이벤트마다 부여하는 로그 식별자
///
/// 파일 수명 동안 전역적으로 유일하지 않으며, 카운터가 리셋되면 작은 값으로 되돌아갑니다.
pub type LogId = u64;

/// 팀킬 기록
///
/// 팀킬 통지가 버퍼에 있는 데미지 통지와 로그 ID로 연결되었을 때만 생성됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamKillRecord {
    /// 데미지 로그 라인의 시각 (UTC)
    pub time_utc: DateTime<Utc>,
    /// 피해자
    pub victim: String,
    /// 가해자
    pub killer: String,
    /// 무기 이름 (`BP_` 접두어와 `_` 이후 접미어 제거)
    pub weapon: String,
}

impl fmt::Display for TeamKillRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} teamkilled {} with {}",
            self.time_utc.format("%Y-%m-%dT%H:%M:%SZ"),
            self.killer,
            self.victim,
            self.weapon,
        )
    }
}

/// 어드민 카메라 상태 전환 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// 어드민 카메라 진입
    Enter,
    /// 어드민 카메라 이탈
    Leave,
}

impl Transition {
    /// 감사 로그에 기록되는 마커 문자열
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Enter => "++++++++++++ ENTER",
            Self::Leave => "--- POSSIBLE LEAVE",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enter => write!(f, "enter"),
            Self::Leave => write!(f, "leave"),
        }
    }
}

/// 어드민 카메라 전환 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCamEvent {
    /// 로그 라인의 시각 (UTC)
    pub time_utc: DateTime<Utc>,
    /// 전환 방향
    pub transition: Transition,
    /// 사용자 식별자
    pub user: String,
}

impl AdminCamEvent {
    /// 감사 로그 한 줄 형식으로 변환합니다 (개행 미포함).
    ///
    /// 형식: `[YYYY.MM.DD - HH:MM:SS UTC] <marker>: <user>`
    pub fn audit_line(&self) -> String {
        format!(
            "[{} UTC] {}: {}",
            self.time_utc.format("%Y.%m.%d - %H:%M:%S"),
            self.transition.marker(),
            self.user,
        )
    }
}
