//! 팀킬 상관 분석기
//!
//! 팀킬 통지의 로그 ID로 [`DamageWindow`]에서 데미지 통지를 찾아 [`TeamKillRecord`]를
//! 만듭니다. 같은 로그 ID의 팀킬은 한 번만 내보내며, 서버의 로그 ID 카운터가
//! 리셋된 것으로 보이면 (새 ID + slack < 마지막 ID) 중복 판정 기록을 비웁니다.

use std::collections::HashSet;

use tkwatch_core::types::{LogId, TeamKillRecord};

use crate::classifier::TeamKillNotification;
use crate::config::DEFAULT_WRAPAROUND_SLACK;
use crate::window::DamageWindow;

/// 상관 분석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// 새 팀킬 확정
    Emitted(TeamKillRecord),
    /// 이미 내보낸 로그 ID
    Duplicate,
    /// 윈도우에 대응하는 데미지 통지 없음
    NoDamage,
}

impl Correlation {
    /// 확정된 팀킬 기록만 꺼냅니다.
    pub fn into_record(self) -> Option<TeamKillRecord> {
        match self {
            Self::Emitted(record) => Some(record),
            Self::Duplicate | Self::NoDamage => None,
        }
    }
}

/// 팀킬 상관 분석기
#[derive(Debug, Clone)]
pub struct TeamKillCorrelator {
    /// 현재 epoch에서 이미 팀킬로 확정된 로그 ID
    seen: HashSet<LogId>,
    /// 마지막으로 처리한 팀킬 통지의 로그 ID
    last_seen_id: LogId,
    /// wraparound 판정 여유값
    slack: u64,
    /// 감지된 wraparound 횟수
    wraparounds: u64,
}

impl Default for TeamKillCorrelator {
    fn default() -> Self {
        Self::new(DEFAULT_WRAPAROUND_SLACK)
    }
}

impl TeamKillCorrelator {
    /// 새 상관 분석기를 생성합니다.
    pub fn new(slack: u64) -> Self {
        Self {
            seen: HashSet::new(),
            last_seen_id: 0,
            slack,
            wraparounds: 0,
        }
    }

    /// 팀킬 통지를 상관 분석하여 확정된 기록을 반환합니다.
    pub fn attempt(
        &mut self,
        notification: &TeamKillNotification,
        window: &DamageWindow,
    ) -> Option<TeamKillRecord> {
        self.correlate(notification, window).into_record()
    }

    /// [`attempt`](Self::attempt)와 같지만 실패 사유까지 돌려줍니다.
    pub fn correlate(
        &mut self,
        notification: &TeamKillNotification,
        window: &DamageWindow,
    ) -> Correlation {
        let log_id = notification.log_id;

        if log_id.saturating_add(self.slack) < self.last_seen_id {
            tracing::debug!(
                log_id,
                last_seen_id = self.last_seen_id,
                cleared = self.seen.len(),
                "log id wraparound detected, clearing seen teamkills"
            );
            self.seen.clear();
            self.wraparounds += 1;
        }
        self.last_seen_id = log_id;

        if self.seen.contains(&log_id) {
            tracing::debug!(log_id, "duplicate teamkill notification");
            return Correlation::Duplicate;
        }

        let Some(damage) = window.find(log_id) else {
            tracing::debug!(log_id, "no buffered damage for teamkill notification");
            return Correlation::NoDamage;
        };

        self.seen.insert(log_id);
        Correlation::Emitted(TeamKillRecord {
            time_utc: damage.timestamp.and_utc(),
            victim: damage.victim.clone(),
            killer: damage.killer.clone(),
            weapon: damage.weapon.clone(),
        })
    }

    /// 마지막으로 처리한 로그 ID
    pub fn last_seen_id(&self) -> LogId {
        self.last_seen_id
    }

    /// 현재 epoch에서 확정된 로그 ID 수
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// 감지된 wraparound 횟수
    pub fn wraparounds(&self) -> u64 {
        self.wraparounds
    }
}
