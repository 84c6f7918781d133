//! 라인 분류기 -- 게임 로그 한 줄을 이벤트 종류 하나로 분류합니다.
//!
//! 패턴은 고정된 우선순위로 평가되며, 처음 일치한 패턴에서 멈춥니다.
//!
//! 1. 어드민 카메라 진입 (`ASQPlayerController::Possess` + `Pawn=CameraMan_C_`)
//! 2. 어드민 카메라 이탈 후보 (`ASQPlayerController::UnPossess`)
//! 3. 데미지 통지 (`LogSquad: Player:... ActualDamage=... caused by BP_...`)
//! 4. 팀킬 통지 (`LogSquadScorePoints:...TeamKilled`)
//!
//! 어느 패턴에도 맞지 않는 라인은 [`LineEvent::Unmatched`]이며 에러가 아닙니다.

use chrono::NaiveDateTime;
use regex::{Captures, Regex};

use tkwatch_core::types::{LogId, Transition};

use crate::error::LogMonitorError;

/// 게임 로그 타임스탬프 형식 (`2024.01.01-00.00.00:000`, UTC)
pub const LOG_TIME_FORMAT: &str = "%Y.%m.%d-%H.%M.%S:%3f";

const POSSESS_PATTERN: &str = r"\[(?P<time>[^\]]+)\]\[(?P<log_id>[0-9]+)\][^\n]*ASQPlayerController::Possess[^\n]*PC=(?P<user>.*) [^\n]*Pawn=CameraMan_C_";

const UNPOSSESS_PATTERN: &str = r"\[(?P<time>[^\]]+)\]\[(?P<log_id>[0-9]+)\][^\n]*ASQPlayerController::UnPossess[^\n]*PC=(?P<user>.*)";

const DAMAGE_PATTERN: &str = r"\[(?P<time>[^\]]+)\]\[(?P<log_id>[0-9]+)\]LogSquad: Player:(?P<victim>.*) ActualDamage=.* from (?P<killer>.*) caused by BP_(?P<weapon>[^_]*)_";

const TEAMKILL_PATTERN: &str = r"\[(?P<log_id>[0-9]+)\][^\n]*LogSquadScorePoints:[^\n]*TeamKilled";

/// 어드민 카메라 전환 후보
///
/// `Leave`는 일반 폰의 unpossess에서도 발생하므로 추적기에서 걸러집니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCamCandidate {
    /// 라인 시각 (UTC)
    pub time: NaiveDateTime,
    /// 로그 ID
    pub log_id: LogId,
    /// 사용자
    pub user: String,
    /// 전환 방향
    pub transition: Transition,
}

/// 데미지 통지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageNotification {
    /// 로그 ID (팀킬 통지와의 상관 키)
    pub log_id: LogId,
    /// 라인 시각 (UTC)
    pub timestamp: NaiveDateTime,
    /// 피해자
    pub victim: String,
    /// 가해자
    pub killer: String,
    /// 무기
    pub weapon: String,
}

/// 팀킬 통지 -- 로그 ID 외의 정보는 없습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TeamKillNotification {
    /// 로그 ID
    pub log_id: LogId,
}

/// 분류 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// 어드민 카메라 전환 후보
    AdminCam(AdminCamCandidate),
    /// 데미지 통지
    Damage(DamageNotification),
    /// 팀킬 통지
    TeamKill(TeamKillNotification),
    /// 관심 없는 라인
    Unmatched,
}

impl LineEvent {
    /// 로깅용 분류 이름
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AdminCam(_) => "admincam",
            Self::Damage(_) => "damage",
            Self::TeamKill(_) => "teamkill",
            Self::Unmatched => "unmatched",
        }
    }
}

/// 라인 분류기
///
/// 정규식은 생성 시점에 한 번 컴파일되며 이후 분류는 상태가 없습니다.
#[derive(Debug, Clone)]
pub struct EventClassifier {
    possess: Regex,
    unpossess: Regex,
    damage: Regex,
    teamkill: Regex,
}

impl EventClassifier {
    /// 모든 패턴을 컴파일하여 분류기를 생성합니다.
    pub fn new() -> Result<Self, LogMonitorError> {
        Ok(Self {
            possess: Regex::new(POSSESS_PATTERN)?,
            unpossess: Regex::new(UNPOSSESS_PATTERN)?,
            damage: Regex::new(DAMAGE_PATTERN)?,
            teamkill: Regex::new(TEAMKILL_PATTERN)?,
        })
    }

    /// 라인 한 줄을 분류합니다.
    ///
    /// 패턴은 일치했지만 시각이나 로그 ID를 해석할 수 없는 라인은
    /// `Unmatched`로 처리됩니다.
    pub fn classify(&self, line: &str) -> LineEvent {
        if let Some(caps) = self.possess.captures(line) {
            return admincam(&caps, Transition::Enter);
        }

        if let Some(caps) = self.unpossess.captures(line) {
            return admincam(&caps, Transition::Leave);
        }

        if let Some(caps) = self.damage.captures(line) {
            return damage(&caps);
        }

        if let Some(caps) = self.teamkill.captures(line) {
            return match parse_log_id(&caps) {
                Some(log_id) => LineEvent::TeamKill(TeamKillNotification { log_id }),
                None => LineEvent::Unmatched,
            };
        }

        LineEvent::Unmatched
    }
}

/// 게임 로그 타임스탬프를 파싱합니다.
pub fn parse_log_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, LOG_TIME_FORMAT).ok()
}

fn admincam(caps: &Captures<'_>, transition: Transition) -> LineEvent {
    let (Some(time), Some(log_id)) = (parse_time(caps), parse_log_id(caps)) else {
        return LineEvent::Unmatched;
    };

    LineEvent::AdminCam(AdminCamCandidate {
        time,
        log_id,
        user: group(caps, "user"),
        transition,
    })
}

fn damage(caps: &Captures<'_>) -> LineEvent {
    let (Some(timestamp), Some(log_id)) = (parse_time(caps), parse_log_id(caps)) else {
        return LineEvent::Unmatched;
    };

    LineEvent::Damage(DamageNotification {
        log_id,
        timestamp,
        victim: group(caps, "victim"),
        killer: group(caps, "killer"),
        weapon: group(caps, "weapon"),
    })
}

fn group(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}

fn parse_time(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let raw = caps.name("time")?.as_str();
    let parsed = parse_log_time(raw);
    if parsed.is_none() {
        tracing::debug!(time = raw, "unparseable log timestamp, ignoring line");
    }
    parsed
}

fn parse_log_id(caps: &Captures<'_>) -> Option<LogId> {
    let raw = caps.name("log_id")?.as_str();
    let parsed = raw.parse().ok();
    if parsed.is_none() {
        tracing::debug!(log_id = raw, "log id out of range, ignoring line");
    }
    parsed
}
