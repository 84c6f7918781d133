//! 모니터 -- 서버 한 대의 tail/분류/상관 분석 전체 흐름을 관리합니다.
//!
//! [`TeamKillMonitor`]는 엔진 상태(데미지 윈도우, 상관 분석기, 어드민 카메라 추적기)를
//! 단독으로 소유하며, 한 라인씩 순서대로 처리합니다. 서버끼리는 아무 상태도
//! 공유하지 않습니다.
//!
//! # 내부 흐름
//! ```text
//! LogFollower -> EventClassifier -+-> AdminCamTracker -> audit log
//!                                 +-> DamageWindow
//!                                 +-> TeamKillCorrelator -> TeamKillEvent -> mpsc -> dispatcher
//! ```

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use tkwatch_core::event::TeamKillEvent;
use tkwatch_core::metrics as m;
use tkwatch_core::types::TeamKillRecord;

use crate::admincam::{AdminCamTracker, AuditSink, FileAuditSink};
use crate::classifier::{EventClassifier, LineEvent};
use crate::config::MonitorConfig;
use crate::correlator::{Correlation, TeamKillCorrelator};
use crate::error::LogMonitorError;
use crate::follower::{DECODE_ERROR_LINE, LogFollower};
use crate::window::DamageWindow;

/// 모니터 통계 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    /// 처리한 라인 수
    pub lines_read: u64,
    /// 디코딩 실패 라인 수
    pub decode_errors: u64,
    /// 기록된 데미지 통지 수
    pub damage_recorded: u64,
    /// 확정된 팀킬 수
    pub teamkills: u64,
    /// 중복으로 억제된 팀킬 통지 수
    pub duplicates: u64,
    /// 대응 데미지가 없던 팀킬 통지 수
    pub unmatched_teamkills: u64,
    /// 감지된 wraparound 수
    pub wraparounds: u64,
    /// 어드민 카메라 전환 수
    pub admincam_events: u64,
    /// 감사 로그 기록 실패 수
    pub audit_failures: u64,
    /// 로테이션으로 파일을 다시 연 횟수
    pub rotations: u64,
    /// 채널 포화/종료로 버려진 팀킬 이벤트 수
    pub events_dropped: u64,
}

/// 팀킬 모니터
///
/// # 사용 예시
/// ```ignore
/// use tkwatch_log_monitor::{MonitorConfig, TeamKillMonitor};
///
/// let monitor = TeamKillMonitor::new(config)?;
/// let (tx, rx) = tokio::sync::mpsc::channel(64);
/// let cancel = tokio_util::sync::CancellationToken::new();
/// tokio::spawn(monitor.run(tx, cancel.child_token()));
/// ```
pub struct TeamKillMonitor {
    config: MonitorConfig,
    classifier: EventClassifier,
    window: DamageWindow,
    correlator: TeamKillCorrelator,
    admincam: AdminCamTracker,
    stats: MonitorStats,
}

impl TeamKillMonitor {
    /// 설정의 감사 로그 경로를 사용하는 모니터를 생성합니다.
    pub fn new(config: MonitorConfig) -> Result<Self, LogMonitorError> {
        TeamKillMonitorBuilder::new().config(config).build()
    }

    /// 서버 이름
    pub fn server_name(&self) -> &str {
        &self.config.server_name
    }

    /// 모니터 설정
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// 현재 통계
    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    /// 데미지 윈도우
    pub fn window(&self) -> &DamageWindow {
        &self.window
    }

    /// 어드민 카메라 추적기
    pub fn admincam(&self) -> &AdminCamTracker {
        &self.admincam
    }

    /// 라인 한 줄을 처리하고, 팀킬이 확정되면 기록을 반환합니다.
    pub fn process_line(&mut self, line: &str) -> Option<TeamKillRecord> {
        self.stats.lines_read += 1;
        metrics::counter!(m::LOG_MONITOR_LINES_READ_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
            .increment(1);

        if line == DECODE_ERROR_LINE {
            self.stats.decode_errors += 1;
            metrics::counter!(m::LOG_MONITOR_DECODE_ERRORS_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                .increment(1);
            return None;
        }

        let event = self.classifier.classify(line);
        tracing::trace!(kind = event.kind(), "classified line");

        match event {
            LineEvent::AdminCam(candidate) => {
                self.handle_admincam(candidate);
                None
            }
            LineEvent::Damage(damage) => {
                tracing::debug!(log_id = damage.log_id, victim = %damage.victim, "damage recorded");
                self.window.record(damage);
                self.stats.damage_recorded += 1;
                metrics::counter!(m::LOG_MONITOR_DAMAGE_RECORDED_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                    .increment(1);
                metrics::gauge!(m::LOG_MONITOR_DAMAGE_WINDOW_SIZE, m::LABEL_SERVER => self.config.server_name.clone())
                    .set(self.window.len() as f64);
                None
            }
            LineEvent::TeamKill(notification) => self.handle_teamkill(&notification),
            LineEvent::Unmatched => None,
        }
    }

    /// 로그 파일이 다시 열렸을 때 호출합니다.
    ///
    /// 데미지 윈도우만 비우고, 중복 판정 기록과 어드민 카메라 사용자는 유지합니다.
    pub fn handle_rotation(&mut self) {
        self.stats.rotations += 1;
        self.window.clear();
        metrics::counter!(m::LOG_MONITOR_REOPENS_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
            .increment(1);
        metrics::gauge!(m::LOG_MONITOR_DAMAGE_WINDOW_SIZE, m::LABEL_SERVER => self.config.server_name.clone())
            .set(0.0);
        tracing::info!(rotations = self.stats.rotations, "log reopened, damage window cleared");
    }

    /// 취소될 때까지 로그를 따라가며 확정된 팀킬을 채널로 보냅니다.
    ///
    /// 로그 파일을 (다시) 열지 못하면 에러로 종료합니다.
    /// 채널이 가득 차거나 닫혀도 tail은 멈추지 않습니다.
    pub async fn run(
        self,
        tx: mpsc::Sender<TeamKillEvent>,
        cancel: CancellationToken,
    ) -> Result<MonitorStats, LogMonitorError> {
        let span = tracing::info_span!("monitor", server = %self.config.server_name);
        self.run_inner(tx, cancel).instrument(span).await
    }

    async fn run_inner(
        mut self,
        tx: mpsc::Sender<TeamKillEvent>,
        cancel: CancellationToken,
    ) -> Result<MonitorStats, LogMonitorError> {
        let mut follower = LogFollower::open(
            &self.config.log_path,
            self.config.poll_interval,
            self.config.size_refresh_lines,
        )
        .await?
        .with_max_line_length(self.config.max_line_length);
        let mut rotations = follower.rotations();

        tracing::info!(
            path = %self.config.log_path.display(),
            audit = %self.config.admincam_log_path.display(),
            "monitor started"
        );

        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("monitor cancelled");
                    break;
                }
                line = follower.next_line() => line?,
            };

            if follower.rotations() != rotations {
                rotations = follower.rotations();
                self.handle_rotation();
            }

            if let Some(record) = self.process_line(&line) {
                self.dispatch(&tx, record);
            }
        }

        tracing::info!(
            lines = self.stats.lines_read,
            teamkills = self.stats.teamkills,
            "monitor stopped"
        );
        Ok(self.stats)
    }

    fn handle_admincam(&mut self, candidate: crate::classifier::AdminCamCandidate) {
        let failures_before = self.admincam.audit_failures();

        if let Some(event) = self.admincam.handle(candidate) {
            self.stats.admincam_events += 1;
            metrics::counter!(
                m::LOG_MONITOR_ADMINCAM_EVENTS_TOTAL,
                m::LABEL_SERVER => self.config.server_name.clone(),
                m::LABEL_TRANSITION => event.transition.to_string()
            )
            .increment(1);
        }

        let new_failures = self.admincam.audit_failures() - failures_before;
        if new_failures > 0 {
            self.stats.audit_failures += new_failures;
            metrics::counter!(m::LOG_MONITOR_AUDIT_WRITE_FAILURES_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                .increment(new_failures);
        }

        metrics::gauge!(m::LOG_MONITOR_ACTIVE_ADMINCAM_USERS, m::LABEL_SERVER => self.config.server_name.clone())
            .set(self.admincam.active_count() as f64);
    }

    fn handle_teamkill(
        &mut self,
        notification: &crate::classifier::TeamKillNotification,
    ) -> Option<TeamKillRecord> {
        let wraparounds_before = self.correlator.wraparounds();
        let outcome = self.correlator.correlate(notification, &self.window);

        if self.correlator.wraparounds() != wraparounds_before {
            self.stats.wraparounds += 1;
            metrics::counter!(m::LOG_MONITOR_WRAPAROUNDS_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                .increment(1);
        }

        match outcome {
            Correlation::Emitted(record) => {
                self.stats.teamkills += 1;
                metrics::counter!(m::LOG_MONITOR_TEAMKILLS_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                    .increment(1);
                tracing::info!(
                    log_id = notification.log_id,
                    killer = %record.killer,
                    victim = %record.victim,
                    weapon = %record.weapon,
                    "teamkill detected"
                );
                Some(record)
            }
            Correlation::Duplicate => {
                self.stats.duplicates += 1;
                metrics::counter!(m::LOG_MONITOR_DUPLICATES_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                    .increment(1);
                None
            }
            Correlation::NoDamage => {
                self.stats.unmatched_teamkills += 1;
                metrics::counter!(m::LOG_MONITOR_UNMATCHED_TEAMKILLS_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
                    .increment(1);
                None
            }
        }
    }

    fn dispatch(&mut self, tx: &mpsc::Sender<TeamKillEvent>, record: TeamKillRecord) {
        let event = TeamKillEvent::new(self.config.server_name.clone(), record);
        let trace_id = event.metadata.trace_id.clone();

        let reason = match tx.try_send(event) {
            Ok(()) => {
                tracing::debug!(trace_id = %trace_id, "teamkill event queued");
                return;
            }
            Err(TrySendError::Full(_)) => "channel full",
            Err(TrySendError::Closed(_)) => "channel closed",
        };

        self.stats.events_dropped += 1;
        metrics::counter!(m::LOG_MONITOR_EVENTS_DROPPED_TOTAL, m::LABEL_SERVER => self.config.server_name.clone())
            .increment(1);
        tracing::warn!(trace_id = %trace_id, reason, "teamkill event dropped");
    }
}

/// 모니터 빌더
#[derive(Default)]
pub struct TeamKillMonitorBuilder {
    config: Option<MonitorConfig>,
    audit_sink: Option<Box<dyn AuditSink>>,
}

impl TeamKillMonitorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 모니터 설정을 지정합니다.
    pub fn config(mut self, config: MonitorConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 감사 로그 대상을 지정합니다. 지정하지 않으면 설정의 경로에 파일로 기록합니다.
    pub fn audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// 설정을 검증하고 모니터를 생성합니다.
    pub fn build(self) -> Result<TeamKillMonitor, LogMonitorError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let sink = match self.audit_sink {
            Some(sink) => sink,
            None => Box::new(FileAuditSink::new(config.admincam_log_path.clone())),
        };

        Ok(TeamKillMonitor {
            classifier: EventClassifier::new()?,
            window: DamageWindow::new(config.damage_window_size),
            correlator: TeamKillCorrelator::new(config.wraparound_slack),
            admincam: AdminCamTracker::new(sink),
            stats: MonitorStats::default(),
            config,
        })
    }
}
