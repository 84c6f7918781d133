//! 어드민 카메라 추적기
//!
//! 어드민 카메라 모드에 들어가 있는 사용자 집합을 유지하고 진입/이탈 전환을
//! 감사 로그에 한 줄씩 남깁니다. unpossess 패턴은 일반 폰에서도 나타나므로
//! 진입 기록이 없는 사용자의 이탈은 오탐으로 보고 무시합니다.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tkwatch_core::types::{AdminCamEvent, Transition};
use tokio::runtime::RuntimeFlavor;

use crate::classifier::AdminCamCandidate;
use crate::error::LogMonitorError;

/// 감사 로그 기록 대상
pub trait AuditSink: Send {
    /// 한 줄을 기록합니다 (개행 미포함).
    fn append(&mut self, line: &str) -> Result<(), LogMonitorError>;
}

/// 파일 감사 로그
///
/// 이벤트마다 append 모드로 열고, 쓰고, flush한 뒤 닫습니다.
/// 멀티 스레드 런타임에서는 `block_in_place`로 감싸 다른 태스크를 막지 않습니다.
#[derive(Debug, Clone)]
pub struct FileAuditSink {
    path: PathBuf,
}

impl FileAuditSink {
    /// 새 파일 감사 로그를 생성합니다. 파일은 첫 기록 시점에 만들어집니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 감사 로그 경로
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for FileAuditSink {
    fn append(&mut self, line: &str) -> Result<(), LogMonitorError> {
        let write = || -> std::io::Result<()> {
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            writeln!(file, "{line}")?;
            file.flush()
        };

        run_blocking(write).map_err(|source| LogMonitorError::AuditWrite {
            path: self.path.clone(),
            source,
        })
    }
}

/// 블로킹 파일 I/O를 실행합니다.
///
/// `block_in_place`는 current-thread 런타임에서 패닉하므로 그때는 그대로 호출합니다.
fn run_blocking<T>(f: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// 어드민 카메라 추적기
pub struct AdminCamTracker {
    active: HashSet<String>,
    sink: Box<dyn AuditSink>,
    audit_failures: u64,
}

impl AdminCamTracker {
    /// 감사 로그 대상을 받아 추적기를 생성합니다.
    pub fn new(sink: Box<dyn AuditSink>) -> Self {
        Self {
            active: HashSet::new(),
            sink,
            audit_failures: 0,
        }
    }

    /// 전환 후보를 처리합니다.
    ///
    /// 실제 전환이면 이벤트를 감사 로그에 기록하고 반환합니다.
    /// 감사 로그 기록이 실패해도 상태 변경은 유지됩니다.
    pub fn handle(&mut self, candidate: AdminCamCandidate) -> Option<AdminCamEvent> {
        match candidate.transition {
            Transition::Enter => {
                self.active.insert(candidate.user.clone());
            }
            Transition::Leave => {
                if !self.active.remove(&candidate.user) {
                    tracing::trace!(user = %candidate.user, "unpossess for inactive user ignored");
                    return None;
                }
            }
        }

        let event = AdminCamEvent {
            time_utc: candidate.time.and_utc(),
            transition: candidate.transition,
            user: candidate.user,
        };

        let line = event.audit_line();
        if let Err(e) = self.sink.append(&line) {
            self.audit_failures += 1;
            tracing::error!(error = %e, user = %event.user, "failed to write admin camera audit line");
        }
        tracing::info!(user = %event.user, transition = %event.transition, "admin camera transition");

        Some(event)
    }

    /// 사용자가 현재 어드민 카메라 모드인지 여부
    pub fn is_active(&self, user: &str) -> bool {
        self.active.contains(user)
    }

    /// 현재 어드민 카메라 사용자 수
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// 감사 로그 기록 실패 횟수
    pub fn audit_failures(&self) -> u64 {
        self.audit_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::parse_log_time;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl AuditSink for MemorySink {
        fn append(&mut self, line: &str) -> Result<(), LogMonitorError> {
            self.lines.lock().unwrap().push(line.to_owned());
            Ok(())
        }
    }

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn append(&mut self, _line: &str) -> Result<(), LogMonitorError> {
            Err(LogMonitorError::AuditWrite {
                path: PathBuf::from("/nonexistent/admincam.log"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            })
        }
    }

    fn candidate(user: &str, transition: Transition) -> AdminCamCandidate {
        AdminCamCandidate {
            time: parse_log_time("2024.01.02-03.04.05:000").unwrap(),
            log_id: 1,
            user: user.to_owned(),
            transition,
        }
    }

    #[test]
    fn enter_then_leave_emits_two_events() {
        let sink = MemorySink::default();
        let mut tracker = AdminCamTracker::new(Box::new(sink.clone()));

        let enter = tracker.handle(candidate("Alice", Transition::Enter)).unwrap();
        assert!(tracker.is_active("Alice"));
        let leave = tracker.handle(candidate("Alice", Transition::Leave)).unwrap();
        assert!(!tracker.is_active("Alice"));

        assert_eq!(enter.transition, Transition::Enter);
        assert_eq!(leave.transition, Transition::Leave);
        assert_eq!(
            *sink.lines.lock().unwrap(),
            vec![
                "[2024.01.02 - 03:04:05 UTC] ++++++++++++ ENTER: Alice".to_owned(),
                "[2024.01.02 - 03:04:05 UTC] --- POSSIBLE LEAVE: Alice".to_owned(),
            ]
        );
    }

    #[test]
    fn leave_without_enter_is_false_positive() {
        let sink = MemorySink::default();
        let mut tracker = AdminCamTracker::new(Box::new(sink.clone()));

        assert!(tracker.handle(candidate("Bob", Transition::Leave)).is_none());
        assert!(sink.lines.lock().unwrap().is_empty());
    }

    #[test]
    fn repeated_enter_is_idempotent_but_logged() {
        let sink = MemorySink::default();
        let mut tracker = AdminCamTracker::new(Box::new(sink.clone()));

        tracker.handle(candidate("Alice", Transition::Enter));
        tracker.handle(candidate("Alice", Transition::Enter));
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(sink.lines.lock().unwrap().len(), 2);

        assert!(tracker.handle(candidate("Alice", Transition::Leave)).is_some());
        assert!(tracker.handle(candidate("Alice", Transition::Leave)).is_none());
    }

    #[test]
    fn sink_failure_keeps_state_change() {
        let mut tracker = AdminCamTracker::new(Box::new(FailingSink));

        assert!(tracker.handle(candidate("Alice", Transition::Enter)).is_some());
        assert!(tracker.is_active("Alice"));
        assert_eq!(tracker.audit_failures(), 1);
    }

    #[test]
    fn file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admincam.log");
        let mut sink = FileAuditSink::new(&path);

        sink.append("first").unwrap();
        sink.append("second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_sink_appends_inside_multi_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admincam.log");
        let mut tracker = AdminCamTracker::new(Box::new(FileAuditSink::new(&path)));

        tracker.handle(candidate("Alice", Transition::Enter));
        assert_eq!(tracker.audit_failures(), 0);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[2024.01.02 - 03:04:05 UTC] ++++++++++++ ENTER: Alice\n"
        );
    }

    #[tokio::test]
    async fn file_sink_appends_inside_current_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admincam.log");
        let mut sink = FileAuditSink::new(&path);

        sink.append("line").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn file_sink_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("admincam.log");
        let mut sink = FileAuditSink::new(&path);

        let err = sink.append("line").unwrap_err();
        assert!(matches!(err, LogMonitorError::AuditWrite { .. }));
        assert!(err.to_string().contains("admincam.log"));
    }
}
