//! 로그 모니터 에러 타입
//!
//! [`LogMonitorError`]는 로그 모니터 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogMonitorError> for TkwatchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::path::PathBuf;

use tkwatch_core::error::{MonitorError, TkwatchError};

/// 로그 모니터 도메인 에러
///
/// 파일 열기, 패턴 컴파일, 설정 검증, 감사 로그 기록 에러를 포괄합니다.
#[derive(Debug, thiserror::Error)]
pub enum LogMonitorError {
    /// 로그 파일 열기 실패 (해당 서버 모니터에 치명적)
    #[error("failed to open log file {}: {source}", path.display())]
    Open {
        /// 열려고 한 경로
        path: PathBuf,
        /// 원인 I/O 에러
        source: std::io::Error,
    },

    /// 일시적 I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 감사 로그 기록 실패
    #[error("failed to write audit log {}: {source}", path.display())]
    AuditWrite {
        /// 감사 로그 경로
        path: PathBuf,
        /// 원인 I/O 에러
        source: std::io::Error,
    },
}

impl From<LogMonitorError> for TkwatchError {
    fn from(err: LogMonitorError) -> Self {
        TkwatchError::Monitor(MonitorError::InitFailed(err.to_string()))
    }
}
