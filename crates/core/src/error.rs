//! 에러 타입 — 도메인별 에러 정의

/// tkwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TkwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 로그 모니터 처리 에러
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// 알림 전송 에러
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 로그 모니터 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// 모니터 초기화 실패 (로그 파일 열기 실패 등)
    #[error("monitor init failed: {0}")]
    InitFailed(String),
}

/// 알림 전송 에러
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// 전송 자체가 실패함 (네트워크, 타임아웃 등)
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// 수신 측이 요청을 거부함
    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}
