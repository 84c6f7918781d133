//! 로그 모니터 설정
//!
//! [`MonitorConfig`]는 core의 [`MonitorSection`]과 [`ServerConfig`]를 합쳐
//! 서버 한 대의 모니터 엔진이 사용하는 평범한 값들로 펼친 설정입니다.
//!
//! # 사용 예시
//! ```ignore
//! use tkwatch_core::config::TkwatchConfig;
//! use tkwatch_log_monitor::config::MonitorConfig;
//!
//! let core_config = TkwatchConfig::load("tkwatch.toml").await?;
//! let config = MonitorConfig::from_core(&core_config.monitor, &core_config.servers[0]);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use tkwatch_core::config::{MonitorSection, ServerConfig};

use crate::error::LogMonitorError;

/// 기본 데미지 윈도우 크기
pub const DEFAULT_DAMAGE_WINDOW_SIZE: usize = 20;

/// 기본 로그 ID wraparound 여유값
pub const DEFAULT_WRAPAROUND_SLACK: u64 = 500;

/// 기본 최대 라인 길이 (바이트)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// 서버 한 대의 모니터 설정
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// 서버 이름 (tracing span, 이벤트 봉투에 사용)
    pub server_name: String,
    /// 감시할 게임 로그 경로
    pub log_path: PathBuf,
    /// 어드민 카메라 감사 로그 경로
    pub admincam_log_path: PathBuf,
    /// 파일 끝 도달 후 재폴링 간격
    pub poll_interval: Duration,
    /// 데미지 윈도우 크기
    pub damage_window_size: usize,
    /// wraparound 판정 여유값
    pub wraparound_slack: u64,
    /// 파일 크기 재기록 라인 주기
    pub size_refresh_lines: usize,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            server_name: "default".to_owned(),
            log_path: PathBuf::from("SquadGame.log"),
            admincam_log_path: PathBuf::from("admincam.log"),
            poll_interval: Duration::from_secs(1),
            damage_window_size: DEFAULT_DAMAGE_WINDOW_SIZE,
            wraparound_slack: DEFAULT_WRAPAROUND_SLACK,
            size_refresh_lines: 1000,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl MonitorConfig {
    /// core 설정의 공통 모니터 섹션과 서버 항목에서 모니터 설정을 생성합니다.
    pub fn from_core(section: &MonitorSection, server: &ServerConfig) -> Self {
        Self {
            server_name: server.name.clone(),
            log_path: server.log_path(),
            admincam_log_path: server.admincam_log_path(),
            poll_interval: Duration::from_millis(section.poll_interval_ms),
            damage_window_size: section.damage_window_size,
            wraparound_slack: section.wraparound_slack,
            size_refresh_lines: section.size_refresh_lines,
            max_line_length: section.max_line_length,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogMonitorError> {
        if self.server_name.is_empty() {
            return Err(LogMonitorError::Config {
                field: "server_name".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.log_path.as_os_str().is_empty() {
            return Err(LogMonitorError::Config {
                field: "log_path".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.poll_interval.is_zero() {
            return Err(LogMonitorError::Config {
                field: "poll_interval".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.damage_window_size == 0 {
            return Err(LogMonitorError::Config {
                field: "damage_window_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.size_refresh_lines == 0 {
            return Err(LogMonitorError::Config {
                field: "size_refresh_lines".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.max_line_length == 0 {
            return Err(LogMonitorError::Config {
                field: "max_line_length".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 모니터 설정 빌더
#[derive(Default)]
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 서버 이름을 설정합니다.
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.config.server_name = name.into();
        self
    }

    /// 게임 로그 경로를 설정합니다.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// 감사 로그 경로를 설정합니다.
    pub fn admincam_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.admincam_log_path = path.into();
        self
    }

    /// 폴링 간격을 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// 데미지 윈도우 크기를 설정합니다.
    pub fn damage_window_size(mut self, size: usize) -> Self {
        self.config.damage_window_size = size;
        self
    }

    /// wraparound 여유값을 설정합니다.
    pub fn wraparound_slack(mut self, slack: u64) -> Self {
        self.config.wraparound_slack = slack;
        self
    }

    /// 파일 크기 재기록 주기를 설정합니다.
    pub fn size_refresh_lines(mut self, lines: usize) -> Self {
        self.config.size_refresh_lines = lines;
        self
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.config.max_line_length = bytes;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    pub fn build(self) -> Result<MonitorConfig, LogMonitorError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
