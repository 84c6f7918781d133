//! 설정 관리 — tkwatch.toml 파싱 및 런타임 설정
//!
//! [`TkwatchConfig`]는 데몬과 모든 서버 모니터의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`TKWATCH_MONITOR_POLL_INTERVAL_MS=500` 형식)
//! 3. 설정 파일 (`tkwatch.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tkwatch_core::error::TkwatchError> {
//! use tkwatch_core::config::TkwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TkwatchConfig::load("tkwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TkwatchConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TkwatchError};

/// 서버 기본 디렉토리 기준 게임 로그 상대 경로
pub const SERVER_LOG_RELATIVE_PATH: &str = "SquadGame/Saved/Logs/SquadGame.log";

/// 서버 기본 디렉토리 기준 어드민 카메라 감사 로그 상대 경로
pub const ADMINCAM_LOG_RELATIVE_PATH: &str = "SquadGame/Saved/Logs/admincam.log";

/// tkwatch 통합 설정
///
/// `tkwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TkwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 로그 모니터 공통 설정
    #[serde(default)]
    pub monitor: MonitorSection,
    /// 알림 설정
    #[serde(default)]
    pub notify: NotifyConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// 감시 대상 서버 목록
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl TkwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TkwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TkwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TkwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TkwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TkwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            TkwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TKWATCH_{SECTION}_{FIELD}`
    /// 서버 목록은 파일에서만 설정합니다.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TKWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TKWATCH_GENERAL_LOG_FORMAT");

        // Monitor
        override_u64(
            &mut self.monitor.poll_interval_ms,
            "TKWATCH_MONITOR_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.monitor.damage_window_size,
            "TKWATCH_MONITOR_DAMAGE_WINDOW_SIZE",
        );
        override_u64(
            &mut self.monitor.wraparound_slack,
            "TKWATCH_MONITOR_WRAPAROUND_SLACK",
        );
        override_usize(
            &mut self.monitor.size_refresh_lines,
            "TKWATCH_MONITOR_SIZE_REFRESH_LINES",
        );
        override_usize(
            &mut self.monitor.max_line_length,
            "TKWATCH_MONITOR_MAX_LINE_LENGTH",
        );
        override_usize(
            &mut self.monitor.notify_channel_capacity,
            "TKWATCH_MONITOR_NOTIFY_CHANNEL_CAPACITY",
        );

        // Notify
        override_string(&mut self.notify.timezone_name, "TKWATCH_NOTIFY_TIMEZONE_NAME");
        override_string(&mut self.notify.utc_offset, "TKWATCH_NOTIFY_UTC_OFFSET");
        override_u64(
            &mut self.notify.request_timeout_secs,
            "TKWATCH_NOTIFY_REQUEST_TIMEOUT_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "TKWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "TKWATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "TKWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TkwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // monitor 수치 검증
        if self.monitor.poll_interval_ms == 0 {
            return Err(invalid("monitor.poll_interval_ms", "must be greater than 0"));
        }
        if self.monitor.damage_window_size == 0 {
            return Err(invalid("monitor.damage_window_size", "must be greater than 0"));
        }
        if self.monitor.size_refresh_lines == 0 {
            return Err(invalid("monitor.size_refresh_lines", "must be greater than 0"));
        }
        if self.monitor.max_line_length == 0 {
            return Err(invalid("monitor.max_line_length", "must be greater than 0"));
        }
        if self.monitor.notify_channel_capacity == 0 {
            return Err(invalid(
                "monitor.notify_channel_capacity",
                "must be greater than 0",
            ));
        }

        // utc_offset 검증
        if parse_utc_offset(&self.notify.utc_offset).is_none() {
            return Err(invalid(
                "notify.utc_offset",
                format!("'{}' is not in +HH:MM or -HH:MM form", self.notify.utc_offset),
            ));
        }

        // 서버 목록 검증
        if self.servers.is_empty() {
            return Err(invalid("servers", "at least one server must be configured"));
        }

        let mut names = HashSet::new();
        for (idx, server) in self.servers.iter().enumerate() {
            if server.name.trim().is_empty() {
                return Err(invalid(
                    &format!("servers[{idx}].name"),
                    "server name must not be empty",
                ));
            }
            if !names.insert(server.name.as_str()) {
                return Err(invalid(
                    &format!("servers[{idx}].name"),
                    format!("duplicate server name '{}'", server.name),
                ));
            }
            if server.basedir.trim().is_empty() {
                return Err(invalid(
                    &format!("servers[{idx}].basedir"),
                    "basedir must not be empty",
                ));
            }
            if let Some(url) = &server.webhook_url {
                if !(url.starts_with("https://") || url.starts_with("http://")) {
                    return Err(invalid(
                        &format!("servers[{idx}].webhook_url"),
                        "webhook url must start with http:// or https://",
                    ));
                }
            }
            if let Some(addr) = &server.query_addr {
                if !is_host_port(addr) {
                    return Err(invalid(
                        &format!("servers[{idx}].query_addr"),
                        "query address must be host:port",
                    ));
                }
            }
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 로그 모니터 공통 설정
///
/// 모든 서버 모니터에 동일하게 적용됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// 파일 끝에 도달한 뒤 다시 폴링하기까지의 대기 시간 (밀리초)
    pub poll_interval_ms: u64,
    /// 상관 분석용 데미지 윈도우 크기
    pub damage_window_size: usize,
    /// 로그 ID wraparound 판정 여유값
    pub wraparound_slack: u64,
    /// 파일 크기를 다시 기록하는 라인 주기
    pub size_refresh_lines: usize,
    /// 최대 라인 길이 (바이트). 넘으면 디코딩 실패로 처리하고 버립니다.
    pub max_line_length: usize,
    /// 팀킬 이벤트 디스패치 채널 용량
    pub notify_channel_capacity: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            damage_window_size: 20,
            wraparound_slack: 500,
            size_refresh_lines: 1000,
            max_line_length: 64 * 1024, // 64KB
            notify_channel_capacity: 64,
        }
    }
}

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 알림에 표시할 시간대 이름
    pub timezone_name: String,
    /// 표시 시간대의 UTC 오프셋 (`+HH:MM` / `-HH:MM`)
    pub utc_offset: String,
    /// 웹훅 요청 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            timezone_name: "UTC".to_owned(),
            utc_offset: "+00:00".to_owned(),
            request_timeout_secs: 10,
        }
    }
}

impl NotifyConfig {
    /// UTC 오프셋을 초 단위로 반환합니다. 형식이 잘못되면 `None`입니다.
    pub fn utc_offset_secs(&self) -> Option<i32> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 수신 주소
    pub listen_addr: String,
    /// 수신 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9108,
        }
    }
}

/// 감시 대상 서버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 서버 표시 이름 (로그 span, 알림 제목에 사용)
    pub name: String,
    /// 서버 설치 기본 디렉토리
    pub basedir: String,
    /// 팀킬 알림 웹훅 URL
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// 게임 로그 경로 (지정하지 않으면 basedir에서 파생)
    #[serde(default)]
    pub log_path: Option<String>,
    /// 어드민 카메라 감사 로그 경로 (지정하지 않으면 basedir에서 파생)
    #[serde(default)]
    pub admincam_log_path: Option<String>,
    /// 서버 정보 질의 주소 (`host:qport`). 설정하면 알림 제목에 실시간 서버 이름과 맵을 사용합니다.
    #[serde(default)]
    pub query_addr: Option<String>,
}

impl ServerConfig {
    /// 감시할 게임 로그 경로를 반환합니다.
    pub fn log_path(&self) -> PathBuf {
        match &self.log_path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.basedir).join(SERVER_LOG_RELATIVE_PATH),
        }
    }

    /// 어드민 카메라 감사 로그 경로를 반환합니다.
    pub fn admincam_log_path(&self) -> PathBuf {
        match &self.admincam_log_path {
            Some(path) => PathBuf::from(path),
            None => Path::new(&self.basedir).join(ADMINCAM_LOG_RELATIVE_PATH),
        }
    }
}

/// `host:port` 형식인지 확인합니다. 포트는 1-65535 범위여야 합니다.
fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => {
            !host.trim().is_empty() && port.parse::<u16>().map(|p| p != 0).unwrap_or(false)
        }
        None => false,
    }
}

/// `+HH:MM` / `-HH:MM` 형식의 오프셋을 초 단위로 파싱합니다.
fn parse_utc_offset(value: &str) -> Option<i32> {
    let (sign, rest) = match value.as_bytes().first()? {
        b'+' => (1, &value[1..]),
        b'-' => (-1, &value[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(sign * (hours * 3600 + minutes * 60))
}

fn invalid(field: &str, reason: impl Into<String>) -> TkwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
