#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod notify;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, MonitorError, NotifyError, TkwatchError};

// 설정
pub use config::{GeneralConfig, MetricsConfig, MonitorSection, NotifyConfig, ServerConfig, TkwatchConfig};

// 이벤트
pub use event::{Event, EventMetadata, TeamKillEvent};

// 알림 trait
pub use notify::{BoxFuture, DynNotifier, Notifier, ServerContext};

// 도메인 타입
pub use types::{AdminCamEvent, LogId, TeamKillRecord, Transition};
