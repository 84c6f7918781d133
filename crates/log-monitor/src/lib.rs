#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`follower`]: 공유 모드 파일 tail, truncation/rotation 감지
//! - [`classifier`]: 라인 분류 (어드민 카메라, 데미지, 팀킬)
//! - [`window`]: 최근 데미지 통지 FIFO 윈도우
//! - [`correlator`]: 로그 ID 기반 팀킬 상관 분석, 중복 제거, wraparound 처리
//! - [`admincam`]: 어드민 카메라 사용자 추적 및 감사 로그
//! - [`monitor`]: 서버 한 대의 전체 흐름 (tail -> 분류 -> 상관 분석 -> 채널)
//! - [`config`]: 모니터 설정 (core 설정에서 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! LogFollower -> EventClassifier -> DamageWindow / TeamKillCorrelator / AdminCamTracker
//!      |               |                          |                          |
//!  shared read    regex patterns          TeamKillEvent -> mpsc         audit log
//! ```

pub mod admincam;
pub mod classifier;
pub mod config;
pub mod correlator;
pub mod error;
pub mod follower;
pub mod monitor;
pub mod window;

// --- 주요 타입 re-export ---

// 모니터
pub use monitor::{MonitorStats, TeamKillMonitor, TeamKillMonitorBuilder};

// 설정
pub use config::{MonitorConfig, MonitorConfigBuilder};

// 에러
pub use error::LogMonitorError;

// 구성 요소
pub use admincam::{AdminCamTracker, AuditSink, FileAuditSink};
pub use classifier::{
    AdminCamCandidate, DamageNotification, EventClassifier, LineEvent, TeamKillNotification,
};
pub use correlator::{Correlation, TeamKillCorrelator};
pub use follower::{DECODE_ERROR_LINE, LogFollower};
pub use window::DamageWindow;
