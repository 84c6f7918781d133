//! 알림 trait — 팀킬 기록을 외부로 전달하는 확장 포인트
//!
//! 모니터 엔진은 알림 형식이나 전송 방식을 알지 못합니다.
//! 데몬이 서버별로 [`DynNotifier`] 구현을 주입하고, 전송 실패는
//! 호출 측에서 로그로 남긴 뒤 버립니다.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::NotifyError;
use crate::types::TeamKillRecord;

/// `Send` 가능한 boxed future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 알림에 함께 실리는 서버 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerContext {
    /// 서버 표시 이름
    pub name: String,
    /// 웹훅 URL (설정된 경우)
    pub webhook_url: Option<String>,
    /// 서버 정보 질의 주소 (`host:qport`)
    pub query_addr: Option<String>,
}

impl ServerContext {
    /// 새 서버 컨텍스트를 생성합니다.
    pub fn new(name: impl Into<String>, webhook_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            webhook_url,
            query_addr: None,
        }
    }

    /// 서버 정보 질의 주소를 설정합니다.
    pub fn with_query_addr(mut self, query_addr: Option<String>) -> Self {
        self.query_addr = query_addr;
        self
    }
}

/// 팀킬 알림 전송 trait
///
/// # 구현 예시
/// ```ignore
/// struct StdoutNotifier;
///
/// impl Notifier for StdoutNotifier {
///     fn name(&self) -> &str { "stdout" }
///
///     async fn notify(&self, server: &ServerContext, tk: &TeamKillRecord) -> Result<(), NotifyError> {
///         println!("[{}] {tk}", server.name);
///         Ok(())
///     }
/// }
/// ```
pub trait Notifier: Send + Sync {
    /// 알림 채널 이름
    fn name(&self) -> &str;

    /// 팀킬 기록 한 건을 전송합니다.
    fn notify(
        &self,
        server: &ServerContext,
        teamkill: &TeamKillRecord,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// dyn-compatible 알림 trait
///
/// `Notifier`는 RPITIT를 사용하므로 `dyn Notifier`가 불가합니다.
/// `DynNotifier`는 `BoxFuture`를 반환하여 `Arc<dyn DynNotifier>`로
/// 서버별 알림 채널을 동적으로 선택할 수 있게 합니다.
pub trait DynNotifier: Send + Sync {
    /// 알림 채널 이름
    fn name(&self) -> &str;

    /// 팀킬 기록 한 건을 전송합니다.
    fn notify<'a>(
        &'a self,
        server: &'a ServerContext,
        teamkill: &'a TeamKillRecord,
    ) -> BoxFuture<'a, Result<(), NotifyError>>;
}

/// Notifier를 구현한 타입은 자동으로 DynNotifier도 구현됩니다.
impl<T: Notifier> DynNotifier for T {
    fn name(&self) -> &str {
        Notifier::name(self)
    }

    fn notify<'a>(
        &'a self,
        server: &'a ServerContext,
        teamkill: &'a TeamKillRecord,
    ) -> BoxFuture<'a, Result<(), NotifyError>> {
        Box::pin(Notifier::notify(self, server, teamkill))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    struct CountingNotifier {
        calls: AtomicUsize,
        fail: bool,
    }

    impl Notifier for CountingNotifier {
        fn name(&self) -> &str {
            "counting"
        }

        async fn notify(
            &self,
            _server: &ServerContext,
            _teamkill: &TeamKillRecord,
        ) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(NotifyError::Delivery("boom".to_owned()));
            }
            Ok(())
        }
    }

    fn sample_record() -> TeamKillRecord {
        TeamKillRecord {
            time_utc: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            victim: "V".to_owned(),
            killer: "K".to_owned(),
            weapon: "AK47".to_owned(),
        }
    }

    #[tokio::test]
    async fn dyn_notifier_delegates_to_notifier() {
        let notifier = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let dyn_notifier: Arc<dyn DynNotifier> = notifier.clone();
        let server = ServerContext::new("server-1", None);

        assert_eq!(dyn_notifier.name(), "counting");
        dyn_notifier.notify(&server, &sample_record()).await.unwrap();
        assert_eq!(notifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dyn_notifier_propagates_error() {
        let notifier: Arc<dyn DynNotifier> = Arc::new(CountingNotifier {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let server = ServerContext::new("server-1", None);
        let err = notifier.notify(&server, &sample_record()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Delivery(_)));
    }
}
