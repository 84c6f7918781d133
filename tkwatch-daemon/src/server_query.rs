//! Live server info lookup over the Source A2S query protocol.
//!
//! The webhook title uses the name the game server currently advertises and
//! adds the running map. Any failure here is reported to the caller, which
//! falls back to the configured server name.

use std::time::Duration;

use a2s::A2SClient;

/// Name and map reported by a running server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub map: String,
}

/// Errors from a server info query.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("a2s query to {addr} failed: {reason}")]
    Failed { addr: String, reason: String },

    #[error("a2s query to {addr} timed out after {timeout:?}")]
    TimedOut { addr: String, timeout: Duration },
}

/// Query `addr` (`host:qport`) for its advertised name and current map.
///
/// The A2S client is blocking, so the request runs on the blocking pool and
/// is bounded by `timeout`.
pub async fn query_server_info(addr: &str, timeout: Duration) -> Result<ServerInfo, QueryError> {
    let target = addr.to_owned();
    let request = tokio::task::spawn_blocking(move || {
        let client = A2SClient::new().map_err(|e| e.to_string())?;
        client
            .info(target.as_str())
            .map(|info| ServerInfo {
                name: info.name,
                map: info.map,
            })
            .map_err(|e| e.to_string())
    });

    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(Ok(info))) => Ok(info),
        Ok(Ok(Err(reason))) => Err(QueryError::Failed {
            addr: addr.to_owned(),
            reason,
        }),
        Ok(Err(join)) => Err(QueryError::Failed {
            addr: addr.to_owned(),
            reason: join.to_string(),
        }),
        Err(_) => Err(QueryError::TimedOut {
            addr: addr.to_owned(),
            timeout,
        }),
    }
}
