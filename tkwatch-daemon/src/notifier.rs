//! Notifier implementations.
//!
//! The monitors hand each correlated [`TeamKillRecord`] to a per-server
//! dispatcher, which forwards it through one of these [`Notifier`]s:
//!
//! * [`WebhookNotifier`] posts a Discord-style embed to the server's webhook.
//! * [`LogNotifier`] writes a structured log record. Used for servers
//!   without a webhook.

use std::time::Duration;

use chrono::FixedOffset;
use serde_json::{Value, json};

use tkwatch_core::config::NotifyConfig;
use tkwatch_core::error::NotifyError;
use tkwatch_core::notify::{Notifier, ServerContext};
use tkwatch_core::types::TeamKillRecord;

use crate::server_query::{ServerInfo, query_server_info};

/// Maximum number of response body bytes kept in a rejection error.
const MAX_ERROR_BODY_LEN: usize = 512;

/// Notifier that only logs the teamkill.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(
        &self,
        server: &ServerContext,
        teamkill: &TeamKillRecord,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            server = %server.name,
            time_utc = %teamkill.time_utc,
            killer = %teamkill.killer,
            victim = %teamkill.victim,
            weapon = %teamkill.weapon,
            "teamkill"
        );
        Ok(())
    }
}

/// Notifier that posts an embed to the server's webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    timezone_name: String,
    offset: FixedOffset,
    query_timeout: Duration,
}

impl WebhookNotifier {
    /// Build a webhook notifier from the `[notify]` section.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Delivery` if the UTC offset is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let offset = config
            .utc_offset_secs()
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                NotifyError::Delivery(format!("invalid utc offset '{}'", config.utc_offset))
            })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(format!("tkwatch/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            timezone_name: config.timezone_name.clone(),
            offset,
            query_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    /// Display time zone offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(
        &self,
        server: &ServerContext,
        teamkill: &TeamKillRecord,
    ) -> Result<(), NotifyError> {
        let Some(url) = server.webhook_url.as_deref() else {
            return Err(NotifyError::Delivery(format!(
                "no webhook url configured for server '{}'",
                server.name
            )));
        };

        let live = match server.query_addr.as_deref() {
            Some(addr) => match query_server_info(addr, self.query_timeout).await {
                Ok(info) => Some(info),
                Err(e) => {
                    tracing::warn!(server = %server.name, error = %e, "server info query failed, using configured name");
                    None
                }
            },
            None => None,
        };

        let payload = webhook_payload(
            &server.name,
            live.as_ref(),
            teamkill,
            &self.timezone_name,
            self.offset,
        );

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY_LEN {
                let mut end = MAX_ERROR_BODY_LEN;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(server = %server.name, status = status.as_u16(), "webhook delivered");
        Ok(())
    }
}

/// Build the webhook JSON body for one teamkill.
///
/// The embed shows the local date/time in the configured zone, the UTC time
/// (suffixed with `(+1 day)` when the UTC date is past the local date), then
/// killer, victim and weapon. With `live` server info the title uses the
/// advertised name and a `Map` field follows the UTC time.
pub fn webhook_payload(
    server_name: &str,
    live: Option<&ServerInfo>,
    teamkill: &TeamKillRecord,
    timezone_name: &str,
    offset: FixedOffset,
) -> Value {
    let local = teamkill.time_utc.with_timezone(&offset);

    let mut utc_time = teamkill.time_utc.format("%H:%M:%S").to_string();
    if teamkill.time_utc.date_naive() > local.date_naive() {
        utc_time.push_str(" (+1 day)");
    }

    let mut fields = vec![
        field(
            &format!("Date / Time ({timezone_name})"),
            &local.format("%m/%d/%Y %H:%M:%S").to_string(),
        ),
        field("Time (UTC)", &utc_time),
    ];
    if let Some(info) = live {
        fields.push(field("Map", &info.map));
    }
    fields.push(field("Killer", &teamkill.killer));
    fields.push(field("Victim", &teamkill.victim));
    fields.push(field("Weapon", &teamkill.weapon));

    let title_name = live.map_or(server_name, |info| info.name.as_str());

    json!({
        "embeds": [{
            "title": format!("TK on {title_name}"),
            "fields": fields,
        }],
    })
}

fn field(name: &str, value: &str) -> Value {
    json!({ "name": name, "value": value, "inline": true })
}
