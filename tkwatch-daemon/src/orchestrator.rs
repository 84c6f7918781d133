//! Server fan-out -- monitor assembly, notification dispatch, and lifecycle.
//!
//! The [`Orchestrator`] builds one [`TeamKillMonitor`] per configured server,
//! wires it to a dispatcher task through a bounded channel, and runs every
//! server under its own child [`CancellationToken`].
//!
//! # Lifecycle
//!
//! 1. Each dispatcher starts before its monitor so no event is queued without a consumer.
//! 2. Monitors tail until cancelled or until their log file cannot be (re)opened.
//!    A failing server is logged; the others keep running.
//! 3. `run()` returns on SIGTERM/SIGINT, on [`Orchestrator::shutdown_token`]
//!    cancellation, or when every monitor has ended.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use tkwatch_core::config::TkwatchConfig;
use tkwatch_core::event::TeamKillEvent;
use tkwatch_core::metrics as m;
use tkwatch_core::notify::{DynNotifier, ServerContext};
use tkwatch_log_monitor::{MonitorConfig, MonitorStats, TeamKillMonitor, TeamKillMonitorBuilder};

use crate::metrics_server;
use crate::notifier::{LogNotifier, WebhookNotifier};

/// One monitored server, ready to run.
struct ServerUnit {
    context: ServerContext,
    monitor: TeamKillMonitor,
    notifier: Arc<dyn DynNotifier>,
}

/// Delivery counts of one dispatcher.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Notifications accepted by the notifier
    pub delivered: u64,
    /// Notifications the notifier failed to deliver
    pub failed: u64,
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: TkwatchConfig,
    servers: Vec<ServerUnit>,
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or validated,
    /// or if a monitor or notifier fails to initialize.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = TkwatchConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: TkwatchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let log_notifier: Arc<dyn DynNotifier> = Arc::new(LogNotifier);
        let mut webhook_notifier: Option<Arc<dyn DynNotifier>> = None;

        let mut servers = Vec::with_capacity(config.servers.len());
        for server in &config.servers {
            let monitor = TeamKillMonitorBuilder::new()
                .config(MonitorConfig::from_core(&config.monitor, server))
                .build()
                .map_err(|e| {
                    anyhow::anyhow!("failed to build monitor for server '{}': {}", server.name, e)
                })?;

            let notifier = match &server.webhook_url {
                Some(_) => match &webhook_notifier {
                    Some(notifier) => Arc::clone(notifier),
                    None => {
                        let notifier: Arc<dyn DynNotifier> = Arc::new(
                            WebhookNotifier::new(&config.notify).map_err(|e| {
                                anyhow::anyhow!("failed to build webhook notifier: {}", e)
                            })?,
                        );
                        webhook_notifier = Some(Arc::clone(&notifier));
                        notifier
                    }
                },
                None => Arc::clone(&log_notifier),
            };

            tracing::info!(
                server = %server.name,
                log_path = %server.log_path().display(),
                notifier = notifier.name(),
                "server configured"
            );

            servers.push(ServerUnit {
                context: ServerContext::new(server.name.clone(), server.webhook_url.clone())
                    .with_query_addr(server.query_addr.clone()),
                monitor,
                notifier,
            });
        }

        tracing::info!(servers = servers.len(), "orchestrator initialized");

        if config.metrics.enabled {
            record_daemon_metrics(servers.len());
        }

        Ok(Self {
            config,
            servers,
            shutdown: CancellationToken::new(),
        })
    }

    /// Replace the notifier of every server.
    pub fn with_notifier(mut self, notifier: Arc<dyn DynNotifier>) -> Self {
        for unit in &mut self.servers {
            unit.notifier = Arc::clone(&notifier);
        }
        self
    }

    /// Token that stops `run()` when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of servers that will be monitored.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Names of the servers that will be monitored, in configuration order.
    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.context.name.as_str()).collect()
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &TkwatchConfig {
        &self.config
    }

    /// Start every server and run until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed or if every
    /// server's monitor failed.
    pub async fn run(&mut self) -> Result<()> {
        let units = std::mem::take(&mut self.servers);
        let total = units.len();

        let mut monitors = JoinSet::new();
        let mut dispatchers = JoinSet::new();

        for unit in units {
            let token = self.shutdown.child_token();
            let (tx, rx) = mpsc::channel(self.config.monitor.notify_channel_capacity);

            dispatchers.spawn(dispatch_events(
                rx,
                unit.notifier,
                unit.context.clone(),
                token.clone(),
            ));

            let name = unit.context.name;
            let monitor = unit.monitor;
            monitors.spawn(async move { (name, monitor.run(tx, token).await) });
        }

        tracing::info!(servers = total, "monitors started");

        let shutdown = wait_for_shutdown_signal();
        tokio::pin!(shutdown);

        let mut failed = 0usize;
        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    let signal = signal?;
                    tracing::info!(signal, "shutdown signal received");
                    break;
                }
                _ = self.shutdown.cancelled() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                joined = monitors.join_next() => match joined {
                    Some(result) => {
                        if !log_monitor_exit(result) {
                            failed += 1;
                        }
                    }
                    None => {
                        tracing::info!("all monitors ended");
                        break;
                    }
                },
            }
        }

        self.shutdown.cancel();
        while let Some(result) = monitors.join_next().await {
            if !log_monitor_exit(result) {
                failed += 1;
            }
        }
        while let Some(result) = dispatchers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "dispatcher task panicked");
            }
        }

        tracing::info!(servers = total, failed, "tkwatch stopped");

        if total > 0 && failed == total {
            return Err(anyhow::anyhow!("all {} monitored servers failed", total));
        }
        Ok(())
    }
}

/// Forward teamkill events to a notifier until the channel closes or the
/// token is cancelled.
///
/// Notifier failures are logged and counted; they never stop the loop.
pub async fn dispatch_events(
    mut rx: mpsc::Receiver<TeamKillEvent>,
    notifier: Arc<dyn DynNotifier>,
    server: ServerContext,
    cancel: CancellationToken,
) -> DispatchSummary {
    let mut summary = DispatchSummary::default();

    loop {
        let event = tokio::select! {
            event = rx.recv() => match event {
                Some(event) => event,
                None => {
                    tracing::debug!(server = %server.name, "teamkill channel closed");
                    break;
                }
            },
            _ = cancel.cancelled() => {
                tracing::debug!(server = %server.name, "dispatcher cancelled");
                break;
            }
        };

        match notifier.notify(&server, &event.teamkill).await {
            Ok(()) => {
                summary.delivered += 1;
                metrics::counter!(
                    m::NOTIFY_DELIVERIES_TOTAL,
                    m::LABEL_SERVER => server.name.clone(),
                    m::LABEL_RESULT => "success"
                )
                .increment(1);
                tracing::debug!(
                    server = %server.name,
                    trace_id = %event.metadata.trace_id,
                    notifier = notifier.name(),
                    "teamkill notification delivered"
                );
            }
            Err(e) => {
                summary.failed += 1;
                metrics::counter!(
                    m::NOTIFY_DELIVERIES_TOTAL,
                    m::LABEL_SERVER => server.name.clone(),
                    m::LABEL_RESULT => "failure"
                )
                .increment(1);
                tracing::error!(
                    server = %server.name,
                    trace_id = %event.metadata.trace_id,
                    notifier = notifier.name(),
                    killer = %event.teamkill.killer,
                    victim = %event.teamkill.victim,
                    weapon = %event.teamkill.weapon,
                    error = %e,
                    "teamkill notification failed"
                );
            }
        }
    }

    summary
}

/// Log how a monitor task ended. Returns `false` if it failed.
fn log_monitor_exit(
    result: std::result::Result<
        (String, std::result::Result<MonitorStats, tkwatch_log_monitor::LogMonitorError>),
        tokio::task::JoinError,
    >,
) -> bool {
    match result {
        Ok((name, Ok(stats))) => {
            tracing::info!(
                server = %name,
                lines = stats.lines_read,
                teamkills = stats.teamkills,
                rotations = stats.rotations,
                "monitor stopped"
            );
            true
        }
        Ok((name, Err(e))) => {
            tracing::error!(server = %name, error = %e, "monitor failed");
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "monitor task panicked");
            false
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("failed to listen for ctrl-c: {}", e))?;
    Ok("ctrl-c")
}

fn record_daemon_metrics(servers: usize) {
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_SERVERS_MONITORED).set(servers as f64);
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}
