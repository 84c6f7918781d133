use anyhow::Result;
use clap::Parser;

use tkwatch_core::config::TkwatchConfig;
use tkwatch_daemon::cli::DaemonCli;
use tkwatch_daemon::logging;
use tkwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = TkwatchConfig::load(&cli.config).await.map_err(|e| {
        anyhow::anyhow!("failed to load config '{}': {}", cli.config.display(), e)
    })?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!(
            "configuration is valid: {} server(s) configured",
            config.servers.len()
        );
        return Ok(());
    }

    logging::init_tracing(&config.general)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "tkwatch-daemon starting"
    );
    for server in &config.servers {
        tracing::info!(server = %server.name, basedir = %server.basedir, "following server logs");
    }

    let mut orchestrator = Orchestrator::build_from_config(config)?;
    orchestrator.run().await?;

    tracing::info!("tkwatch-daemon shut down");
    Ok(())
}
