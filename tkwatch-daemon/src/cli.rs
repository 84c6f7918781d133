//! CLI argument definitions for tkwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Squad server teamkill watcher.
///
/// Follows the game log of every configured server, correlates teamkills
/// and posts them to the server's webhook.
#[derive(Parser, Debug)]
#[command(name = "tkwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to tkwatch.toml configuration file.
    #[arg(short, long, default_value = "tkwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Apply CLI overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut tkwatch_core::TkwatchConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = DaemonCli::parse_from(["tkwatch-daemon"]);
        assert_eq!(cli.config, PathBuf::from("tkwatch.toml"));
        assert!(cli.log_level.is_none());
        assert!(!cli.validate);
    }

    #[test]
    fn overrides_replace_general_section() {
        let cli = DaemonCli::parse_from([
            "tkwatch-daemon",
            "--config",
            "/etc/tkwatch/tkwatch.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ]);
        let mut config = tkwatch_core::TkwatchConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(cli.config, PathBuf::from("/etc/tkwatch/tkwatch.toml"));
        assert!(cli.validate);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "pretty");
    }
}
