//! tkwatch daemon library.
//!
//! Exposes the daemon's modules for integration testing.
//! In production, `tkwatch-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod logging;
pub mod metrics_server;
pub mod notifier;
pub mod orchestrator;
pub mod server_query;
