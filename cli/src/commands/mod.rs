//! Subcommand implementations.

pub mod config;
pub mod connections;
pub mod kill;
pub mod ports;
pub mod routes;
pub mod shutdown;
pub mod stats;

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use wincmd_core::{CommandLine, Config, ConfigStore, SystemRunner};

/// Load the config file, falling back to defaults when it is unreadable.
pub async fn load_config() -> Config {
    let loaded = match ConfigStore::new() {
        Ok(store) => store.load().await,
        Err(e) => Err(e),
    };
    loaded.unwrap_or_else(|e| {
        log::warn!("Ignoring config file: {}", e);
        Config::default()
    })
}

/// A runner honouring `--timeout`, then the configured timeout.
pub async fn runner(timeout: Option<u64>) -> SystemRunner {
    let secs = match timeout {
        Some(secs) => secs,
        None => load_config().await.command_timeout_secs,
    };
    log::debug!("Command timeout: {}s", secs);
    SystemRunner::with_timeout(Duration::from_secs(secs.max(1)))
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print what would run. Secrets stay masked.
pub fn print_dry_run(line: &CommandLine) {
    println!("Would run: {}", line);
}

/// Print a command's report, skipping blank output.
pub fn print_report(report: &str) {
    let report = report.trim();
    if !report.is_empty() {
        println!("{}", report);
    }
}
