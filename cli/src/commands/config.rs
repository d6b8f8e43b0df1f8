//! Config command - show and change settings.

use anyhow::{bail, Result};
use wincmd_core::{ConfigStore, PortRange};

pub async fn show(json: bool) -> Result<()> {
    let store = ConfigStore::new()?;
    let config = store.load().await?;

    if json {
        return super::print_json(&config);
    }

    println!("Config file: {}", store.config_path().display());
    println!("Command timeout: {}s", config.command_timeout_secs);
    println!("Port range: {}", config.port_range);
    Ok(())
}

pub async fn set(timeout: Option<u64>, range: Option<PortRange>) -> Result<()> {
    if timeout.is_none() && range.is_none() {
        bail!("nothing to change; pass --command-timeout or --range");
    }

    let store = ConfigStore::new()?;
    if let Some(secs) = timeout {
        store.set_command_timeout(secs).await?;
        println!("Command timeout set to {}s", secs);
    }
    if let Some(range) = range {
        store.set_port_range(range).await?;
        println!("Port range set to {}", range);
    }
    Ok(())
}

pub fn path() -> Result<()> {
    let store = ConfigStore::new()?;
    println!("{}", store.config_path().display());
    Ok(())
}
