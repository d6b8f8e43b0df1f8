//! Connections command - list active connections.

use anyhow::Result;
use wincmd_core::{ConnectionOptions, ConnectionTable, NetstatService, TcpState};

pub async fn run(
    options: &ConnectionOptions,
    state: Option<TcpState>,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let service = NetstatService::new(super::runner(timeout).await);
    let mut table = service.connections(options).await?;

    if let Some(state) = state {
        table = table
            .into_iter()
            .filter(|record| record.state == Some(state))
            .collect::<ConnectionTable>();
    }

    if json {
        return super::print_json(&table);
    }

    if table.is_empty() {
        println!("No connections found.");
        return Ok(());
    }

    print!("{}", table.to_netstat_text()?);
    println!("\nTotal: {} connections", table.len());
    Ok(())
}
