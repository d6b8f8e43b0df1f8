//! Free-port and busy-port commands.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use serde::Serialize;
use wincmd_core::{PortFinder, PortRange, Protocol};

#[derive(Serialize)]
struct FreePortReport {
    protocol: Protocol,
    range: String,
    port: u16,
}

#[derive(Serialize)]
struct ProcessPorts<'a> {
    pid: u32,
    ports: &'a BTreeSet<u16>,
}

pub async fn free(
    protocol: Protocol,
    range: Option<PortRange>,
    prefer: &[u16],
    all: bool,
    timeout: Option<u64>,
    json: bool,
) -> Result<()> {
    let range = match range {
        Some(range) => range,
        None => super::load_config().await.port_range,
    };
    let finder = PortFinder::new(super::runner(timeout).await);

    if all {
        let ports = finder.localhost_free_ports(range).await?;
        if json {
            return super::print_json(&ports);
        }
        println!("{} free localhost ports in {}", ports.len(), range);
        for chunk in ports.chunks(10) {
            let line: Vec<String> = chunk.iter().map(u16::to_string).collect();
            println!("  {}", line.join(" "));
        }
        return Ok(());
    }

    let port = if prefer.is_empty() {
        finder.lowest_free_port(protocol, range).await?
    } else {
        finder.preferred_free_port(prefer, range).await?
    };

    if json {
        return super::print_json(&FreePortReport {
            protocol,
            range: range.to_string(),
            port,
        });
    }
    println!("{}", port);
    Ok(())
}

pub async fn busy(by_pid: bool, timeout: Option<u64>, json: bool) -> Result<()> {
    let finder = PortFinder::new(super::runner(timeout).await);

    if by_pid {
        let by_pid: BTreeMap<u32, BTreeSet<u16>> = finder.localhost_processes_with_ports().await?;
        if json {
            let rows: Vec<ProcessPorts<'_>> = by_pid
                .iter()
                .map(|(pid, ports)| ProcessPorts { pid: *pid, ports })
                .collect();
            return super::print_json(&rows);
        }
        println!("{:<8} PORTS", "PID");
        println!("{}", "-".repeat(60));
        for (pid, ports) in &by_pid {
            let ports: Vec<String> = ports.iter().map(u16::to_string).collect();
            println!("{:<8} {}", pid, ports.join(", "));
        }
        return Ok(());
    }

    let ports = finder.localhost_busy_ports().await?;
    if json {
        return super::print_json(&ports);
    }
    if ports.is_empty() {
        println!("No ports bound on localhost.");
        return Ok(());
    }
    for port in &ports {
        println!("{}", port);
    }
    println!("\nTotal: {} ports", ports.len());
    Ok(())
}
