//! Routes command - interface list and routing tables.

use anyhow::Result;
use wincmd_core::NetstatService;

pub async fn run(timeout: Option<u64>, json: bool) -> Result<()> {
    let service = NetstatService::new(super::runner(timeout).await);
    let tables = service.routing_tables().await?;

    if json {
        return super::print_json(&tables);
    }

    println!("Interfaces");
    println!("{:<6} {:<20} DESCRIPTION", "IDX", "MAC");
    println!("{}", "-".repeat(70));
    for iface in &tables.interfaces {
        println!(
            "{:<6} {:<20} {}",
            iface.index,
            iface.mac.as_deref().unwrap_or("-"),
            iface.description
        );
    }

    println!("\nIPv4 active routes");
    println!(
        "{:<18} {:<18} {:<16} {:<16} METRIC",
        "DESTINATION", "NETMASK", "GATEWAY", "INTERFACE"
    );
    println!("{}", "-".repeat(80));
    for route in &tables.ipv4_active {
        println!(
            "{:<18} {:<18} {:<16} {:<16} {}",
            route.destination, route.netmask, route.gateway, route.interface, route.metric
        );
    }

    if !tables.ipv4_persistent.is_empty() {
        println!("\nIPv4 persistent routes");
        for route in &tables.ipv4_persistent {
            let metric = route
                .metric
                .map_or_else(|| "Default".to_string(), |m| m.to_string());
            println!(
                "{:<18} {:<18} {:<16} {}",
                route.network_address, route.netmask, route.gateway_address, metric
            );
        }
    }

    println!("\nIPv6 active routes");
    println!("{:<6} {:<8} {:<40} GATEWAY", "IF", "METRIC", "DESTINATION");
    println!("{}", "-".repeat(80));
    for route in &tables.ipv6_active {
        println!(
            "{:<6} {:<8} {:<40} {}",
            route.interface_index, route.metric, route.destination, route.gateway
        );
    }

    if !tables.ipv6_persistent.is_empty() {
        println!("\nIPv6 persistent routes");
        for route in &tables.ipv6_persistent {
            println!(
                "{:<6} {:<8} {:<40} {}",
                route.interface_index, route.metric, route.destination, route.gateway
            );
        }
    }
    Ok(())
}
