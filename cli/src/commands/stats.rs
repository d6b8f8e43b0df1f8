//! Stats and ethernet commands - protocol counters.

use anyhow::Result;
use wincmd_core::domain::{DirectionalStatistic, StatisticsTable};
use wincmd_core::{NetstatService, StatisticsProtocol};

pub async fn run(protocol: Option<StatisticsProtocol>, timeout: Option<u64>, json: bool) -> Result<()> {
    let service = NetstatService::new(super::runner(timeout).await);

    match protocol {
        Some(protocol) => {
            let table = service.statistics_for(protocol).await?;
            if json {
                return super::print_json(&table);
            }
            println!("{}", protocol.section());
            print_table(&table);
        }
        None => {
            let sections = service.statistics().await?;
            if json {
                return super::print_json(&sections);
            }
            for (section, table) in &sections {
                println!("{}", section);
                print_table(table);
                println!();
            }
        }
    }
    Ok(())
}

pub async fn ethernet(timeout: Option<u64>, json: bool) -> Result<()> {
    let service = NetstatService::new(super::runner(timeout).await);
    let rows = service.ethernet_statistics().await?;

    if json {
        return super::print_json(&rows);
    }
    print_directional(&rows);
    Ok(())
}

fn print_table(table: &StatisticsTable) {
    match table {
        StatisticsTable::Counters(rows) => {
            for row in rows {
                println!("  {:<40} {:>14}", row.name, row.value);
            }
        }
        StatisticsTable::Directional(rows) => print_directional(rows),
    }
}

fn print_directional(rows: &[DirectionalStatistic]) {
    println!("  {:<32} {:>14} {:>14}", "", "RECEIVED", "SENT");
    for row in rows {
        let sent = row.sent.map_or_else(String::new, |s| s.to_string());
        println!("  {:<32} {:>14} {:>14}", row.name, row.received, sent);
    }
}
