//! Netstat application service.

use std::collections::BTreeMap;

use tracing::debug;

use super::invoke;
use crate::domain::{
    parse_connections, parse_ethernet_statistics, parse_routing_tables, parse_statistics,
    parse_statistics_section, ConnectionOptions, ConnectionTable, DirectionalStatistic,
    NetstatCommand, RoutingTables, StatisticsProtocol, StatisticsSection, StatisticsTable,
};
use crate::error::Result;
use crate::ports::CommandRunner;

/// Runs `netstat` and parses what it prints.
pub struct NetstatService<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> NetstatService<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Raw stdout of one netstat invocation.
    pub async fn capture(&self, command: &NetstatCommand) -> Result<String> {
        invoke(&self.runner, command).await
    }

    /// Active connections, restricted to `options.protocol` when set.
    pub async fn connections(&self, options: &ConnectionOptions) -> Result<ConnectionTable> {
        let text = self
            .capture(&NetstatCommand::Connections(options.clone()))
            .await?;
        let table = parse_connections(&text, options.protocol.map(|p| p.protocol()))?;
        debug!(records = table.len(), "Parsed connections");
        Ok(table)
    }

    /// `netstat -r`
    pub async fn routing_tables(&self) -> Result<RoutingTables> {
        let text = self.capture(&NetstatCommand::Routing).await?;
        parse_routing_tables(&text)
    }

    /// `netstat -s`, every section.
    pub async fn statistics(&self) -> Result<BTreeMap<StatisticsSection, StatisticsTable>> {
        let text = self
            .capture(&NetstatCommand::Statistics { protocol: None })
            .await?;
        parse_statistics(&text)
    }

    /// `netstat -s -p <protocol>`, the one section it prints.
    pub async fn statistics_for(&self, protocol: StatisticsProtocol) -> Result<StatisticsTable> {
        let text = self
            .capture(&NetstatCommand::Statistics {
                protocol: Some(protocol),
            })
            .await?;
        parse_statistics_section(&text, protocol.section())
    }

    /// `netstat -e`
    pub async fn ethernet_statistics(&self) -> Result<Vec<DirectionalStatistic>> {
        let text = self.capture(&NetstatCommand::Ethernet).await?;
        parse_ethernet_statistics(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{MockRunner, LISTENING};
    use crate::domain::{ConnectionProtocol, Protocol};
    use crate::error::Error;
    use crate::ports::CommandOutput;

    #[tokio::test]
    async fn test_connections_runs_requested_flags() {
        let service = NetstatService::new(MockRunner::new().respond_stdout(LISTENING));
        let options = ConnectionOptions::new()
            .with_all(true)
            .with_numeric(true)
            .with_pids(true);

        let table = service.connections(&options).await.unwrap();

        assert_eq!(table.len(), 7);
        assert_eq!(service.runner().calls(), vec!["netstat -a -n -o"]);
    }

    #[tokio::test]
    async fn test_connections_protocol_filter() {
        let service = NetstatService::new(MockRunner::new().respond_stdout(LISTENING));
        let options = ConnectionOptions::new()
            .with_all(true)
            .with_protocol(Some(ConnectionProtocol::Udp));

        let table = service.connections(&options).await.unwrap();

        assert_eq!(table.len(), 2);
        assert!(table.iter().all(|r| r.protocol == Protocol::Udp));
        assert_eq!(service.runner().calls(), vec!["netstat -a -p UDP"]);
    }

    #[tokio::test]
    async fn test_invalid_options_never_run() {
        let service = NetstatService::new(MockRunner::new());
        let options = ConnectionOptions::new().with_all(true).with_all_bound(true);

        let err = service.connections(&options).await.unwrap_err();

        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(service.runner().calls().is_empty());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_invocation_error() {
        let service = NetstatService::new(MockRunner::new().respond(CommandOutput {
            status: Some(1),
            stdout: "The requested operation requires elevation.".into(),
            stderr: String::new(),
        }));
        let options = ConnectionOptions::new().with_executables(true);

        match service.connections(&options).await {
            Err(Error::Invocation { command, reason }) => {
                assert_eq!(command, "netstat -b");
                assert!(reason.contains("requires elevation"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_statistics_for_protocol() {
        let capture = "
TCP Statistics for IPv4

  Active Opens                        = 12345
  Passive Opens                       = 678
";
        let service = NetstatService::new(MockRunner::new().respond_stdout(capture));

        let table = service.statistics_for(StatisticsProtocol::Tcp).await.unwrap();

        assert_eq!(table.get("Passive Opens"), Some(678));
        assert_eq!(service.runner().calls(), vec!["netstat -s -p TCP"]);
    }

    #[tokio::test]
    async fn test_ethernet_statistics() {
        let capture = "
Interface Statistics

                           Received            Sent

Bytes                    3283745216       515366145
Unicast packets             4148453         2426387
";
        let service = NetstatService::new(MockRunner::new().respond_stdout(capture));

        let rows = service.ethernet_statistics().await.unwrap();

        assert_eq!(rows[0].name, "Bytes");
        assert_eq!(rows[0].received, 3283745216);
        assert_eq!(rows[0].sent, Some(515366145));
        assert_eq!(service.runner().calls(), vec!["netstat -e"]);
    }
}
