//! Typed options for the `netstat` utility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::command::CommandSpec;
use super::connection::Protocol;
use super::statistics::StatisticsSection;
use crate::error::{Error, Result};

/// Protocol accepted by `netstat -p` when listing connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionProtocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "TCPv6")]
    TcpV6,
    #[serde(rename = "UDPv6")]
    UdpV6,
}

impl ConnectionProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionProtocol::Tcp => "TCP",
            ConnectionProtocol::Udp => "UDP",
            ConnectionProtocol::TcpV6 => "TCPv6",
            ConnectionProtocol::UdpV6 => "UDPv6",
        }
    }

    /// The row protocol netstat prints for this filter.
    pub fn protocol(&self) -> Protocol {
        match self {
            ConnectionProtocol::Tcp | ConnectionProtocol::TcpV6 => Protocol::Tcp,
            ConnectionProtocol::Udp | ConnectionProtocol::UdpV6 => Protocol::Udp,
        }
    }
}

impl FromStr for ConnectionProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(ConnectionProtocol::Tcp),
            "udp" => Ok(ConnectionProtocol::Udp),
            "tcpv6" => Ok(ConnectionProtocol::TcpV6),
            "udpv6" => Ok(ConnectionProtocol::UdpV6),
            _ => Err(Error::invalid(format!(
                "unknown protocol {:?} (expected TCP, UDP, TCPv6 or UDPv6)",
                s
            ))),
        }
    }
}

impl fmt::Display for ConnectionProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol accepted by `netstat -s -p`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticsProtocol {
    Ip,
    Ipv6,
    Icmp,
    Icmpv6,
    Tcp,
    Tcpv6,
    Udp,
    Udpv6,
}

impl StatisticsProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticsProtocol::Ip => "IP",
            StatisticsProtocol::Ipv6 => "IPv6",
            StatisticsProtocol::Icmp => "ICMP",
            StatisticsProtocol::Icmpv6 => "ICMPv6",
            StatisticsProtocol::Tcp => "TCP",
            StatisticsProtocol::Tcpv6 => "TCPv6",
            StatisticsProtocol::Udp => "UDP",
            StatisticsProtocol::Udpv6 => "UDPv6",
        }
    }

    /// The `netstat -s` block this filter prints.
    pub fn section(&self) -> StatisticsSection {
        match self {
            StatisticsProtocol::Ip => StatisticsSection::Ipv4,
            StatisticsProtocol::Ipv6 => StatisticsSection::Ipv6,
            StatisticsProtocol::Icmp => StatisticsSection::Icmpv4,
            StatisticsProtocol::Icmpv6 => StatisticsSection::Icmpv6,
            StatisticsProtocol::Tcp => StatisticsSection::TcpV4,
            StatisticsProtocol::Tcpv6 => StatisticsSection::TcpV6,
            StatisticsProtocol::Udp => StatisticsSection::UdpV4,
            StatisticsProtocol::Udpv6 => StatisticsSection::UdpV6,
        }
    }
}

impl FromStr for StatisticsProtocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let protocol = match s.to_ascii_lowercase().as_str() {
            "ip" => StatisticsProtocol::Ip,
            "ipv6" => StatisticsProtocol::Ipv6,
            "icmp" => StatisticsProtocol::Icmp,
            "icmpv6" => StatisticsProtocol::Icmpv6,
            "tcp" => StatisticsProtocol::Tcp,
            "tcpv6" => StatisticsProtocol::Tcpv6,
            "udp" => StatisticsProtocol::Udp,
            "udpv6" => StatisticsProtocol::Udpv6,
            _ => {
                return Err(Error::invalid(format!(
                    "unknown statistics protocol {:?}",
                    s
                )))
            }
        };
        Ok(protocol)
    }
}

impl fmt::Display for StatisticsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display options for a connection listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// `-a`: all connections and listening ports.
    pub all: bool,
    /// `-q`: all connections, listening ports and bound non-listening ports.
    pub all_bound: bool,
    /// `-b`: owning executable (requires elevation).
    pub executables: bool,
    /// `-f`: fully qualified domain names for foreign addresses.
    pub fqdn: bool,
    /// `-n`: numeric addresses and ports.
    pub numeric: bool,
    /// `-o`: owning process ID.
    pub pids: bool,
    /// `-i`: time spent in the current state.
    pub time_in_state: bool,
    /// `-t`: offload state.
    pub offload_state: bool,
    /// `-y`: connection templates.
    pub templates: bool,
    /// `-p`: restrict to one protocol.
    pub protocol: Option<ConnectionProtocol>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all(mut self, enabled: bool) -> Self {
        self.all = enabled;
        self
    }

    pub fn with_all_bound(mut self, enabled: bool) -> Self {
        self.all_bound = enabled;
        self
    }

    pub fn with_executables(mut self, enabled: bool) -> Self {
        self.executables = enabled;
        self
    }

    pub fn with_fqdn(mut self, enabled: bool) -> Self {
        self.fqdn = enabled;
        self
    }

    pub fn with_numeric(mut self, enabled: bool) -> Self {
        self.numeric = enabled;
        self
    }

    pub fn with_pids(mut self, enabled: bool) -> Self {
        self.pids = enabled;
        self
    }

    pub fn with_time_in_state(mut self, enabled: bool) -> Self {
        self.time_in_state = enabled;
        self
    }

    pub fn with_offload_state(mut self, enabled: bool) -> Self {
        self.offload_state = enabled;
        self
    }

    pub fn with_templates(mut self, enabled: bool) -> Self {
        self.templates = enabled;
        self
    }

    pub fn with_protocol(mut self, protocol: Option<ConnectionProtocol>) -> Self {
        self.protocol = protocol;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.all && self.all_bound {
            return Err(Error::invalid("-a and -q cannot be combined"));
        }
        let others = self.all
            || self.all_bound
            || self.executables
            || self.fqdn
            || self.pids
            || self.time_in_state
            || self.offload_state;
        if self.templates && others {
            return Err(Error::invalid(
                "-y cannot be combined with other display options",
            ));
        }
        Ok(())
    }

    fn push_args(&self, args: &mut Vec<String>) {
        let flags = [
            (self.all, "-a"),
            (self.all_bound, "-q"),
            (self.executables, "-b"),
            (self.fqdn, "-f"),
            (self.numeric, "-n"),
            (self.pids, "-o"),
            (self.time_in_state, "-i"),
            (self.offload_state, "-t"),
            (self.templates, "-y"),
        ];
        args.extend(
            flags
                .iter()
                .filter(|(enabled, _)| *enabled)
                .map(|(_, flag)| flag.to_string()),
        );
        if let Some(protocol) = self.protocol {
            args.push("-p".to_string());
            args.push(protocol.as_str().to_string());
        }
    }
}

/// One `netstat` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetstatCommand {
    /// Active connections (and listening ports with `-a`).
    Connections(ConnectionOptions),
    /// `-r`: interface list and routing tables.
    Routing,
    /// `-e`: ethernet statistics.
    Ethernet,
    /// `-s`: per-protocol statistics.
    Statistics { protocol: Option<StatisticsProtocol> },
}

impl CommandSpec for NetstatCommand {
    const PROGRAM: &'static str = "netstat";

    fn validate(&self) -> Result<()> {
        match self {
            NetstatCommand::Connections(options) => options.validate(),
            NetstatCommand::Routing
            | NetstatCommand::Ethernet
            | NetstatCommand::Statistics { .. } => Ok(()),
        }
    }

    fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        match self {
            NetstatCommand::Connections(options) => options.push_args(&mut args),
            NetstatCommand::Routing => args.push("-r".to_string()),
            NetstatCommand::Ethernet => args.push("-e".to_string()),
            NetstatCommand::Statistics { protocol } => {
                args.push("-s".to_string());
                if let Some(protocol) = protocol {
                    args.push("-p".to_string());
                    args.push(protocol.as_str().to_string());
                }
            }
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_args() {
        let command = NetstatCommand::Connections(
            ConnectionOptions::new()
                .with_all(true)
                .with_numeric(true)
                .with_pids(true)
                .with_protocol(Some(ConnectionProtocol::TcpV6)),
        );
        assert_eq!(command.args(), vec!["-a", "-n", "-o", "-p", "TCPv6"]);
        assert_eq!(
            command.command_line().unwrap().to_string(),
            "netstat -a -n -o -p TCPv6"
        );
    }

    #[test]
    fn test_plain_listing_has_no_args() {
        let command = NetstatCommand::Connections(ConnectionOptions::new());
        assert!(command.args().is_empty());
        assert_eq!(command.command_line().unwrap().to_string(), "netstat");
    }

    #[test]
    fn test_other_modes() {
        assert_eq!(NetstatCommand::Routing.args(), vec!["-r"]);
        assert_eq!(NetstatCommand::Ethernet.args(), vec!["-e"]);
        assert_eq!(
            NetstatCommand::Statistics { protocol: None }.args(),
            vec!["-s"]
        );
        assert_eq!(
            NetstatCommand::Statistics {
                protocol: Some(StatisticsProtocol::Icmpv6)
            }
            .args(),
            vec!["-s", "-p", "ICMPv6"]
        );
    }

    #[test]
    fn test_invalid_combinations() {
        let both = NetstatCommand::Connections(
            ConnectionOptions::new().with_all(true).with_all_bound(true),
        );
        assert!(matches!(both.command_line(), Err(Error::InvalidParameter(_))));

        let templates =
            NetstatCommand::Connections(ConnectionOptions::new().with_templates(true).with_pids(true));
        assert!(templates.validate().is_err());

        let templates_only = NetstatCommand::Connections(
            ConnectionOptions::new()
                .with_templates(true)
                .with_numeric(true),
        );
        assert!(templates_only.validate().is_ok());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("tcpv6".parse::<ConnectionProtocol>().unwrap(), ConnectionProtocol::TcpV6);
        assert_eq!(ConnectionProtocol::UdpV6.protocol(), Protocol::Udp);
        assert!("icmp".parse::<ConnectionProtocol>().is_err());

        assert_eq!("ICMP".parse::<StatisticsProtocol>().unwrap(), StatisticsProtocol::Icmp);
        assert_eq!(StatisticsProtocol::Tcpv6.section(), StatisticsSection::TcpV6);
    }
}
