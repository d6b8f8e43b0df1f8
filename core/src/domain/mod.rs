//! Domain layer - Pure models, parsers and command builders.
//!
//! Nothing in here spawns processes or touches the filesystem; every type can
//! be exercised against captured netstat text.

mod command;
mod connection;
mod netstat_command;
mod netstat_parser;
mod port_range;
mod routing;
mod shutdown;
mod statistics;
mod taskkill;

pub use command::{CommandLine, CommandSpec};
pub use connection::{
    format_endpoint, is_localhost_bind, split_endpoint, ConnectionRecord, ConnectionTable,
    Protocol, TcpState,
};
pub use netstat_command::{
    ConnectionOptions, ConnectionProtocol, NetstatCommand, StatisticsProtocol,
};
pub use netstat_parser::{parse_connections, Column, ConnectionLayout};
pub use port_range::{lowest_free_port, PortRange, DEFAULT_HIGH_PORT, DEFAULT_LOW_PORT};
pub use routing::{
    parse_routing_tables, InterfaceEntry, Ipv4Route, Ipv6Route, PersistentRoute, RoutingTables,
};
pub use shutdown::{
    ReasonKind, ShutdownAction, ShutdownOptions, ShutdownReason, MAX_COMMENT_CHARS,
    MAX_TIMEOUT_SECS,
};
pub use statistics::{
    parse_ethernet_statistics, parse_statistics, parse_statistics_section, DirectionalStatistic,
    Statistic, StatisticsSection, StatisticsTable,
};
pub use taskkill::{
    FilterOperator, Password, ProcessFilter, ProcessStatus, RemoteSystem, Selector,
    TaskkillOptions, UserContext,
};
