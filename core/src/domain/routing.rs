//! Parser for `netstat -r` routing tables.
//!
//! Example input:
//! ```text
//! ===========================================================================
//! Interface List
//!  12...00 15 5d 01 02 03 ......Hyper-V Virtual Ethernet Adapter
//!   1...........................Software Loopback Interface 1
//! ===========================================================================
//!
//! IPv4 Route Table
//! ===========================================================================
//! Active Routes:
//! Network Destination        Netmask          Gateway       Interface  Metric
//!           0.0.0.0          0.0.0.0      192.168.1.1    192.168.1.10     25
//! ===========================================================================
//! Persistent Routes:
//!   None
//!
//! IPv6 Route Table
//! ===========================================================================
//! Active Routes:
//!  If Metric Network Destination      Gateway
//!   1    331 ::1/128                  On-link
//! ===========================================================================
//! Persistent Routes:
//!   None
//! ```

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

const INTERFACE_LIST: &str = "Interface List";
const IPV4_TABLE: &str = "IPv4 Route Table";
const IPV6_TABLE: &str = "IPv6 Route Table";
const ACTIVE_ROUTES: &str = "Active Routes:";
const PERSISTENT_ROUTES: &str = "Persistent Routes:";

/// One network interface from the "Interface List" block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceEntry {
    pub index: u32,
    /// Hardware address as printed ("00 15 5d 01 02 03"); absent for
    /// loopback and tunnel interfaces.
    pub mac: Option<String>,
    pub description: String,
}

/// An active IPv4 route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Route {
    pub destination: String,
    pub netmask: String,
    /// A next-hop address or "On-link".
    pub gateway: String,
    pub interface: String,
    pub metric: u32,
}

/// A persistent IPv4 route. `metric` is `None` when netstat prints "Default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentRoute {
    pub network_address: String,
    pub netmask: String,
    pub gateway_address: String,
    pub metric: Option<u32>,
}

/// An IPv6 route (active or persistent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv6Route {
    pub interface_index: u32,
    pub metric: u32,
    pub destination: String,
    pub gateway: String,
}

/// Everything `netstat -r` prints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTables {
    pub interfaces: Vec<InterfaceEntry>,
    pub ipv4_active: Vec<Ipv4Route>,
    pub ipv4_persistent: Vec<PersistentRoute>,
    pub ipv6_active: Vec<Ipv6Route>,
    pub ipv6_persistent: Vec<Ipv6Route>,
}

/// Parse the full output of `netstat -r`.
///
/// Each of the three blocks must be present. Rows inside a block that do not
/// fit its layout are skipped with a warning.
pub fn parse_routing_tables(text: &str) -> Result<RoutingTables> {
    let lines: Vec<&str> = text.lines().collect();

    let interfaces = section(&lines, INTERFACE_LIST)?
        .iter()
        .copied()
        .take_while(|line| !is_rule(line))
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| skip_bad(parse_interface(line)))
        .collect();

    let ipv4 = section(&lines, IPV4_TABLE)?;
    let ipv4_active = route_rows(ipv4, ACTIVE_ROUTES, "Network Destination")
        .into_iter()
        .filter_map(|line| skip_bad(parse_ipv4_route(line)))
        .collect();
    let ipv4_persistent = route_rows(ipv4, PERSISTENT_ROUTES, "Network Address")
        .into_iter()
        .filter_map(|line| skip_bad(parse_persistent_route(line)))
        .collect();

    let ipv6 = section(&lines, IPV6_TABLE)?;
    let ipv6_active = parse_ipv6_routes(&route_rows(ipv6, ACTIVE_ROUTES, "If"));
    let ipv6_persistent = parse_ipv6_routes(&route_rows(ipv6, PERSISTENT_ROUTES, "If"));

    Ok(RoutingTables {
        interfaces,
        ipv4_active,
        ipv4_persistent,
        ipv6_active,
        ipv6_persistent,
    })
}

fn skip_bad<T>(result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "Skipping unparseable routing row");
            None
        }
    }
}

fn is_rule(line: &str) -> bool {
    line.trim_start().starts_with("===")
}

/// Lines after `title` up to the next block title.
fn section<'a>(lines: &'a [&'a str], title: &str) -> Result<&'a [&'a str]> {
    let start = lines
        .iter()
        .position(|line| line.trim() == title)
        .ok_or_else(|| Error::parse(format!("no {} found", title), ""))?
        + 1;
    let end = lines[start..]
        .iter()
        .position(|line| matches!(line.trim(), INTERFACE_LIST | IPV4_TABLE | IPV6_TABLE))
        .map_or(lines.len(), |offset| start + offset);
    Ok(&lines[start..end])
}

/// Non-blank data rows below `marker`, excluding the column header, up to the
/// closing rule. "None" yields no rows.
fn route_rows<'a>(block: &[&'a str], marker: &str, header_prefix: &str) -> Vec<&'a str> {
    let Some(start) = block.iter().position(|line| line.trim() == marker) else {
        return Vec::new();
    };
    block[start + 1..]
        .iter()
        .copied()
        .take_while(|line| !is_rule(line) && line.trim() != PERSISTENT_ROUTES)
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != "None" && !line.starts_with(header_prefix))
        .collect()
}

/// `" 12...00 15 5d 01 02 03 ......Hyper-V Virtual Ethernet Adapter"`
fn parse_interface(line: &str) -> Result<InterfaceEntry> {
    let trimmed = line.trim();
    let dots = trimmed
        .find("...")
        .ok_or_else(|| Error::parse("interface row has no index separator", line))?;
    let index = trimmed[..dots]
        .trim()
        .parse()
        .map_err(|_| Error::parse("non-numeric interface index", line))?;

    let rest = trimmed[dots..].trim_start_matches('.');
    let (mac, description) = match rest.find("...") {
        Some(pos) => (
            Some(rest[..pos].trim().to_string()),
            rest[pos..].trim_start_matches('.').trim().to_string(),
        ),
        None => (None, rest.trim().to_string()),
    };

    Ok(InterfaceEntry {
        index,
        mac: mac.filter(|m| !m.is_empty()),
        description,
    })
}

fn parse_ipv4_route(line: &str) -> Result<Ipv4Route> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [destination, netmask, gateway, interface, metric] = fields[..] else {
        return Err(Error::parse("expected 5 fields in IPv4 route", line));
    };
    Ok(Ipv4Route {
        destination: destination.to_string(),
        netmask: netmask.to_string(),
        gateway: gateway.to_string(),
        interface: interface.to_string(),
        metric: metric
            .parse()
            .map_err(|_| Error::parse("non-numeric route metric", line))?,
    })
}

fn parse_persistent_route(line: &str) -> Result<PersistentRoute> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [network_address, netmask, gateway_address, metric] = fields[..] else {
        return Err(Error::parse("expected 4 fields in persistent route", line));
    };
    let metric = match metric {
        "Default" => None,
        value => Some(
            value
                .parse()
                .map_err(|_| Error::parse("non-numeric route metric", line))?,
        ),
    };
    Ok(PersistentRoute {
        network_address: network_address.to_string(),
        netmask: netmask.to_string(),
        gateway_address: gateway_address.to_string(),
        metric,
    })
}

/// IPv6 rows whose destination is long push the gateway onto the next line.
fn parse_ipv6_routes(rows: &[&str]) -> Vec<Ipv6Route> {
    let mut routes = Vec::new();
    let mut iter = rows.iter().peekable();

    while let Some(line) = iter.next() {
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() == 3 {
            if let Some(next) = iter.peek() {
                if next.split_whitespace().count() == 1 {
                    fields.push(next.trim());
                    iter.next();
                }
            }
        }
        if let Some(route) = skip_bad(parse_ipv6_route(&fields, line)) {
            routes.push(route);
        }
    }

    routes
}

fn parse_ipv6_route(fields: &[&str], line: &str) -> Result<Ipv6Route> {
    let [interface_index, metric, destination, gateway] = fields[..] else {
        return Err(Error::parse("expected 4 fields in IPv6 route", line));
    };
    Ok(Ipv6Route {
        interface_index: interface_index
            .parse()
            .map_err(|_| Error::parse("non-numeric interface index", line))?,
        metric: metric
            .parse()
            .map_err(|_| Error::parse("non-numeric route metric", line))?,
        destination: destination.to_string(),
        gateway: gateway.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "\
===========================================================================
Interface List
 12...00 15 5d 01 02 03 ......Hyper-V Virtual Ethernet Adapter
 18...a4 bb 6d 11 22 33 ......Intel(R) Wi-Fi 6 AX201 160MHz
  1...........................Software Loopback Interface 1
===========================================================================

IPv4 Route Table
===========================================================================
Active Routes:
Network Destination        Netmask          Gateway       Interface  Metric
          0.0.0.0          0.0.0.0      192.168.1.1    192.168.1.10     25
        127.0.0.0        255.0.0.0         On-link         127.0.0.1    331
        127.0.0.1  255.255.255.255         On-link         127.0.0.1    331
===========================================================================
Persistent Routes:
  Network Address          Netmask  Gateway Address  Metric
          0.0.0.0          0.0.0.0      192.168.1.1  Default
       10.10.0.0      255.255.0.0         10.0.0.1       5
===========================================================================

IPv6 Route Table
===========================================================================
Active Routes:
 If Metric Network Destination      Gateway
  1    331 ::1/128                  On-link
 18    281 fe80::/64                On-link
 18    281 fe80::1c2d:3e4f:5a6b:7c8d/128
                                    On-link
===========================================================================
Persistent Routes:
  None
";

    #[test]
    fn test_interfaces() {
        let tables = parse_routing_tables(CAPTURE).unwrap();
        assert_eq!(tables.interfaces.len(), 3);
        assert_eq!(tables.interfaces[0].index, 12);
        assert_eq!(tables.interfaces[0].mac.as_deref(), Some("00 15 5d 01 02 03"));
        assert_eq!(tables.interfaces[0].description, "Hyper-V Virtual Ethernet Adapter");
        assert_eq!(tables.interfaces[1].description, "Intel(R) Wi-Fi 6 AX201 160MHz");
        assert_eq!(tables.interfaces[2].index, 1);
        assert_eq!(tables.interfaces[2].mac, None);
        assert_eq!(tables.interfaces[2].description, "Software Loopback Interface 1");
    }

    #[test]
    fn test_ipv4_routes() {
        let tables = parse_routing_tables(CAPTURE).unwrap();
        assert_eq!(tables.ipv4_active.len(), 3);
        assert_eq!(tables.ipv4_active[0].gateway, "192.168.1.1");
        assert_eq!(tables.ipv4_active[0].metric, 25);
        assert_eq!(tables.ipv4_active[1].gateway, "On-link");

        assert_eq!(tables.ipv4_persistent.len(), 2);
        assert_eq!(tables.ipv4_persistent[0].metric, None);
        assert_eq!(tables.ipv4_persistent[1].metric, Some(5));
    }

    #[test]
    fn test_ipv6_routes_join_wrapped_gateway() {
        let tables = parse_routing_tables(CAPTURE).unwrap();
        assert_eq!(tables.ipv6_active.len(), 3);
        let wrapped = &tables.ipv6_active[2];
        assert_eq!(wrapped.interface_index, 18);
        assert_eq!(wrapped.destination, "fe80::1c2d:3e4f:5a6b:7c8d/128");
        assert_eq!(wrapped.gateway, "On-link");
        assert!(tables.ipv6_persistent.is_empty());
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let text = "Interface List\n  1...........................Loopback\n";
        let err = parse_routing_tables(text).unwrap_err();
        assert!(err.to_string().contains("IPv4 Route Table"));
    }
}
