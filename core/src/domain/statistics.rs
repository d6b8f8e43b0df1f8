//! Parsers for `netstat -s` (per-protocol statistics) and `netstat -e`
//! (ethernet statistics).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// `  Messages                  12          34`
static DIRECTIONAL_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>\S.*?)\s{2,}(?P<received>\d+)(?:\s+(?P<sent>\d+))?$")
        .expect("static regex")
});

// ============================================================================
// Per-protocol statistics
// ============================================================================

/// A block of `netstat -s` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StatisticsSection {
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
    #[serde(rename = "ICMPv4")]
    Icmpv4,
    #[serde(rename = "ICMPv6")]
    Icmpv6,
    #[serde(rename = "TCPv4")]
    TcpV4,
    #[serde(rename = "TCPv6")]
    TcpV6,
    #[serde(rename = "UDPv4")]
    UdpV4,
    #[serde(rename = "UDPv6")]
    UdpV6,
}

impl StatisticsSection {
    pub const ALL: [StatisticsSection; 8] = [
        StatisticsSection::Ipv4,
        StatisticsSection::Ipv6,
        StatisticsSection::Icmpv4,
        StatisticsSection::Icmpv6,
        StatisticsSection::TcpV4,
        StatisticsSection::TcpV6,
        StatisticsSection::UdpV4,
        StatisticsSection::UdpV6,
    ];

    /// The block title netstat prints.
    pub fn title(&self) -> &'static str {
        match self {
            StatisticsSection::Ipv4 => "IPv4 Statistics",
            StatisticsSection::Ipv6 => "IPv6 Statistics",
            StatisticsSection::Icmpv4 => "ICMPv4 Statistics",
            StatisticsSection::Icmpv6 => "ICMPv6 Statistics",
            StatisticsSection::TcpV4 => "TCP Statistics for IPv4",
            StatisticsSection::TcpV6 => "TCP Statistics for IPv6",
            StatisticsSection::UdpV4 => "UDP Statistics for IPv4",
            StatisticsSection::UdpV6 => "UDP Statistics for IPv6",
        }
    }

    /// ICMP blocks have Received/Sent columns instead of `name = value` rows.
    pub fn is_directional(&self) -> bool {
        matches!(self, StatisticsSection::Icmpv4 | StatisticsSection::Icmpv6)
    }
}

impl fmt::Display for StatisticsSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// `  Packets Received                   = 1234567`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub name: String,
    pub value: u64,
}

/// A row with received and sent counts. `sent` is absent for rows netstat
/// prints with a single value (e.g. "Unknown protocols" in `-e` output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionalStatistic {
    pub name: String,
    pub received: u64,
    pub sent: Option<u64>,
}

/// Rows of one `netstat -s` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatisticsTable {
    Counters(Vec<Statistic>),
    Directional(Vec<DirectionalStatistic>),
}

impl StatisticsTable {
    pub fn len(&self) -> usize {
        match self {
            StatisticsTable::Counters(rows) => rows.len(),
            StatisticsTable::Directional(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a counter by name (received count for directional rows).
    pub fn get(&self, name: &str) -> Option<u64> {
        match self {
            StatisticsTable::Counters(rows) => {
                rows.iter().find(|r| r.name == name).map(|r| r.value)
            }
            StatisticsTable::Directional(rows) => {
                rows.iter().find(|r| r.name == name).map(|r| r.received)
            }
        }
    }
}

/// All lines after the block title.
fn lines_after<'a>(text: &'a str, title: &str) -> Option<Vec<&'a str>> {
    let mut lines = text.lines().skip_while(|line| line.trim() != title);
    lines.next()?;
    Some(lines.collect())
}

/// The next run of non-blank lines, advancing `rest` past it.
fn next_paragraph<'s, 'a>(rest: &mut &'s [&'a str]) -> Vec<&'a str> {
    let lines: &'s [&'a str] = *rest;
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let len = lines[start..]
        .iter()
        .position(|line| line.trim().is_empty())
        .unwrap_or(lines.len() - start);
    *rest = &lines[start + len..];
    lines[start..start + len].to_vec()
}

fn parse_counter(line: &str) -> Option<Statistic> {
    let (name, value) = line.split_once('=')?;
    Some(Statistic {
        name: name.trim().to_string(),
        value: value.trim().parse().ok()?,
    })
}

fn parse_directional(line: &str) -> Option<DirectionalStatistic> {
    let caps = DIRECTIONAL_ROW.captures(line.trim())?;
    Some(DirectionalStatistic {
        name: caps["name"].to_string(),
        received: caps["received"].parse().ok()?,
        sent: match caps.name("sent") {
            Some(sent) => Some(sent.as_str().parse().ok()?),
            None => None,
        },
    })
}

fn is_column_header(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    words == ["Received", "Sent"]
}

/// Extract one block of `netstat -s` output.
pub fn parse_statistics_section(text: &str, section: StatisticsSection) -> Result<StatisticsTable> {
    let lines = lines_after(text, section.title())
        .ok_or_else(|| Error::parse(format!("no {} found", section.title()), ""))?;
    let mut rest = lines.as_slice();
    let mut body = next_paragraph(&mut rest);

    if !section.is_directional() {
        let rows = body
            .into_iter()
            .filter_map(|line| {
                let row = parse_counter(line);
                if row.is_none() {
                    debug!(line = line, "Skipping statistics line");
                }
                row
            })
            .collect();
        return Ok(StatisticsTable::Counters(rows));
    }

    // Some builds separate the Received/Sent header from the rows with a
    // blank line.
    if body.first().is_some_and(|line| is_column_header(line)) {
        body.remove(0);
        if body.is_empty() {
            body = next_paragraph(&mut rest);
        }
    }
    let rows = body
        .into_iter()
        .filter_map(|line| {
            let row = parse_directional(line);
            if row.is_none() {
                debug!(line = line, "Skipping statistics line");
            }
            row
        })
        .collect();
    Ok(StatisticsTable::Directional(rows))
}

/// Extract all eight blocks of `netstat -s` output. Fails if any is missing.
pub fn parse_statistics(text: &str) -> Result<BTreeMap<StatisticsSection, StatisticsTable>> {
    StatisticsSection::ALL
        .iter()
        .map(|section| parse_statistics_section(text, *section).map(|table| (*section, table)))
        .collect()
}

// ============================================================================
// Ethernet statistics
// ============================================================================

/// Parse `netstat -e` output into its Received/Sent rows.
///
/// ```text
/// Interface Statistics
///
///                            Received            Sent
///
/// Bytes                    3456789012      1234567890
/// Unknown protocols                 0
/// ```
pub fn parse_ethernet_statistics(text: &str) -> Result<Vec<DirectionalStatistic>> {
    let mut lines = text
        .lines()
        .skip_while(|line| line.trim() != "Interface Statistics");
    if lines.next().is_none() {
        return Err(Error::parse("no Interface Statistics found", ""));
    }

    Ok(lines
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_column_header(line))
        .filter_map(parse_directional)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "
IPv4 Statistics

  Packets Received                   = 1234567
  Received Header Errors             = 0
  Received Address Errors            = 12

IPv6 Statistics

  Packets Received                   = 4321
  Received Header Errors             = 1

ICMPv4 Statistics

                            Received    Sent
  Messages                  120         340
  Errors                    0           0
  Destination Unreachable   12          34

ICMPv6 Statistics

                            Received    Sent
  Messages                  5           7

TCP Statistics for IPv4

  Active Opens                        = 12345
  Passive Opens                       = 678
  Current Connections                 = 42

TCP Statistics for IPv6

  Active Opens                        = 55

UDP Statistics for IPv4

  Datagrams Received    = 99887
  No Ports              = 1200

UDP Statistics for IPv6

  Datagrams Received    = 3
";

    #[test]
    fn test_counter_section() {
        let table = parse_statistics_section(CAPTURE, StatisticsSection::TcpV4).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("Active Opens"), Some(12345));
        assert_eq!(table.get("Current Connections"), Some(42));
    }

    #[test]
    fn test_section_titles_do_not_collide() {
        // "IPv4 Statistics" must not match inside "ICMPv4 Statistics".
        let table = parse_statistics_section(CAPTURE, StatisticsSection::Ipv4).unwrap();
        assert_eq!(table.get("Packets Received"), Some(1234567));
        assert_eq!(table.get("Received Address Errors"), Some(12));
    }

    #[test]
    fn test_icmp_section() {
        let table = parse_statistics_section(CAPTURE, StatisticsSection::Icmpv4).unwrap();
        let StatisticsTable::Directional(rows) = table else {
            panic!("expected directional rows");
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].name, "Destination Unreachable");
        assert_eq!(rows[2].received, 12);
        assert_eq!(rows[2].sent, Some(34));
    }

    #[test]
    fn test_icmp_header_separated_by_blank_line() {
        let text = "ICMPv6 Statistics\n\n        Received    Sent\n\n  Messages    5    7\n  Errors    0    1\n";
        let table = parse_statistics_section(text, StatisticsSection::Icmpv6).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Messages"), Some(5));
    }

    #[test]
    fn test_all_sections() {
        let all = parse_statistics(CAPTURE).unwrap();
        assert_eq!(all.len(), 8);
        assert_eq!(all[&StatisticsSection::UdpV4].get("No Ports"), Some(1200));
        assert_eq!(all[&StatisticsSection::UdpV6].get("Datagrams Received"), Some(3));
    }

    #[test]
    fn test_missing_section() {
        let text = "TCP Statistics for IPv4\n\n  Active Opens = 1\n";
        assert!(parse_statistics_section(text, StatisticsSection::TcpV4).is_ok());
        let err = parse_statistics_section(text, StatisticsSection::UdpV6).unwrap_err();
        assert!(err.to_string().contains("UDP Statistics for IPv6"));
        assert!(parse_statistics(text).is_err());
    }

    #[test]
    fn test_ethernet_statistics() {
        let text = "
Interface Statistics

                           Received            Sent

Bytes                    3456789012      1234567890
Unicast packets            12345678         9876543
Non-unicast packets          123456           12345
Discards                          0               0
Errors                            0               0
Unknown protocols                 0
";
        let rows = parse_ethernet_statistics(text).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].name, "Bytes");
        assert_eq!(rows[0].received, 3456789012);
        assert_eq!(rows[0].sent, Some(1234567890));
        assert_eq!(rows[1].name, "Unicast packets");
        assert_eq!(rows[5].name, "Unknown protocols");
        assert_eq!(rows[5].sent, None);

        assert!(parse_ethernet_statistics("garbage").is_err());
    }
}
