//! Connection records parsed from `netstat` active-connection listings.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Protocol
// ============================================================================

/// Transport protocol of a connection row.
///
/// netstat prints `TCP`/`UDP` for both address families; the `TCPv6` and
/// `UDPv6` spellings it accepts on input are folded into the same variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

impl Protocol {
    /// The column value netstat prints for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        }
    }
}

impl FromStr for Protocol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TCP" | "TCPV6" => Ok(Protocol::Tcp),
            "UDP" | "UDPV6" => Ok(Protocol::Udp),
            _ => Err(Error::parse(format!("unknown protocol {:?}", s), s)),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TcpState
// ============================================================================

/// TCP connection state as reported by Windows netstat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TcpState {
    Closed,
    Listening,
    SynSent,
    SynReceived,
    Established,
    FinWait1,
    FinWait2,
    CloseWait,
    Closing,
    LastAck,
    TimeWait,
    DeleteTcb,
    Bound,
}

impl TcpState {
    /// The spelling netstat prints.
    pub fn as_str(&self) -> &'static str {
        match self {
            TcpState::Closed => "CLOSED",
            TcpState::Listening => "LISTENING",
            TcpState::SynSent => "SYN_SENT",
            TcpState::SynReceived => "SYN_RECEIVED",
            TcpState::Established => "ESTABLISHED",
            TcpState::FinWait1 => "FIN_WAIT_1",
            TcpState::FinWait2 => "FIN_WAIT_2",
            TcpState::CloseWait => "CLOSE_WAIT",
            TcpState::Closing => "CLOSING",
            TcpState::LastAck => "LAST_ACK",
            TcpState::TimeWait => "TIME_WAIT",
            TcpState::DeleteTcb => "DELETE_TCB",
            TcpState::Bound => "BOUND",
        }
    }
}

impl FromStr for TcpState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let state = match s {
            "CLOSED" => TcpState::Closed,
            "LISTENING" | "LISTEN" => TcpState::Listening,
            "SYN_SENT" => TcpState::SynSent,
            "SYN_RECEIVED" | "SYN_RECV" => TcpState::SynReceived,
            "ESTABLISHED" => TcpState::Established,
            "FIN_WAIT_1" | "FIN_WAIT1" => TcpState::FinWait1,
            "FIN_WAIT_2" | "FIN_WAIT2" => TcpState::FinWait2,
            "CLOSE_WAIT" => TcpState::CloseWait,
            "CLOSING" => TcpState::Closing,
            "LAST_ACK" => TcpState::LastAck,
            "TIME_WAIT" => TcpState::TimeWait,
            "DELETE_TCB" => TcpState::DeleteTcb,
            "BOUND" => TcpState::Bound,
            _ => return Err(Error::parse(format!("unknown TCP state {:?}", s), s)),
        };
        Ok(state)
    }
}

impl fmt::Display for TcpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// Split an `address:port` column on its last colon.
///
/// Handles the layouts netstat prints:
/// - IPv4: "127.0.0.1:3000"
/// - IPv6: "\[::1]:3000" or "\[fe80::1%4]:49664" (brackets are kept)
/// - Wildcard: "*:*" (the `*` port becomes 0)
pub fn split_endpoint(endpoint: &str) -> Result<(String, u16)> {
    let colon = endpoint
        .rfind(':')
        .ok_or_else(|| Error::parse("endpoint has no port separator", endpoint))?;
    let address = &endpoint[..colon];
    let port_str = &endpoint[colon + 1..];

    if address.is_empty() {
        return Err(Error::parse("endpoint has an empty address", endpoint));
    }

    let port = if port_str == "*" {
        0
    } else {
        port_str
            .parse::<u16>()
            .map_err(|_| Error::parse(format!("non-numeric port {:?}", port_str), endpoint))?
    };

    Ok((address.to_string(), port))
}

/// Inverse of [`split_endpoint`].
pub fn format_endpoint(address: &str, port: u16) -> String {
    if address == "*" && port == 0 {
        "*:*".to_string()
    } else {
        format!("{}:{}", address, port)
    }
}

/// Whether a bound address occupies the port for local clients.
///
/// Loopback binds and wildcard binds both do.
pub fn is_localhost_bind(address: &str) -> bool {
    matches!(address, "127.0.0.1" | "0.0.0.0" | "[::1]" | "[::]")
}

// ============================================================================
// ConnectionRecord
// ============================================================================

/// One row of a netstat active-connection listing.
///
/// Records built by the parser always have `state` set for TCP rows and
/// unset for UDP rows. The fields are public, so hand-built or deserialized
/// records must keep that pairing themselves; [`ConnectionRecord::validate`]
/// checks it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub protocol: Protocol,
    pub local_address: String,
    pub local_port: u16,
    pub foreign_address: String,
    pub foreign_port: u16,
    /// Present iff `protocol` is TCP.
    pub state: Option<TcpState>,
    /// Owning process (`-o`).
    pub pid: Option<u32>,
    /// Milliseconds spent in the current state (`-i`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_in_state_ms: Option<u64>,
    /// Offload state (`-t`), e.g. "InHost".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offload_state: Option<String>,
    /// Connection template (`-y`), e.g. "Internet".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Owning service or component (`-b`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Owning executable (`-b`), without brackets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
}

impl ConnectionRecord {
    /// Create a TCP record.
    pub fn tcp(
        local_address: impl Into<String>,
        local_port: u16,
        foreign_address: impl Into<String>,
        foreign_port: u16,
        state: TcpState,
    ) -> Self {
        Self {
            protocol: Protocol::Tcp,
            local_address: local_address.into(),
            local_port,
            foreign_address: foreign_address.into(),
            foreign_port,
            state: Some(state),
            pid: None,
            time_in_state_ms: None,
            offload_state: None,
            template: None,
            component: None,
            executable: None,
        }
    }

    /// Create a UDP record. UDP rows have a wildcard foreign endpoint.
    pub fn udp(local_address: impl Into<String>, local_port: u16) -> Self {
        Self {
            protocol: Protocol::Udp,
            local_address: local_address.into(),
            local_port,
            foreign_address: "*".to_string(),
            foreign_port: 0,
            state: None,
            pid: None,
            time_in_state_ms: None,
            offload_state: None,
            template: None,
            component: None,
            executable: None,
        }
    }

    /// Attach the owning PID.
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attach the owning executable.
    pub fn with_executable(mut self, executable: impl Into<String>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    /// The local endpoint as netstat prints it.
    pub fn local_endpoint(&self) -> String {
        format_endpoint(&self.local_address, self.local_port)
    }

    /// The foreign endpoint as netstat prints it.
    pub fn foreign_endpoint(&self) -> String {
        format_endpoint(&self.foreign_address, self.foreign_port)
    }

    /// Whether the row is a TCP listener.
    pub fn is_listening(&self) -> bool {
        self.state == Some(TcpState::Listening)
    }

    /// Check that the record could have come from netstat: state present iff
    /// TCP, and every text field renders as a single netstat token (the
    /// template may span several words).
    pub fn validate(&self) -> Result<()> {
        match (self.protocol, self.state) {
            (Protocol::Tcp, None) => return Err(Error::invalid("TCP record has no state")),
            (Protocol::Udp, Some(state)) => {
                return Err(Error::invalid(format!("UDP record has state {}", state)))
            }
            _ => {}
        }

        single_token("local address", &self.local_address)?;
        single_token("foreign address", &self.foreign_address)?;
        if let Some(offload) = &self.offload_state {
            single_token("offload state", offload)?;
        }
        if let Some(template) = &self.template {
            let words: Vec<&str> = template.split_whitespace().collect();
            if words.is_empty() || words.join(" ") != *template {
                return Err(Error::invalid(format!(
                    "template {:?} must be words separated by single spaces",
                    template
                )));
            }
        }
        if let Some(component) = &self.component {
            single_token("component", component)?;
            if component.starts_with('[') || component.parse::<Protocol>().is_ok() {
                return Err(Error::invalid(format!(
                    "component {:?} would read back as another line",
                    component
                )));
            }
        }
        if let Some(executable) = &self.executable {
            if executable.contains(['\r', '\n']) {
                return Err(Error::invalid(format!(
                    "executable {:?} contains a line break",
                    executable
                )));
            }
        }
        Ok(())
    }
}

fn single_token(field: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains(char::is_whitespace) {
        return Err(Error::invalid(format!(
            "{} {:?} is not a single token",
            field, value
        )));
    }
    Ok(())
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.protocol,
            self.local_endpoint(),
            self.foreign_endpoint()
        )?;
        if let Some(state) = self.state {
            write!(f, " {}", state)?;
        }
        if let Some(pid) = self.pid {
            write!(f, " (PID {})", pid)?;
        }
        Ok(())
    }
}

// ============================================================================
// ConnectionTable
// ============================================================================

/// Ordered connection rows, in the order netstat printed them.
///
/// Duplicate local ports are expected (the same port is usually bound for
/// both TCP and UDP, or for both address families).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionTable {
    records: Vec<ConnectionRecord>,
}

impl ConnectionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: ConnectionRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConnectionRecord> {
        self.records.iter()
    }

    pub fn records(&self) -> &[ConnectionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ConnectionRecord> {
        self.records
    }

    /// Rows of one protocol, order preserved.
    pub fn with_protocol(&self, protocol: Protocol) -> ConnectionTable {
        self.records
            .iter()
            .filter(|r| r.protocol == protocol)
            .cloned()
            .collect()
    }

    /// Distinct local ports bound for the given protocol.
    pub fn local_ports(&self, protocol: Protocol) -> BTreeSet<u16> {
        self.records
            .iter()
            .filter(|r| r.protocol == protocol)
            .map(|r| r.local_port)
            .collect()
    }

    /// Distinct local ports bound on a loopback or wildcard address.
    pub fn localhost_ports(&self) -> BTreeSet<u16> {
        self.records
            .iter()
            .filter(|r| is_localhost_bind(&r.local_address))
            .map(|r| r.local_port)
            .collect()
    }

    /// Localhost ports grouped by owning PID. Rows without a PID are ignored.
    pub fn localhost_ports_by_pid(&self) -> BTreeMap<u32, BTreeSet<u16>> {
        let mut by_pid: BTreeMap<u32, BTreeSet<u16>> = BTreeMap::new();
        for record in &self.records {
            let Some(pid) = record.pid else {
                continue;
            };
            if is_localhost_bind(&record.local_address) {
                by_pid.entry(pid).or_default().insert(record.local_port);
            }
        }
        by_pid
    }

    /// Render the table in netstat's "Active Connections" layout.
    ///
    /// The output parses back into the same records. Tables that netstat
    /// could not have printed are rejected with [`Error::InvalidParameter`]:
    /// an optional column filled on some rows only, or a record that fails
    /// [`ConnectionRecord::validate`].
    pub fn to_netstat_text(&self) -> Result<String> {
        for record in &self.records {
            record.validate()?;
        }
        let show_pid = self.uniform_column("PID", |r| r.pid.is_some())?;
        let show_time =
            self.uniform_column("Time in State (ms)", |r| r.time_in_state_ms.is_some())?;
        let show_offload = self.uniform_column("Offload State", |r| r.offload_state.is_some())?;
        let show_template = self.uniform_column("Template", |r| r.template.is_some())?;

        let mut header = format!(
            "  {:<7}{:<23}{:<23}{:<16}",
            "Proto", "Local Address", "Foreign Address", "State"
        );
        if show_pid {
            header.push_str(&format!("{:<8}", "PID"));
        }
        if show_time {
            header.push_str(&format!("{:<20}", "Time in State (ms)"));
        }
        if show_offload {
            header.push_str(&format!("{:<15}", "Offload State"));
        }
        if show_template {
            header.push_str("Template");
        }

        let mut out = String::from("\nActive Connections\n\n");
        out.push_str(header.trim_end());
        out.push('\n');

        for record in &self.records {
            let mut line = format!(
                "  {} {} {} {}",
                pad(record.protocol.as_str(), 6),
                pad(&record.local_endpoint(), 22),
                pad(&record.foreign_endpoint(), 22),
                pad(record.state.map(|s| s.as_str()).unwrap_or(""), 15),
            );
            if show_pid {
                let _ = write!(line, " {}", pad(&opt(record.pid), 7));
            }
            if show_time {
                let _ = write!(line, " {}", pad(&opt(record.time_in_state_ms), 19));
            }
            if show_offload {
                let _ = write!(line, " {}", pad(record.offload_state.as_deref().unwrap_or(""), 14));
            }
            if show_template {
                let _ = write!(line, " {}", record.template.as_deref().unwrap_or(""));
            }
            out.push_str(line.trim_end());
            out.push('\n');

            if let Some(component) = &record.component {
                let _ = writeln!(out, " {}", component);
            }
            if let Some(executable) = &record.executable {
                let _ = writeln!(out, " [{}]", executable);
            }
        }

        Ok(out)
    }

    /// Whether every record fills an optional column; fails when only some do.
    fn uniform_column(&self, name: &str, has: fn(&ConnectionRecord) -> bool) -> Result<bool> {
        let filled = self.records.iter().filter(|r| has(r)).count();
        if filled > 0 && filled < self.records.len() {
            return Err(Error::invalid(format!(
                "{} column is set on {} of {} records",
                name,
                filled,
                self.records.len()
            )));
        }
        Ok(filled > 0)
    }
}

fn pad(value: &str, width: usize) -> String {
    format!("{:<width$}", value, width = width)
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl FromIterator<ConnectionRecord> for ConnectionTable {
    fn from_iter<I: IntoIterator<Item = ConnectionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<ConnectionRecord>> for ConnectionTable {
    fn from(records: Vec<ConnectionRecord>) -> Self {
        Self { records }
    }
}

impl IntoIterator for ConnectionTable {
    type Item = ConnectionRecord;
    type IntoIter = std::vec::IntoIter<ConnectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a ConnectionTable {
    type Item = &'a ConnectionRecord;
    type IntoIter = std::slice::Iter<'a, ConnectionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Tests
// ============================================================================
