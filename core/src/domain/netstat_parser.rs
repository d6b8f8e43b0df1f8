//! Parser for netstat active-connection listings.
//!
//! Example input (`netstat -ano`):
//! ```text
//! Active Connections
//!
//!   Proto  Local Address          Foreign Address        State           PID
//!   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1020
//!   TCP    [::]:445               [::]:0                 LISTENING       4
//!   UDP    0.0.0.0:5353           *:*                                    2212
//! ```
//!
//! The header line decides the column layout. A missing or incomplete header
//! aborts the parse; individual rows that fail to parse are logged and
//! skipped.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::connection::{split_endpoint, ConnectionRecord, ConnectionTable, Protocol, TcpState};
use crate::error::{Error, Result};

/// Header columns are separated by two or more spaces ("Local Address" has one).
static HEADER_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("static regex"));

const OWNERSHIP_NOTICE: &str = "Can not obtain ownership information";

/// A column netstat can print in its connection listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Proto,
    LocalAddress,
    ForeignAddress,
    State,
    Pid,
    TimeInState,
    OffloadState,
    Template,
    /// A column this parser does not interpret. Its value is skipped.
    Unknown,
}

impl Column {
    fn from_header(name: &str) -> Self {
        match name {
            "Proto" => Column::Proto,
            "Local Address" => Column::LocalAddress,
            "Foreign Address" => Column::ForeignAddress,
            "State" => Column::State,
            "PID" => Column::Pid,
            "Time in State (ms)" => Column::TimeInState,
            "Offload State" => Column::OffloadState,
            "Template" => Column::Template,
            _ => Column::Unknown,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Column::Proto => "Proto",
            Column::LocalAddress => "Local Address",
            Column::ForeignAddress => "Foreign Address",
            Column::State => "State",
            Column::Pid => "PID",
            Column::TimeInState => "Time in State (ms)",
            Column::OffloadState => "Offload State",
            Column::Template => "Template",
            Column::Unknown => "?",
        }
    }
}

/// Column layout taken from a netstat header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLayout {
    columns: Vec<Column>,
}

impl ConnectionLayout {
    const REQUIRED: [Column; 4] = [
        Column::Proto,
        Column::LocalAddress,
        Column::ForeignAddress,
        Column::State,
    ];

    /// Build the layout from a header line such as
    /// `Proto  Local Address          Foreign Address        State           PID`.
    pub fn from_header(line: &str) -> Result<Self> {
        let columns: Vec<Column> = HEADER_SPLIT
            .split(line.trim())
            .filter(|name| !name.is_empty())
            .map(|name| {
                let column = Column::from_header(name);
                if column == Column::Unknown {
                    debug!(column = name, "Ignoring unknown netstat column");
                }
                column
            })
            .collect();

        for required in Self::REQUIRED {
            if !columns.contains(&required) {
                return Err(Error::parse(
                    format!("header is missing the {:?} column", required.name()),
                    line,
                ));
            }
        }

        if columns[0] != Column::Proto {
            return Err(Error::parse("header must start with the Proto column", line));
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// UDP rows have no State value, so their layout drops that column.
    fn columns_for(&self, protocol: Protocol) -> Vec<Column> {
        match protocol {
            Protocol::Tcp => self.columns.clone(),
            Protocol::Udp => self
                .columns
                .iter()
                .copied()
                .filter(|c| *c != Column::State)
                .collect(),
        }
    }

    /// Parse one row. Fails with [`Error::Parse`] naming the line when the
    /// field count, protocol, state or any port does not fit the layout.
    pub fn parse_row(&self, line: &str) -> Result<ConnectionRecord> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            return Err(Error::parse("empty row", line));
        };
        let protocol: Protocol = first
            .parse()
            .map_err(|_| Error::parse(format!("unknown protocol {:?}", first), line))?;

        let columns = self.columns_for(protocol);
        let expected = columns.len();
        let template_last = columns.last() == Some(&Column::Template);

        if tokens.len() < expected || (tokens.len() > expected && !template_last) {
            return Err(Error::parse(
                format!(
                    "expected {} fields for a {} row, found {}",
                    expected,
                    protocol,
                    tokens.len()
                ),
                line,
            ));
        }

        let mut record = match protocol {
            Protocol::Tcp => ConnectionRecord::tcp("", 0, "", 0, TcpState::Closed),
            Protocol::Udp => ConnectionRecord::udp("", 0),
        };

        for (index, column) in columns.iter().enumerate() {
            let value = tokens[index];
            match column {
                Column::Proto | Column::Unknown => {}
                Column::LocalAddress => {
                    let (address, port) = split_endpoint(value).map_err(|e| at_line(e, line))?;
                    record.local_address = address;
                    record.local_port = port;
                }
                Column::ForeignAddress => {
                    let (address, port) = split_endpoint(value).map_err(|e| at_line(e, line))?;
                    record.foreign_address = address;
                    record.foreign_port = port;
                }
                Column::State => {
                    record.state = Some(value.parse().map_err(|e| at_line(e, line))?);
                }
                Column::Pid => {
                    record.pid = Some(value.parse().map_err(|_| {
                        Error::parse(format!("non-numeric PID {:?}", value), line)
                    })?);
                }
                Column::TimeInState => {
                    record.time_in_state_ms = Some(value.parse().map_err(|_| {
                        Error::parse(format!("non-numeric time in state {:?}", value), line)
                    })?);
                }
                Column::OffloadState => {
                    record.offload_state = Some(value.to_string());
                }
                Column::Template => {
                    record.template = Some(tokens[index..].join(" "));
                }
            }
        }

        Ok(record)
    }
}

/// Re-anchor a field-level parse error on the whole row.
fn at_line(error: Error, line: &str) -> Error {
    match error {
        Error::Parse { reason, .. } => Error::parse(reason, line),
        other => other,
    }
}

/// A non-row line following a row when netstat runs with `-b`.
enum Annotation<'a> {
    Executable(&'a str),
    Component(&'a str),
    Notice,
    Unrecognized,
}

impl<'a> Annotation<'a> {
    fn classify(line: &'a str) -> Self {
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            Annotation::Executable(name)
        } else if line == OWNERSHIP_NOTICE {
            Annotation::Notice
        } else if !line.contains(char::is_whitespace) {
            Annotation::Component(line)
        } else {
            Annotation::Unrecognized
        }
    }
}

fn starts_with_protocol(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|token| token.parse::<Protocol>().is_ok())
}

/// Parse a netstat connection listing into a [`ConnectionTable`].
///
/// `filter` keeps only rows of one protocol; `None` keeps all rows.
/// Fails when the header is absent or incomplete. Rows that do not fit the
/// header are skipped with a warning.
pub fn parse_connections(text: &str, filter: Option<Protocol>) -> Result<ConnectionTable> {
    let mut lines = text.lines();

    let header = lines
        .by_ref()
        .map(str::trim)
        .find(|line| line.starts_with("Proto"))
        .ok_or_else(|| {
            let first = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
            Error::parse("connection table header not found", first)
        })?;
    let layout = ConnectionLayout::from_header(header)?;

    let mut table = ConnectionTable::new();
    let mut pending: Option<ConnectionRecord> = None;
    let mut skipped = 0usize;

    let emit = |table: &mut ConnectionTable, record: Option<ConnectionRecord>| {
        if let Some(record) = record {
            if filter.map_or(true, |p| p == record.protocol) {
                table.push(record);
            }
        }
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if starts_with_protocol(line) {
            emit(&mut table, pending.take());
            match layout.parse_row(line) {
                Ok(record) => pending = Some(record),
                Err(e) => {
                    skipped += 1;
                    warn!(error = %e, "Skipping unparseable netstat row");
                }
            }
            continue;
        }

        match (Annotation::classify(line), pending.as_mut()) {
            (Annotation::Executable(name), Some(record)) => {
                record.executable = Some(name.to_string());
            }
            (Annotation::Component(name), Some(record)) => {
                record.component = Some(name.to_string());
            }
            (Annotation::Notice, _) => {}
            _ => {
                skipped += 1;
                warn!(line = line, "Skipping unrecognized netstat line");
            }
        }
    }
    emit(&mut table, pending.take());

    debug!(rows = table.len(), skipped = skipped, "Parsed netstat connections");
    Ok(table)
}

// ============================================================================
// Tests
// ============================================================================
