//! Inclusive port ranges and free-port selection.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest port handed out by default (below it are the well-known ports).
pub const DEFAULT_LOW_PORT: u16 = 1024;
/// Highest port handed out by default (above it is the dynamic range).
pub const DEFAULT_HIGH_PORT: u16 = 49150;

/// An inclusive range of ports, `low <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange")]
pub struct PortRange {
    low: u16,
    high: u16,
}

#[derive(Deserialize)]
struct RawRange {
    low: u16,
    high: u16,
}

impl TryFrom<RawRange> for PortRange {
    type Error = Error;

    fn try_from(raw: RawRange) -> Result<Self> {
        PortRange::new(raw.low, raw.high)
    }
}

impl PortRange {
    /// Create a range. Fails when `low > high`.
    pub fn new(low: u16, high: u16) -> Result<Self> {
        if low > high {
            return Err(Error::invalid(format!(
                "port range start {} is above its end {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn contains(&self, port: u16) -> bool {
        (self.low..=self.high).contains(&port)
    }

    pub fn iter(&self) -> std::ops::RangeInclusive<u16> {
        self.low..=self.high
    }

    /// The smallest port in the range that is not in `occupied`.
    pub fn lowest_free(&self, occupied: &BTreeSet<u16>) -> Result<u16> {
        self.iter()
            .find(|port| !occupied.contains(port))
            .ok_or(Error::NoFreePort {
                low: self.low,
                high: self.high,
            })
    }

    /// Every port in the range that is not in `occupied`, ascending.
    pub fn free_ports(&self, occupied: &BTreeSet<u16>) -> Vec<u16> {
        self.iter().filter(|port| !occupied.contains(port)).collect()
    }

    /// The smallest free port among `candidates`, falling back to the lowest
    /// free port of the range when none of them is free. Candidates outside
    /// the range, and port 0, never qualify.
    pub fn preferred_free(&self, candidates: &[u16], occupied: &BTreeSet<u16>) -> Result<u16> {
        candidates
            .iter()
            .copied()
            .filter(|port| *port != 0 && self.contains(*port) && !occupied.contains(port))
            .min()
            .map_or_else(|| self.lowest_free(occupied), Ok)
    }
}

/// The smallest port in `low..=high` that is not in `occupied`.
///
/// ```
/// use std::collections::BTreeSet;
/// use wincmd_core::domain::lowest_free_port;
///
/// let occupied = BTreeSet::from([5000, 5001]);
/// assert_eq!(lowest_free_port(&occupied, 5000, 5002).unwrap(), 5002);
/// ```
pub fn lowest_free_port(occupied: &BTreeSet<u16>, low: u16, high: u16) -> Result<u16> {
    PortRange::new(low, high)?.lowest_free(occupied)
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_PORT,
            high: DEFAULT_HIGH_PORT,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Parses `"5000-5002"` or a single port `"5000"`.
impl FromStr for PortRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::invalid(format!("invalid port {:?}", value.trim())))
        };
        match s.split_once('-') {
            Some((low, high)) => PortRange::new(parse(low)?, parse(high)?),
            None => {
                let port = parse(s)?;
                PortRange::new(port, port)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowest_free() {
        let range = PortRange::new(5000, 5002).unwrap();

        let occupied = BTreeSet::from([5000, 5001]);
        assert_eq!(range.lowest_free(&occupied).unwrap(), 5002);

        let occupied = BTreeSet::from([5000, 5001, 5002]);
        assert!(matches!(
            range.lowest_free(&occupied),
            Err(Error::NoFreePort { low: 5000, high: 5002 })
        ));
    }

    #[test]
    fn test_lowest_free_port_function() {
        let occupied = BTreeSet::from([5000, 5001, 5002]);
        assert!(matches!(
            lowest_free_port(&occupied, 5000, 5002),
            Err(Error::NoFreePort { .. })
        ));
        assert!(matches!(
            lowest_free_port(&occupied, 6000, 5000),
            Err(Error::InvalidParameter(_))
        ));
        assert_eq!(lowest_free_port(&BTreeSet::new(), 7, 7).unwrap(), 7);
    }

    #[test]
    fn test_ports_outside_range_do_not_matter() {
        let range = PortRange::new(5000, 5002).unwrap();
        let occupied = BTreeSet::from([4999, 5003]);
        assert_eq!(range.lowest_free(&occupied).unwrap(), 5000);
    }

    #[test]
    fn test_full_u16_range() {
        let range = PortRange::new(65534, 65535).unwrap();
        let occupied = BTreeSet::from([65534]);
        assert_eq!(range.lowest_free(&occupied).unwrap(), 65535);
        assert_eq!(range.free_ports(&occupied), vec![65535]);
    }

    #[test]
    fn test_inverted_range_rejected() {
        assert!(matches!(
            PortRange::new(10, 5),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_preferred_free() {
        let range = PortRange::default();
        let occupied = BTreeSet::from([1024, 8080]);

        assert_eq!(range.preferred_free(&[8081, 8080], &occupied).unwrap(), 8081);
        assert_eq!(range.preferred_free(&[8080], &occupied).unwrap(), 1025);
        assert_eq!(range.preferred_free(&[], &occupied).unwrap(), 1025);
    }

    #[test]
    fn test_preferred_free_ignores_candidates_outside_range() {
        let range = PortRange::default();
        let occupied = BTreeSet::from([1024]);

        assert_eq!(range.preferred_free(&[80], &occupied).unwrap(), 1025);
        assert_eq!(range.preferred_free(&[60000], &occupied).unwrap(), 1025);
        assert_eq!(range.preferred_free(&[60000, 3000], &occupied).unwrap(), 3000);
    }

    #[test]
    fn test_preferred_free_never_returns_port_zero() {
        assert_eq!(
            PortRange::default().preferred_free(&[0], &BTreeSet::new()).unwrap(),
            DEFAULT_LOW_PORT
        );

        let from_zero = PortRange::new(0, 2).unwrap();
        assert_eq!(from_zero.preferred_free(&[0, 2], &BTreeSet::new()).unwrap(), 2);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("5000-5002".parse::<PortRange>().unwrap(), PortRange::new(5000, 5002).unwrap());
        assert_eq!("8080".parse::<PortRange>().unwrap(), PortRange::new(8080, 8080).unwrap());
        assert!("9-1".parse::<PortRange>().is_err());
        assert!("a-b".parse::<PortRange>().is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: PortRange = serde_json::from_str(r#"{"low":1,"high":2}"#).unwrap();
        assert_eq!(ok.high(), 2);
        assert!(serde_json::from_str::<PortRange>(r#"{"low":3,"high":2}"#).is_err());
    }
}
