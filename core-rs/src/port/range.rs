/**
 * range.rs
 * Closed interval of allocatable ports
 *
 * Default universe: [20000, 20999]
 * Parsed from "start-end", e.g. PORT_RANGE=30000-30499
 */

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::errors::PodinitError;

pub const DEFAULT_PORT_RANGE_START: u16 = 20000;
pub const DEFAULT_PORT_RANGE_END: u16 = 20999;

/// Closed port interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: u16, end: u16) -> Result<Self, PodinitError> {
        if start > end {
            return Err(PodinitError::Configuration(format!(
                "invalid port range {}-{}: start is greater than end",
                start, end
            )));
        }
        Ok(PortRange { start, end })
    }

    /// Check if port is within this range
    pub fn contains(&self, port: u16) -> bool {
        port >= self.start && port <= self.end
    }

    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }

    /// Number of ports in the range
    pub fn port_count(&self) -> usize {
        usize::from(self.end - self.start) + 1
    }
}

impl Default for PortRange {
    fn default() -> Self {
        PortRange {
            start: DEFAULT_PORT_RANGE_START,
            end: DEFAULT_PORT_RANGE_END,
        }
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PortRange {
    type Err = PodinitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s.trim().split_once('-').ok_or_else(|| {
            PodinitError::Configuration(format!("bad port range {:?}, expected \"start-end\"", s))
        })?;

        let parse = |part: &str| {
            part.trim().parse::<u16>().map_err(|e| {
                PodinitError::Configuration(format!("bad port {:?} in range {:?}: {}", part, s, e))
            })
        };

        PortRange::new(parse(start)?, parse(end)?)
    }
}
