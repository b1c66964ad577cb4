/**
 * scanner.rs
 * Free-port discovery from kernel connection tables
 *
 * Each /proc/net table is a header line followed by one socket per line:
 *
 *   sl  local_address rem_address   st tx_queue rx_queue ...
 *    0: 0100007F:0CEA 00000000:0000 0A 00000000:00000000 ...
 *
 * The local port is the hex token after the second ':' (IPv6 addresses
 * carry no colons, so the same split works for the *6 tables).
 *
 * - Missing table: skipped (no IPv6, no raw sockets, ...)
 * - Unreadable table: whole scan fails
 * - Malformed line: recorded, scan continues
 */

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::range::PortRange;
use super::set::PortSet;
use crate::errors::{PodinitError, Result};

/// Kernel connection tables covering raw/tcp/udp/udplite on IPv4 and IPv6
pub const PROC_NET_SOURCES: [&str; 8] = [
    "/proc/net/raw",
    "/proc/net/raw6",
    "/proc/net/tcp",
    "/proc/net/tcp6",
    "/proc/net/udp",
    "/proc/net/udp6",
    "/proc/net/udplite",
    "/proc/net/udplite6",
];

/// Outcome of a completed scan
#[derive(Debug)]
pub struct ScanReport {
    /// Free ports inside the range, ascending
    pub free: Vec<u16>,
    /// Last malformed-line error seen, if any
    pub parse_error: Option<PodinitError>,
}

impl ScanReport {
    /// Free ports, failing if any line could not be parsed
    pub fn into_strict(self) -> Result<Vec<u16>> {
        match self.parse_error {
            Some(err) => Err(err),
            None => Ok(self.free),
        }
    }
}

/// Reads connection tables and computes the free ports of a range
#[derive(Debug, Clone)]
pub struct PortScanner {
    sources: Vec<PathBuf>,
}

impl Default for PortScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PortScanner {
    /// Scanner over the standard `/proc/net` tables
    pub fn new() -> Self {
        Self::with_sources(PROC_NET_SOURCES)
    }

    /// Scanner over arbitrary table files
    pub fn with_sources<I, P>(sources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        PortScanner {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Compute `range \ occupied` for the current table contents
    ///
    /// # Errors
    ///
    /// - [`PodinitError::Scan`] if a table exists but cannot be read
    pub fn scan(&self, range: &PortRange) -> Result<ScanReport> {
        let occupied = PortSet::new();
        let mut parse_error = None;

        for source in &self.sources {
            if let Some(err) = self.collect_source(source, &occupied)? {
                parse_error = Some(err);
            }
        }

        let free: Vec<u16> = range.iter().filter(|p| !occupied.contains(*p)).collect();
        debug!(
            range = %range,
            occupied = occupied.len(),
            free = free.len(),
            "Port scan finished"
        );

        Ok(ScanReport { free, parse_error })
    }

    /// Add the local ports of one table to `occupied`
    ///
    /// Returns the last parse error of this table.
    fn collect_source(&self, source: &Path, occupied: &PortSet) -> Result<Option<PodinitError>> {
        let content = match fs::read_to_string(source) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(source = %source.display(), "Connection table absent, skipping");
                return Ok(None);
            }
            Err(e) => {
                warn!(source = %source.display(), error = %e, "Get available ports failed");
                return Err(PodinitError::Scan(format!(
                    "can't open {} to check ports: {}",
                    source.display(),
                    e
                )));
            }
        };

        let mut last_error = None;
        for (idx, line) in content.lines().enumerate() {
            // header, and short trailing junk
            if idx == 0 || line.len() <= 3 {
                continue;
            }
            match parse_local_port(line) {
                Ok(port) => {
                    occupied.add(port);
                }
                Err(err) => {
                    warn!(source = %source.display(), line = idx + 1, error = %err, "Get available ports");
                    last_error = Some(err);
                }
            }
        }

        Ok(last_error)
    }
}

/// Extract the local port from one connection-table row
pub fn parse_local_port(line: &str) -> Result<u16> {
    let field = line
        .split(':')
        .nth(2)
        .ok_or_else(|| PodinitError::Scan(format!("parse port error: no local address in {:?}", line)))?;
    let hex = field.split(' ').next().unwrap_or_default();

    u16::from_str_radix(hex, 16)
        .map_err(|e| PodinitError::Scan(format!("parse port error: {:?}: {}", hex, e)))
}
