// Port Scan Contract Tests
//
// Invariants of the scan -> allocate -> export chain that consumers
// (wrapped commands reading AUTO_PORT<n>, pod annotations) depend on.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use podinit_core::errors::AllocationError;
use podinit_core::{PortAllocator, PortExporter, PortRange, PortScanner};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

/// Random tcp/udp-shaped table with ports clustered around the range
fn synthetic_table(rng: &mut StdRng, rows: usize, v6: bool) -> String {
    let mut table = format!("{}\n", HEADER);
    for sl in 0..rows {
        let port: u16 = if rng.gen_bool(0.7) {
            rng.gen_range(19990..=21010)
        } else {
            rng.gen()
        };
        let local_ip = if v6 {
            "0000000000000000FFFF00000100007F"
        } else {
            "0100007F"
        };
        table.push_str(&format!(
            "{:>4}: {}:{:04X} {}:{:04X} 0A 00000000:00000000 00:00000000 00000000  1000        0 {} 1\n",
            sl,
            local_ip,
            port,
            local_ip,
            rng.gen::<u16>(),
            rng.gen::<u32>()
        ));
    }
    table
}

/// Independent reading of a table: second whitespace column, text after the last ':'
fn reference_ports(table: &str) -> HashSet<u16> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|local| local.rsplit_once(':'))
        .map(|(_, hex)| u16::from_str_radix(hex, 16).unwrap())
        .collect()
}

/// Free ports equal `range \ observed` for every synthetic input
#[test]
fn scan_result_is_range_minus_observed() {
    let range = PortRange::new(20000, 20999).unwrap();

    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let dir = TempDir::new().unwrap();

        let mut observed = HashSet::new();
        let mut sources: Vec<PathBuf> = Vec::new();
        for (name, v6) in [("tcp", false), ("tcp6", true), ("udp", false), ("udp6", true)] {
            let rows = rng.gen_range(0..300);
            let table = synthetic_table(&mut rng, rows, v6);
            observed.extend(reference_ports(&table));

            let path = dir.path().join(name);
            fs::write(&path, table).unwrap();
            sources.push(path);
        }

        let report = PortScanner::with_sources(sources).scan(&range).unwrap();
        let expected: Vec<u16> = range.iter().filter(|p| !observed.contains(p)).collect();

        assert!(report.parse_error.is_none(), "seed {}", seed);
        assert_eq!(report.free, expected, "seed {}", seed);
    }
}

/// Output is ascending and stays inside the range
#[test]
fn scan_result_is_sorted_and_bounded() {
    let mut rng = StdRng::seed_from_u64(99);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tcp");
    fs::write(&path, synthetic_table(&mut rng, 500, false)).unwrap();

    let range = PortRange::new(20100, 20300).unwrap();
    let free = PortScanner::with_sources([path]).scan(&range).unwrap().free;

    assert!(free.windows(2).all(|w| w[0] < w[1]));
    assert!(free.iter().all(|p| range.contains(*p)));
}

/// Two scans of an unchanged table agree
#[test]
fn scan_is_idempotent_on_frozen_tables() {
    let mut rng = StdRng::seed_from_u64(7);
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("udp");
    fs::write(&path, synthetic_table(&mut rng, 200, false)).unwrap();

    let scanner = PortScanner::with_sources([path, dir.path().join("udplite6")]);
    let range = PortRange::default();

    let first = scanner.scan(&range).unwrap().free;
    let second = scanner.scan(&range).unwrap().free;
    assert_eq!(first, second);
}

/// Absent tables never fail a scan
#[test]
fn missing_sources_are_not_errors() {
    let dir = TempDir::new().unwrap();
    let scanner = PortScanner::with_sources([dir.path().join("raw"), dir.path().join("raw6")]);

    let report = scanner.scan(&PortRange::new(20000, 20009).unwrap()).unwrap();
    assert_eq!(report.free.len(), 10);
    assert!(report.parse_error.is_none());
}

/// Malformed hex yields a parse error alongside a usable result
#[test]
fn malformed_hex_keeps_result_usable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tcp");
    fs::write(
        &path,
        format!(
            "{}\n   0: 0100007F:4E21 00000000:0000 0A\n   1: 0100007F:NOPE 00000000:0000 0A\n",
            HEADER
        ),
    )
    .unwrap();

    let report = PortScanner::with_sources([path])
        .scan(&PortRange::new(20000, 20002).unwrap())
        .unwrap();

    assert!(report.parse_error.is_some());
    assert_eq!(report.free, vec![20000, 20002]);
}

/// Zero draws is empty; any draw from an empty pool is EmptyPool
#[test]
fn allocation_pool_contract() {
    let allocator = PortAllocator::new();
    assert!(allocator.allocate(&[20000, 20001], 0).unwrap().is_empty());

    for count in 1..10 {
        assert_eq!(allocator.allocate(&[], count), Err(AllocationError::EmptyPool));
    }
}

/// Export produces exactly one AUTO_PORT<i> per allocated port
#[test]
fn export_naming_contract() {
    let port_env = PortExporter::new().format(&[8080, 9090]);

    let expected: BTreeMap<String, String> = BTreeMap::from([
        ("AUTO_PORT0".to_string(), "8080".to_string()),
        ("AUTO_PORT1".to_string(), "9090".to_string()),
    ]);
    assert_eq!(port_env, expected);
}
