/**
 * port module
 * Ephemeral port discovery, allocation and export
 */

pub mod allocator;
pub mod exporter;
pub mod range;
pub mod scanner;
pub mod set;

pub use allocator::PortAllocator;
pub use exporter::{PortEnv, PortExporter, PORT_ENV_PREFIX};
pub use range::PortRange;
pub use scanner::{PortScanner, ScanReport, PROC_NET_SOURCES};
pub use set::PortSet;
