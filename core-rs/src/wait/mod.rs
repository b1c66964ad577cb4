//! Startup barrier on external dependencies

pub mod endpoint;
pub mod gate;

pub use endpoint::{Endpoint, ProbeKind, TcpFamily};
pub use gate::{DependencyGate, WaitOptions, DEFAULT_RETRY_INTERVAL, DEFAULT_WAIT_TIMEOUT};
