//! # podinit core
//!
//! Runtime preparation for containerised processes, run as the container
//! entrypoint before control is handed to the real command.
//!
//! ## Stages
//!
//! - **Ports**: when `NEED_PORTS` is set, free ports are discovered from the
//!   kernel connection tables, sampled, exported as `AUTO_PORT<n>` and
//!   published as annotations on the current pod.
//! - **Dependencies**: `--wait` endpoints (tcp/tcp4/tcp6/http/https) are
//!   probed concurrently until all answer or the timeout elapses.
//! - **Workload**: the wrapped command runs with the prepared environment,
//!   alongside optional log tailers.
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────┐   ┌──────────┐
//! │ /proc/net│──►│ allocator │──►│ AUTO_PORT│──►│ pod PATCH│
//! └──────────┘   └───────────┘   └──────────┘   └──────────┘
//!                                      │
//!                        ┌─────────────▼────────────┐
//!                        │ dependency gate (--wait) │
//!                        └─────────────┬────────────┘
//!                                      ▼
//!                          command + stdout/stderr tails
//! ```
//!
//! Library code never exits the process: every failure is returned as a
//! [`PodinitError`] and the binary maps its [`FailureClass`] to an exit code.

pub mod config;
pub mod entrypoint;
pub mod env;
pub mod errors;
pub mod k8s;
pub mod logging;
pub mod port;
pub mod runner;
pub mod wait;

pub use config::{CliArgs, EntrypointConfig};
pub use entrypoint::{PortPipeline, PortPipelineOptions};
pub use env::RuntimeEnv;
pub use errors::{AllocationError, FailureClass, PodinitError, Result};
pub use k8s::{ClusterReporter, PodIdentity};
pub use port::{PortAllocator, PortEnv, PortExporter, PortRange, PortScanner, PortSet};
pub use runner::{run_workload, CommandSpec, FollowMode, FollowOptions, TailSpec, TailTarget};
pub use wait::{DependencyGate, Endpoint, WaitOptions};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
