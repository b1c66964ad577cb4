//! Startup stages composed by the `podinit` binary
//!
//! ```text
//! NEED_PORTS > 0 ?
//!     scan /proc/net ─► allocate ─► export AUTO_PORT<i> ─► PATCH pod annotations
//! --wait URIs ?
//!     dependency gate (all ready | timeout)
//! command / tailers
//! ```

use std::time::Duration;

use tracing::{info, warn};

use crate::env::RuntimeEnv;
use crate::errors::{PodinitError, Result};
use crate::k8s::{patch_url, ClusterReporter, PodIdentity};
use crate::port::{PortAllocator, PortEnv, PortExporter, PortRange, PortScanner};

/// Settings for the port pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortPipelineOptions {
    pub range: PortRange,
    /// Total PATCH attempts, at least one
    pub report_attempts: u32,
    /// Base delay between PATCH attempts, multiplied by the attempt number
    pub report_backoff: Duration,
}

impl Default for PortPipelineOptions {
    fn default() -> Self {
        PortPipelineOptions {
            range: PortRange::default(),
            report_attempts: 1,
            report_backoff: Duration::from_secs(1),
        }
    }
}

/// Scan, allocate, export and report
#[derive(Debug, Clone)]
pub struct PortPipeline {
    scanner: PortScanner,
    allocator: PortAllocator,
    exporter: PortExporter,
    options: PortPipelineOptions,
}

impl PortPipeline {
    pub fn new(options: PortPipelineOptions) -> Self {
        PortPipeline {
            scanner: PortScanner::new(),
            allocator: PortAllocator::new(),
            exporter: PortExporter::new(),
            options,
        }
    }

    pub fn with_scanner(mut self, scanner: PortScanner) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_exporter(mut self, exporter: PortExporter) -> Self {
        self.exporter = exporter;
        self
    }

    /// Run the pipeline for `env`
    ///
    /// Returns `None` when `NEED_PORTS` requests nothing. The pod identity and
    /// API server address are checked before any file or network I/O.
    ///
    /// # Errors
    ///
    /// - [`PodinitError::Configuration`] for missing identity
    /// - [`PodinitError::Scan`] for unreadable or malformed connection tables
    /// - [`PodinitError::Allocation`] when the range has no free port
    /// - [`PodinitError::ReportRejected`] / [`PodinitError::ReportTransport`] after the last attempt
    pub async fn run(&self, env: &RuntimeEnv) -> Result<Option<PortEnv>> {
        let Some(count) = env.need_ports else {
            return Ok(None);
        };

        let identity = PodIdentity::from_runtime_env(env);
        let server = env.api_server.clone().unwrap_or_default();
        patch_url(&server, &identity)?;

        let available = self.scanner.scan(&self.options.range)?.into_strict()?;
        let ports = self.allocator.allocate(&available, count)?;
        info!(ports = ?ports, "Get ports");

        let port_env = self.exporter.export(&ports);
        let reporter = ClusterReporter::new(identity);
        self.report_with_retry(&reporter, &server, &port_env).await?;

        Ok(Some(port_env))
    }

    async fn report_with_retry(
        &self,
        reporter: &ClusterReporter,
        server: &str,
        port_env: &PortEnv,
    ) -> Result<()> {
        let attempts = self.options.report_attempts.max(1);
        let mut attempt = 1;
        loop {
            match reporter.report(server, port_env).await {
                Ok(()) => return Ok(()),
                Err(e @ PodinitError::Configuration(_)) => return Err(e),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    let delay = self.options.report_backoff * attempt;
                    warn!(attempt, attempts, error = %e, delay = ?delay, "Report failed, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
