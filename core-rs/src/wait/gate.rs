//! Dependency readiness gate
//!
//! One probe task per endpoint, all joined under a single global timeout.
//! Probes retry with an explicit interval and stop as soon as the gate's
//! cancellation token fires (timeout, success of the join, or caller cancel).

use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::endpoint::Endpoint;
use crate::errors::{PodinitError, Result};

pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Timing knobs for the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Global deadline for all endpoints, also the per-attempt bound
    pub timeout: Duration,
    /// Delay between failed attempts on one endpoint
    pub retry_interval: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            timeout: DEFAULT_WAIT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Blocks until every endpoint answers or the timeout elapses
#[derive(Debug, Clone)]
pub struct DependencyGate {
    endpoints: Vec<Endpoint>,
    options: WaitOptions,
    client: reqwest::Client,
}

impl DependencyGate {
    /// Parse every endpoint up front
    ///
    /// # Errors
    ///
    /// - [`PodinitError::Configuration`] for the first malformed URI or unsupported scheme
    pub fn new<S: AsRef<str>>(endpoints: &[S], options: WaitOptions) -> Result<Self> {
        let endpoints = endpoints
            .iter()
            .map(|e| e.as_ref().parse::<Endpoint>())
            .collect::<Result<Vec<_>>>()?;

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| PodinitError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(DependencyGate {
            endpoints,
            options,
            client,
        })
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn options(&self) -> WaitOptions {
        self.options
    }

    /// Wait for all endpoints with a fresh cancellation token
    pub async fn wait_all(&self) -> Result<()> {
        self.wait_all_with_cancel(CancellationToken::new()).await
    }

    /// Wait for all endpoints; cancelling `cancel` abandons the wait
    ///
    /// # Errors
    ///
    /// - [`PodinitError::Timeout`] listing every requested endpoint
    /// - [`PodinitError::TaskFailed`] if a probe task panicked or the wait was cancelled
    pub async fn wait_all_with_cancel(&self, cancel: CancellationToken) -> Result<()> {
        if self.endpoints.is_empty() {
            return Ok(());
        }

        let probes_cancel = cancel.child_token();
        let mut probes = JoinSet::new();
        for endpoint in &self.endpoints {
            info!(endpoint = %endpoint, "Waiting for host");
            probes.spawn(probe_until_ready(
                endpoint.clone(),
                self.client.clone(),
                self.options,
                probes_cancel.child_token(),
            ));
        }

        let all_ready = async {
            while let Some(joined) = probes.join_next().await {
                match joined {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(PodinitError::TaskFailed("dependency wait cancelled".to_string()))
                    }
                    Err(e) => return Err(PodinitError::TaskFailed(e.to_string())),
                }
            }
            Ok(())
        };

        let outcome = tokio::time::timeout(self.options.timeout, all_ready).await;
        probes_cancel.cancel();

        match outcome {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.options.timeout, "Timed out waiting on dependencies");
                Err(PodinitError::Timeout {
                    timeout: self.options.timeout,
                    endpoints: self.endpoints.iter().map(|e| e.as_str().to_string()).collect(),
                })
            }
        }
    }
}

/// Probe until success (`true`) or cancellation (`false`)
async fn probe_until_ready(
    endpoint: Endpoint,
    client: reqwest::Client,
    options: WaitOptions,
    cancel: CancellationToken,
) -> bool {
    let mut attempt: u64 = 0;
    loop {
        attempt += 1;
        let ready = tokio::select! {
            _ = cancel.cancelled() => return false,
            ready = endpoint.probe(&client, options.timeout) => ready,
        };

        if ready {
            info!(endpoint = %endpoint, attempt, "Connected");
            return true;
        }
        debug!(endpoint = %endpoint, attempt, "Not ready, retrying");

        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(options.retry_interval) => {}
        }
    }
}
