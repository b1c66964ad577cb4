//! Dependency endpoints and single probe attempts

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use tokio::net::{lookup_host, TcpStream};

use crate::errors::PodinitError;

/// Address family restriction for TCP endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpFamily {
    Any,
    V4,
    V6,
}

impl TcpFamily {
    fn accepts(self, addr: &SocketAddr) -> bool {
        match self {
            TcpFamily::Any => true,
            TcpFamily::V4 => addr.is_ipv4(),
            TcpFamily::V6 => addr.is_ipv6(),
        }
    }
}

/// How an endpoint is probed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeKind {
    /// Dial `host:port`
    Tcp { family: TcpFamily, target: String },
    /// GET until a 2xx response
    Http { url: Url },
}

/// A `--wait` target such as `tcp://db:5432` or `http://web:8000/health`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    kind: ProbeKind,
}

impl Endpoint {
    /// The URI as given on the command line
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> &ProbeKind {
        &self.kind
    }

    /// Dial a TCP endpoint once, bounded by `attempt_timeout`
    ///
    /// Returns `false` for HTTP endpoints.
    pub async fn dial(&self, attempt_timeout: Duration) -> bool {
        let ProbeKind::Tcp { family, target } = &self.kind else {
            return false;
        };
        tokio::time::timeout(attempt_timeout, dial_family(*family, target))
            .await
            .map(|res| res.is_ok())
            .unwrap_or(false)
    }

    /// Perform one probe attempt
    pub async fn probe(&self, client: &reqwest::Client, attempt_timeout: Duration) -> bool {
        match &self.kind {
            ProbeKind::Tcp { .. } => self.dial(attempt_timeout).await,
            ProbeKind::Http { url } => match client.get(url.clone()).send().await {
                Ok(response) => {
                    let ok = response.status().is_success();
                    if ok {
                        tracing::info!(
                            endpoint = %self.raw,
                            status = response.status().as_u16(),
                            "Received success status"
                        );
                    }
                    ok
                }
                Err(_) => false,
            },
        }
    }
}

async fn dial_family(family: TcpFamily, target: &str) -> std::io::Result<TcpStream> {
    let mut last_err = None;
    for addr in lookup_host(target).await?.filter(|a| family.accepts(a)) {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            format!("no {:?} address for {}", family, target),
        )
    }))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for Endpoint {
    type Err = PodinitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(s).map_err(|e| {
            PodinitError::Configuration(format!("bad hostname provided: {}. {}", s, e))
        })?;

        let family = match url.scheme() {
            "tcp" => TcpFamily::Any,
            "tcp4" => TcpFamily::V4,
            "tcp6" => TcpFamily::V6,
            "http" | "https" => {
                return Ok(Endpoint {
                    raw: s.to_string(),
                    kind: ProbeKind::Http { url },
                })
            }
            other => {
                return Err(PodinitError::Configuration(format!(
                    "invalid host protocol provided: {}. supported protocols are: tcp, tcp4, tcp6, http and https",
                    other
                )))
            }
        };

        let host = url.host_str().filter(|h| !h.is_empty()).ok_or_else(|| {
            PodinitError::Configuration(format!("bad hostname provided: {}. missing host", s))
        })?;
        let port = url.port().ok_or_else(|| {
            PodinitError::Configuration(format!("bad hostname provided: {}. missing port", s))
        })?;

        Ok(Endpoint {
            raw: s.to_string(),
            kind: ProbeKind::Tcp {
                family,
                target: format!("{}:{}", host, port),
            },
        })
    }
}
