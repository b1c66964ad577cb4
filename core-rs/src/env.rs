//! Process environment access
//!
//! The environment is read once into a [`RuntimeEnv`] value which is then
//! passed explicitly between stages. The only writer is the port exporter.

use crate::errors::{PodinitError, Result};

/// Number of ports to allocate
pub const NEED_PORTS: &str = "NEED_PORTS";
/// Control-plane address (host:port)
pub const K8S_API_SERVER_ADDR: &str = "K8S_API_SERVER_ADDR";
pub const MY_POD_NAMESPACE: &str = "MY_POD_NAMESPACE";
pub const MY_POD_NAME: &str = "MY_POD_NAME";

/// Read an environment variable, treating an empty value as absent
pub fn get_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Set an environment variable for this process and its descendants
pub fn set_env(name: &str, value: &str) {
    std::env::set_var(name, value);
}

/// Snapshot of the environment values podinit consumes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnv {
    /// Ports requested through `NEED_PORTS`, `None` when the pipeline is skipped
    pub need_ports: Option<usize>,
    pub api_server: Option<String>,
    pub pod_namespace: Option<String>,
    pub pod_name: Option<String>,
}

impl RuntimeEnv {
    /// Read the runtime environment of the current process
    pub fn from_process() -> Result<Self> {
        Self::from_lookup(get_env)
    }

    /// Build from an arbitrary lookup function
    ///
    /// # Example
    ///
    /// ```
    /// use podinit_core::env::RuntimeEnv;
    ///
    /// let env = RuntimeEnv::from_lookup(|name| match name {
    ///     "NEED_PORTS" => Some("2".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(env.need_ports, Some(2));
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let need_ports = match non_empty(NEED_PORTS) {
            Some(raw) => parse_need_ports(&raw)?,
            None => None,
        };

        Ok(Self {
            need_ports,
            api_server: non_empty(K8S_API_SERVER_ADDR),
            pod_namespace: non_empty(MY_POD_NAMESPACE),
            pod_name: non_empty(MY_POD_NAME),
        })
    }
}

/// Non-positive counts disable the port pipeline.
fn parse_need_ports(raw: &str) -> Result<Option<usize>> {
    let count: i64 = raw.trim().parse().map_err(|e| {
        PodinitError::Configuration(format!("can't parse ${}={:?}: {}", NEED_PORTS, raw, e))
    })?;

    if count <= 0 {
        return Ok(None);
    }

    usize::try_from(count)
        .map(Some)
        .map_err(|e| PodinitError::Configuration(format!("${} out of range: {}", NEED_PORTS, e)))
}
