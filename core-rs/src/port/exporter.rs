//! Export allocated ports as `AUTO_PORT<index>` environment variables

use std::collections::BTreeMap;

use tracing::info;

use crate::env::set_env;

pub const PORT_ENV_PREFIX: &str = "AUTO_PORT";

/// Variable name to port value, e.g. `AUTO_PORT0 -> "20134"`
pub type PortEnv = BTreeMap<String, String>;

/// Writes allocated ports into the process environment
#[derive(Debug, Clone)]
pub struct PortExporter {
    prefix: String,
}

impl Default for PortExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl PortExporter {
    pub fn new() -> Self {
        Self::with_prefix(PORT_ENV_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        PortExporter {
            prefix: prefix.into(),
        }
    }

    /// Name/value pairs for `ports` without touching the environment
    pub fn format(&self, ports: &[u16]) -> PortEnv {
        ports
            .iter()
            .enumerate()
            .map(|(idx, port)| (format!("{}{}", self.prefix, idx), port.to_string()))
            .collect()
    }

    /// Set one variable per port and return the mapping
    pub fn export(&self, ports: &[u16]) -> PortEnv {
        let port_env = self.format(ports);
        for (name, value) in &port_env {
            set_env(name, value);
            info!(name = %name, port = %value, "Exported port");
        }
        port_env
    }
}
