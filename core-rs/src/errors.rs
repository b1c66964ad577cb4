//! Error types for podinit

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodinitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Port scan error: {0}")]
    Scan(String),

    #[error("Allocation error: {0}")]
    Allocation(AllocationError),

    #[error("Report rejected by control plane: HTTP {status}")]
    ReportRejected { status: u16 },

    #[error("Report transport error: {0}")]
    ReportTransport(String),

    #[error("Timeout after {timeout:?} waiting on dependencies to become available: {endpoints:?}")]
    Timeout {
        timeout: Duration,
        endpoints: Vec<String>,
    },

    #[error("Command error: {0}")]
    Command(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reasons port allocation can fail
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocationError {
    #[error("no free ports left in the configured range")]
    EmptyPool,
}

impl From<AllocationError> for PodinitError {
    fn from(err: AllocationError) -> Self {
        PodinitError::Allocation(err)
    }
}

/// Failure classes that the entrypoint maps to distinct exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    Configuration,
    PortDiscovery,
    Report,
    DependencyTimeout,
    CommandStart,
    Other,
}

impl FailureClass {
    /// Stable process exit code for this class
    pub fn exit_code(self) -> i32 {
        match self {
            FailureClass::Configuration => 2,
            FailureClass::PortDiscovery => 5,
            FailureClass::Report => 6,
            FailureClass::DependencyTimeout => 7,
            FailureClass::CommandStart => 127,
            FailureClass::Other => 1,
        }
    }
}

impl PodinitError {
    pub fn failure_class(&self) -> FailureClass {
        match self {
            PodinitError::Configuration(_) => FailureClass::Configuration,
            PodinitError::Scan(_) | PodinitError::Allocation(_) => FailureClass::PortDiscovery,
            PodinitError::ReportRejected { .. } | PodinitError::ReportTransport(_) => {
                FailureClass::Report
            }
            PodinitError::Timeout { .. } => FailureClass::DependencyTimeout,
            PodinitError::Command(_) => FailureClass::CommandStart,
            PodinitError::TaskFailed(_) | PodinitError::Io(_) | PodinitError::Json(_) => {
                FailureClass::Other
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.failure_class().exit_code()
    }
}

pub type Result<T> = std::result::Result<T, PodinitError>;
