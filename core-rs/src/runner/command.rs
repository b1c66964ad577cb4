//! Wrapped command execution with signal forwarding

use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{PodinitError, Result};

/// Program and arguments to hand control to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Split a `[program, args...]` vector, `None` when empty
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(CommandSpec {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

/// Run the command to completion and return its exit code
///
/// The child inherits stdio and the current environment (including exported
/// ports). SIGINT and SIGTERM received by this process are forwarded to it.
///
/// # Errors
///
/// - [`PodinitError::Command`] if the program cannot be started
pub async fn run_command(spec: &CommandSpec) -> Result<i32> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .spawn()
        .map_err(|e| PodinitError::Command(format!("failed to start {}: {}", spec.program, e)))?;

    info!(program = %spec.program, pid = ?child.id(), "Started command");

    let status = wait_forwarding_signals(&mut child).await?;
    let code = exit_code(status);
    info!(program = %spec.program, code, "Command exited");
    Ok(code)
}

#[cfg(unix)]
async fn wait_forwarding_signals(child: &mut tokio::process::Child) -> Result<ExitStatus> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        let forwarded = tokio::select! {
            status = child.wait() => return Ok(status?),
            _ = interrupt.recv() => Signal::SIGINT,
            _ = terminate.recv() => Signal::SIGTERM,
        };

        if let Some(pid) = child.id() {
            debug!(pid, signal = ?forwarded, "Forwarding signal");
            // child may already be gone
            let _ = kill(Pid::from_raw(pid as i32), forwarded);
        }
    }
}

#[cfg(not(unix))]
async fn wait_forwarding_signals(child: &mut tokio::process::Child) -> Result<ExitStatus> {
    Ok(child.wait().await?)
}

/// Exit code of a finished child, `128 + signal` when it was killed
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}
