//! Wrapped command and log tailers, started once the gates are open

pub mod command;
pub mod tail;

pub use command::{exit_code, run_command, CommandSpec};
pub use tail::{FollowMode, FollowOptions, TailSpec, TailTarget, Tailer, DEFAULT_POLL_INTERVAL};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::Result;

/// Run the command alongside the tailers
///
/// With a command, returns its exit code once it exits and the tailers have
/// stopped. Without one, tailers run until Ctrl-C and the result is 0.
pub async fn run_workload(
    command: Option<&CommandSpec>,
    tails: &[TailSpec],
    follow: FollowOptions,
) -> Result<i32> {
    let cancel = CancellationToken::new();
    let mut tailers = JoinSet::new();
    for spec in tails {
        let tailer = Tailer::new(spec.clone(), follow);
        let path = spec.path.clone();
        let token = cancel.child_token();
        tailers.spawn(async move {
            if let Err(e) = tailer.run(token).await {
                warn!(path = %path.display(), error = %e, "Tailer stopped");
            }
        });
    }

    let code = match command {
        Some(spec) => run_command(spec).await,
        None if tails.is_empty() => Ok(0),
        None => {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Unable to listen for Ctrl-C");
            }
            info!("Interrupted, stopping tailers");
            Ok(0)
        }
    };

    cancel.cancel();
    while tailers.join_next().await.is_some() {}

    code
}
