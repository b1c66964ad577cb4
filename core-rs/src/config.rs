//! Command-line configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::entrypoint::PortPipelineOptions;
use crate::env::RuntimeEnv;
use crate::port::PortRange;
use crate::runner::{CommandSpec, FollowMode, FollowOptions, TailSpec, TailTarget};
use crate::wait::WaitOptions;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "podinit",
    version,
    about = "Utility to simplify running applications in containers",
    long_about = "Allocates free ports into AUTO_PORT<n> (when NEED_PORTS is set), annotates the pod with them, \
                  waits for dependencies, then runs the command and tails log files.\n\n\
                  Example:\n  podinit --wait tcp://db:5432 --stdout /var/log/nginx/access.log nginx -g 'daemon off;'",
    arg_required_else_help = true
)]
pub struct CliArgs {
    #[arg(
        long = "wait",
        value_name = "URI",
        help = "Host (tcp/tcp4/tcp6/http/https) to wait for before the command starts. Can be passed multiple times. e.g. tcp://db:5432"
    )]
    pub wait: Vec<String>,

    #[arg(
        long,
        default_value = "10s",
        value_parser = parse_duration,
        help = "Host wait timeout"
    )]
    pub timeout: Duration,

    #[arg(
        long,
        default_value = "1s",
        value_parser = parse_duration,
        help = "Delay between attempts on one waited host"
    )]
    pub wait_retry_interval: Duration,

    #[arg(
        long,
        env = "PORT_RANGE",
        default_value = "20000-20999",
        help = "Range ports are allocated from, as start-end"
    )]
    pub port_range: PortRange,

    #[arg(
        long,
        default_value_t = 1,
        help = "PATCH attempts when reporting ports to the API server"
    )]
    pub report_attempts: u32,

    #[arg(
        long,
        default_value = "1s",
        value_parser = parse_duration,
        help = "Base delay between report attempts"
    )]
    pub report_backoff: Duration,

    #[arg(
        long = "stdout",
        value_name = "FILE",
        help = "Tails a file to stdout. Can be passed multiple times"
    )]
    pub stdout_tail: Vec<PathBuf>,

    #[arg(
        long = "stderr",
        value_name = "FILE",
        help = "Tails a file to stderr. Can be passed multiple times"
    )]
    pub stderr_tail: Vec<PathBuf>,

    #[arg(long, help = "Tail files by polling instead of filesystem events")]
    pub poll: bool,

    #[arg(
        long,
        default_value = "250ms",
        value_parser = parse_duration,
        help = "Poll interval of file tailers"
    )]
    pub poll_interval: Duration,

    #[arg(long, short = 'v', help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        help = "Command to be executed"
    )]
    pub command: Vec<String>,
}

/// Parse `500ms`, `10s`, `2m`, `1h`; a bare number is seconds
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration {:?}", raw))?;

    let scale = match unit {
        "ms" => return Ok(Duration::from_millis(value)),
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        other => {
            return Err(format!(
                "invalid duration unit {:?} in {:?}, expected ms, s, m or h",
                other, raw
            ))
        }
    };
    value
        .checked_mul(scale)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration {:?} is too large", raw))
}

/// Everything the entrypoint needs for one run
#[derive(Debug, Clone)]
pub struct EntrypointConfig {
    pub runtime: RuntimeEnv,
    pub ports: PortPipelineOptions,
    pub wait_endpoints: Vec<String>,
    pub wait: WaitOptions,
    pub tails: Vec<TailSpec>,
    pub follow: FollowOptions,
    pub command: Option<CommandSpec>,
}

impl EntrypointConfig {
    pub fn from_args(args: CliArgs, runtime: RuntimeEnv) -> Self {
        let tails = args
            .stdout_tail
            .into_iter()
            .map(|path| TailSpec {
                path,
                target: TailTarget::Stdout,
            })
            .chain(args.stderr_tail.into_iter().map(|path| TailSpec {
                path,
                target: TailTarget::Stderr,
            }))
            .collect();

        EntrypointConfig {
            runtime,
            ports: PortPipelineOptions {
                range: args.port_range,
                report_attempts: args.report_attempts,
                report_backoff: args.report_backoff,
            },
            wait_endpoints: args.wait,
            wait: WaitOptions {
                timeout: args.timeout,
                retry_interval: args.wait_retry_interval,
            },
            tails,
            follow: FollowOptions {
                mode: if args.poll {
                    FollowMode::Poll
                } else {
                    FollowMode::Events
                },
                poll_interval: args.poll_interval,
            },
            command: CommandSpec::from_argv(&args.command),
        }
    }
}
