//! podinit - container entrypoint
//!
//! Ports, then dependencies, then the wrapped command. Each fatal stage
//! exits with the code of its failure class.

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use podinit_core::{
    logging, run_workload, CliArgs, DependencyGate, EntrypointConfig, PodinitError, PortPipeline,
    RuntimeEnv,
};

/// Log one diagnostic line for a failed stage and return its exit code
fn fail(stage: &str, err: &PodinitError) -> i32 {
    let code = err.exit_code();
    error!(stage, code, "{}", err);
    code
}

async fn run(args: CliArgs) -> i32 {
    let runtime = match RuntimeEnv::from_process() {
        Ok(runtime) => runtime,
        Err(e) => return fail("configuration", &e),
    };
    let config = EntrypointConfig::from_args(args, runtime);

    // validate --wait before touching ports or the network
    let gate = match DependencyGate::new(&config.wait_endpoints, config.wait) {
        Ok(gate) => gate,
        Err(e) => return fail("configuration", &e),
    };

    match PortPipeline::new(config.ports.clone()).run(&config.runtime).await {
        Ok(Some(port_env)) => info!(ports = ?port_env, "Ports exported"),
        Ok(None) => {}
        Err(e) => return fail("ports", &e),
    }

    if let Err(e) = gate.wait_all().await {
        return fail("wait", &e);
    }

    match run_workload(config.command.as_ref(), &config.tails, config.follow).await {
        Ok(code) => code,
        Err(e) => fail("command", &e),
    }
}

fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::init(args.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let code = runtime.block_on(run(args));
    std::process::exit(code);
}
