mod args;
mod cmd;
mod cmd_runner;
mod config;
mod dir;
mod environment;
mod git;
mod interrupt;
mod log;
mod one_password;
mod policy;
mod preflight;
mod run;
mod secrets;
mod workspace;

use std::process::ExitCode;

use args::CliArgs;
use clap::Parser as _;
use tracing::{error, warn};

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        // usage errors exit with 1 like every other failure
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
        Err(e) => e.exit(),
    };
    log::init(args.log_verbosity);
    if let Err(e) = interrupt::install() {
        warn!("{e:#}");
    }
    let outcome = environment::HostEnv::from_process()
        .and_then(|host| run::run_terraform(&args, &host, &cmd::SystemExecutor));
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
