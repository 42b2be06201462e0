use clap::Parser;
use log::{error, info};

use hsa_patcher::cli::{Args, Cmd};
use hsa_patcher::logging;
use hsa_patcher::patch::{runners, wizard};

fn main() {
    let args = Args::parse();

    let log_path = match logging::init(args.verbose) {
        Ok(path) => Some(path),
        Err(e) => {
            eprintln!("Warning: diagnostic log unavailable: {e:#}");
            None
        }
    };
    info!("hsa-patcher {} starting: {args:?}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create Tokio runtime: {e}");
            eprintln!("FATAL: Failed to create Tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    let command = args.command();
    let code = match command {
        Cmd::Patch => rt.block_on(runners::run_patch(&args, log_path)),
        Cmd::Locate => runners::run_locate(&args, log_path),
        Cmd::Channels => runners::run_channels(&args, log_path),
    };
    info!("Exiting with status {code}");

    if command == Cmd::Patch && args.interactive() && !args.no_pause {
        wizard::pause_for_exit();
    }

    std::process::exit(code);
}
