use std::process::ExitCode;

use clap::Parser;
use kafka_stress::cli::{LoadOpt, run_load};
use fluvio_future::task::run_block_on;

fn main() -> ExitCode {
    let opt = LoadOpt::parse();
    opt.logging.init();

    run_block_on(run_load(opt))
}
