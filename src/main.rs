mod args;
mod evaluation;

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

use crate::args::Args;
use crate::evaluation::RunOptions;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    info!("args: {:?}", args);

    let options = match RunOptions::from_args(&args) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("Invalid arguments: {}", e);
            std::process::exit(2);
        }
    };

    if let Err(e) = evaluation::run_scoring(&options) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
