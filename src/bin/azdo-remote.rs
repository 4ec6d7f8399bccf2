use anyhow::Result;
use azdo_remote::cli::{self, Args};
use azdo_remote::logging::{init_logging, parse_early_log_config};
use clap::Parser;
use std::io;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging starts before argument parsing so config resolution can log too
    let raw_args: Vec<String> = std::env::args().collect();
    let _log_guard = init_logging(parse_early_log_config(&raw_args));

    let args = Args::parse();
    tracing::debug!(command = ?args.command, "starting");

    let mut stdout = io::stdout().lock();
    cli::run(args, &mut stdout).await
}
