//! # pipesmith command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Initialize logging (files + stderr, console only as fallback)
//!   ├─> Parse CLI arguments (clap)
//!   └─> Load settings, build the service, run the subcommand
//! ```
//!
//! Command results go to stdout as JSON (Markdown for `docs`); logs go to
//! stderr and the rolling log files, so output can be piped:
//!
//! ```bash
//! pipesmith create orders.csv --name daily_orders --framework prefect --out generated/
//! pipesmith status daily_orders | jq .schedule
//! RUST_LOG=debug pipesmith demo
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Command output is printed

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    if let Err(e) = pipesmith::logging::init() {
        pipesmith::logging::init_console()?;
        tracing::warn!("File logging unavailable, logging to console only: {e:#}");
    }

    let cli = cli::Cli::parse();
    cli::run_command(cli).inspect_err(|e| tracing::error!("{e:#}"))
}
