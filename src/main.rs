//! # specsync CLI
//!
//! This is the binary entry point for the `specsync` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Turning command results into an exit code: `0` on success, `1` on
//!   errors or when `sync --check` finds drift, `2` for usage errors
//!   (reported by clap).
//!
//! The reconciliation logic lives in the `specsync` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();
    cli.execute()
}
