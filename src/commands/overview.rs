//! # Overview Command Implementation
//!
//! Prints the first ```` ```yaml overview ```` block of a markdown file as
//! JSON. Exits with code 1 when the file has no such block.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use specsync::overview;

/// Print the overview block of a markdown file as JSON
#[derive(Args, Debug)]
pub struct OverviewArgs {
    /// Markdown file to read.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

/// Execute the `overview` command.
pub fn execute(args: OverviewArgs) -> Result<ExitCode> {
    let markdown = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let Some(mapping) = overview::extract(&markdown)
        .with_context(|| format!("Failed to parse overview in {}", args.file.display()))?
    else {
        eprintln!("No `{}` block in {}", overview::OVERVIEW_MARKER, args.file.display());
        return Ok(ExitCode::FAILURE);
    };

    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(ExitCode::SUCCESS)
}
