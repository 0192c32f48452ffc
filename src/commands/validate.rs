//! # Validate Command Implementation
//!
//! This module implements the `validate` subcommand, which checks the
//! workspace without reconciling it:
//!
//! - **Registry**: the registry file must load (supported schema version,
//!   well-formed content).
//! - **Documents**: every document header must parse. Identity mismatches
//!   between directory names and headers are reported as warnings.
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use specsync::document::DocumentIndex;
use specsync::output::{emoji, OutputConfig};
use specsync::registry;

use super::WorkspaceArgs;

/// Check every specification document and the registry file
#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Treat identity mismatches as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `validate` command.
///
/// Returns exit code 1 when the registry cannot be loaded or any document
/// fails to parse.
pub fn execute(args: ValidateArgs, color_flag: &str) -> Result<ExitCode> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let workspace = args.workspace.open()?;
    println!(
        "{} Validating specifications in {}",
        emoji(&out, "🔍", "[SCAN]"),
        workspace.specs_path().display()
    );

    let mut has_errors = false;

    match registry::load(&workspace.registry_path()) {
        Ok(registry) => println!(
            "{} Registry loaded ({} entries)",
            emoji(&out, "✅", "[OK]"),
            registry.len()
        ),
        Err(e) => {
            println!("{} {}", emoji(&out, "❌", "[ERR]"), e);
            has_errors = true;
        }
    }

    let scan = workspace.document_index().scan();
    println!(
        "{} {} document(s) parsed",
        emoji(&out, "📊", "[INFO]"),
        scan.documents.len()
    );

    let failures: Vec<_> = scan.failures().collect();
    for failure in &failures {
        println!("{} {}", emoji(&out, "❌", "[ERR]"), failure);
    }
    has_errors |= !failures.is_empty();

    let mismatches: Vec<_> = scan.mismatches().collect();
    for mismatch in &mismatches {
        println!("{} {}", emoji(&out, "⚠️", "[WARN]"), mismatch);
    }
    if args.strict {
        has_errors |= !mismatches.is_empty();
    }

    if has_errors {
        println!("\n{} Validation failed", emoji(&out, "❌", "[ERR]"));
        return Ok(ExitCode::FAILURE);
    }

    println!("\n{} Validation passed", emoji(&out, "✅", "[OK]"));
    Ok(ExitCode::SUCCESS)
}
