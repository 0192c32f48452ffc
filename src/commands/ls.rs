//! # Ls Command Implementation
//!
//! This module implements the `ls` subcommand, which lists registry entries
//! as `language`, `identifier` and `spec id` columns.
//!
//! ## Functionality
//!
//! - **Language Filtering**: `--language` limits the listing (repeatable)
//! - **Spec Filtering**: `--spec` lists the entries of one specification
//! - **Pattern Filtering**: `--pattern` keeps identifiers matching a glob
//! - **Counting**: `--count` prints only the number of matching entries
//!
//! This command is a safe, read-only operation that does not modify any files.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use specsync::path::glob_match;
use specsync::registry;

use super::WorkspaceArgs;

/// List registry entries
#[derive(Args, Debug)]
pub struct LsArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Only list entries of this language (repeatable).
    #[arg(short, long = "language", value_name = "LANG")]
    pub languages: Vec<String>,

    /// Only list entries registered to this specification id.
    #[arg(short, long, value_name = "ID")]
    pub spec: Option<String>,

    /// Filter identifiers by glob pattern (e.g., "src/**/*.py").
    #[arg(short, long, value_name = "PATTERN")]
    pub pattern: Option<String>,

    /// Show only the total count of entries.
    #[arg(long)]
    pub count: bool,
}

/// Execute the `ls` command.
pub fn execute(args: LsArgs) -> Result<ExitCode> {
    let workspace = args.workspace.open()?;
    let registry_path = workspace.registry_path();
    let registry = registry::load(&registry_path)
        .with_context(|| format!("Failed to load registry {}", registry_path.display()))?;

    let mut entries = Vec::new();
    for (language, identifier, spec_id) in registry.iter() {
        if !args.languages.is_empty() && !args.languages.iter().any(|l| l == language) {
            continue;
        }
        if args.spec.as_deref().is_some_and(|spec| spec != spec_id) {
            continue;
        }
        if let Some(pattern) = &args.pattern {
            let matched = glob_match(pattern, identifier)
                .with_context(|| format!("Invalid glob pattern '{}'", pattern))?;
            if !matched {
                continue;
            }
        }
        entries.push((language, identifier, spec_id));
    }

    if args.count {
        println!("{}", entries.len());
        return Ok(ExitCode::SUCCESS);
    }

    if entries.is_empty() {
        println!("No registry entries.");
        return Ok(ExitCode::SUCCESS);
    }

    let width = entries.iter().map(|(l, _, _)| l.len()).max().unwrap_or(0);
    for (language, identifier, spec_id) in &entries {
        println!("{:<width$}  {}  {}", language, spec_id, identifier, width = width);
    }

    println!();
    println!("{} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });

    Ok(ExitCode::SUCCESS)
}
