//! # Sync Command Implementation
//!
//! This module implements the `sync` subcommand, which reconciles the
//! registry, the specification documents and the source tree.
//!
//! ## Modes
//!
//! - **Default**: repair the registry (drop stale entries, add unindexed
//!   ones) and report everything else.
//! - **`--check`**: write nothing; exit with code 1 when the registry needs
//!   repair, or when `--prune` is also given and something would be pruned.
//! - **`--dry-run`**: write nothing; with `--prune`, list the documents that
//!   would be removed.
//! - **`--prune`**: remove documents whose every source was deleted after
//!   being committed. On a terminal the removal is confirmed first unless
//!   `--yes` is given.
//! - **`--existing-only`**: only check identifiers already in the registry,
//!   skipping the full walk of the source tree.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use dialoguer::{theme::ColorfulTheme, Confirm};

use specsync::git::{GitOracle, NoVcs, VcsOracle};
use specsync::output::{self, emoji, OutputConfig};
use specsync::prune::DiskRemover;
use specsync::reconcile::Mode;
use specsync::sync::{self, Collaborators};

use super::WorkspaceArgs;

/// Output format for the sync report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable summary and listing
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Reconcile the registry, the documents and the source tree
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Only check identifiers already in the registry (no full walk).
    #[arg(long)]
    pub existing_only: bool,

    /// Remove documents whose sources were all deleted after being committed.
    #[arg(long)]
    pub prune: bool,

    /// Show what would change without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Write nothing and exit with code 1 if actionable drift exists.
    #[arg(long)]
    pub check: bool,

    /// Restrict reconciliation to a language (repeatable).
    #[arg(short, long = "language", value_name = "LANG")]
    pub languages: Vec<String>,

    /// Do not consult git; every missing source is treated as ambiguous.
    #[arg(long)]
    pub no_git: bool,

    /// Timeout for each git query, in seconds.
    #[arg(long, value_name = "SECS")]
    pub git_timeout: Option<u64>,

    /// Do not ask for confirmation before pruning.
    #[arg(short, long)]
    pub yes: bool,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Also list sources that are registered and live.
    #[arg(short, long)]
    pub verbose: bool,
}

impl SyncArgs {
    fn mode(&self) -> Mode {
        Mode {
            existing_only: self.existing_only,
            prune: self.prune,
            dry_run: self.dry_run,
            check: self.check,
            languages: self.languages.clone(),
        }
    }
}

/// Execute the `sync` command.
pub fn execute(args: SyncArgs, color_flag: &str) -> Result<ExitCode> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut workspace = args.workspace.open()?;
    if let Some(secs) = args.git_timeout {
        workspace.config.git_timeout_secs = secs;
    }
    let mode = args.mode();

    let store = workspace.registry_store();
    let index = workspace.document_index();
    let discovery = workspace
        .discovery()
        .context("Invalid source discovery rules")?;
    let oracle: Box<dyn VcsOracle> = if args.no_git {
        Box::new(NoVcs)
    } else {
        Box::new(GitOracle::new(
            &workspace.root,
            workspace.config.git_timeout(),
        ))
    };
    let collaborators = Collaborators {
        store: &store,
        index: &index,
        discovery: &discovery,
        oracle: oracle.as_ref(),
        remover: &DiskRemover,
    };

    let interactive = console::Term::stdout().is_term() && args.format == OutputFormat::Text;
    let mut confirmed_preview = None;
    if mode.prune && mode.writes() && !args.yes && interactive {
        let preview_mode = Mode {
            dry_run: true,
            ..mode.clone()
        };
        let preview = sync::run(&workspace.root, &collaborators, &preview_mode)?;
        let candidates = &preview.report.prune_candidates;
        if !candidates.is_empty() {
            println!(
                "{} {} document(s) will be removed:",
                emoji(&out, "🗑️", "[PRUNE]"),
                candidates.len()
            );
            for candidate in candidates {
                println!("  {}", candidate.spec_id);
            }
            let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt("Remove these documents?")
                .default(false)
                .interact()?;
            if !confirmed {
                println!("Aborted; nothing was changed.");
                return Ok(ExitCode::SUCCESS);
            }
            confirmed_preview = Some(preview);
        }
    }

    // A confirmed preview is applied as shown, so only the listed documents
    // can be removed.
    let outcome = match confirmed_preview {
        Some(preview) => sync::apply_prune(preview, &collaborators, &mode),
        None => sync::run(&workspace.root, &collaborators, &mode),
    }
    .with_context(|| format!("Sync failed in {}", workspace.root.display()))?;

    match args.format {
        OutputFormat::Text => {
            print!(
                "{}",
                output::render_report(&outcome, &workspace.root, &out, args.verbose)
            );
            if outcome.registry_saved {
                println!(
                    "\n{} Registry written to {}",
                    emoji(&out, "✅", "[OK]"),
                    workspace.registry_path().display()
                );
            }
        }
        OutputFormat::Json => println!("{}", output::render_json(&outcome)?),
    }

    let prune_failed = outcome
        .prune
        .as_ref()
        .is_some_and(|p| !p.failures.is_empty());
    if prune_failed {
        return Ok(ExitCode::FAILURE);
    }

    if mode.check && outcome.drift_detected {
        eprintln!(
            "{} Drift detected; run `specsync sync` to repair",
            emoji(&out, "❌", "[ERR]")
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
