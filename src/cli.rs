//! CLI argument parsing and command dispatch

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// specsync - Keep specification documents in sync with the source tree
#[derive(Parser, Debug)]
#[command(name = "specsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile the registry, the documents and the source tree
    Sync(commands::sync::SyncArgs),

    /// Check every specification document and the registry file
    Validate(commands::validate::ValidateArgs),

    /// List registry entries
    Ls(commands::ls::LsArgs),

    /// Print the overview block of a markdown file as JSON
    Overview(commands::overview::OverviewArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<ExitCode> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Sync(args) => commands::sync::execute(args, &self.color),
            Commands::Validate(args) => commands::validate::execute(args, &self.color),
            Commands::Ls(args) => commands::ls::execute(args),
            Commands::Overview(args) => commands::overview::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
