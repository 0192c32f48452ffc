//! # Completions Command Implementation
//!
//! Writes a shell completion script for `specsync` to stdout:
//!
//! ```bash
//! specsync completions bash > ~/.local/share/bash-completion/completions/specsync
//! specsync completions zsh > ~/.zfunc/_specsync
//! specsync completions fish > ~/.config/fish/completions/specsync.fish
//! ```

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// The shell to generate completions for (bash, elvish, fish, powershell, zsh)
    #[arg(value_enum, value_name = "SHELL")]
    pub shell: Shell,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<ExitCode> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(args.shell, &mut cmd, name, &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}
