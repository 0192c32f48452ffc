//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `specsync` command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args`, calls into the
//!   `specsync` library and returns the process exit code.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use specsync::sync::Workspace;

pub mod completions;
pub mod ls;
pub mod overview;
pub mod sync;
pub mod validate;

/// Arguments locating the workspace, shared by several commands
#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Workspace root directory. Defaults to the current directory.
    #[arg(short, long, value_name = "DIR", env = "SPECSYNC_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Configuration file. Defaults to `.specsync.yaml` in the workspace root.
    #[arg(short, long, value_name = "FILE", env = "SPECSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

impl WorkspaceArgs {
    /// Resolve the workspace root and load its configuration.
    pub fn open(&self) -> Result<Workspace> {
        let root = match &self.workspace {
            Some(root) => root.clone(),
            None => std::env::current_dir().context("Failed to get current directory")?,
        };
        if !root.is_dir() {
            anyhow::bail!("Workspace {} is not a directory", root.display());
        }
        Workspace::open(&root, self.config.as_deref())
            .with_context(|| format!("Failed to load configuration for {}", root.display()))
    }
}
