//! # Error Handling
//!
//! This module defines the centralized error type for the `specsync`
//! library. It uses `thiserror` to build one `Error` enum covering every
//! failure mode the engine can surface, with messages that carry enough
//! context to act on.
//!
//! ## Severity
//!
//! Not every variant aborts a run. The reconciliation engine distinguishes:
//!
//! - **Fatal**: `SchemaMismatch` and `Corrupt` mean the registry cannot be
//!   trusted. They abort the command before anything is written.
//! - **Per document**: `DocumentParse` is scoped to a single specification
//!   document. The document index turns it into a `DocumentIssue` and the
//!   rest of the scan continues.
//! - **Per deletion**: an `Io` error while pruning one document is recorded
//!   against that document and the remaining deletions still run.
//!
//! The `Result<T>` alias is used throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for specsync operations
#[derive(Error, Debug)]
pub enum Error {
    /// The registry file declares a schema version this engine does not
    /// support. Registries are never migrated silently.
    #[error("Registry schema mismatch in {}: found version {found}, expected {expected}", path.display())]
    SchemaMismatch {
        path: PathBuf,
        found: String,
        expected: String,
    },

    /// The registry file exists but could not be decoded.
    #[error("Registry file {} is corrupt: {message}", path.display())]
    Corrupt { path: PathBuf, message: String },

    /// A specification document header could not be parsed.
    #[error("Failed to parse document {}: {message}", path.display())]
    DocumentParse { path: PathBuf, message: String },

    /// An error occurred while loading the `.specsync.yaml` configuration.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A git invocation could not be completed.
    #[error("Git command failed: {command} - {stderr}")]
    GitCommand { command: String, stderr: String },

    /// Source discovery failed for a language.
    #[error("Source discovery error for {language}: {message}")]
    Discovery { language: String, message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An embedded overview block is not a YAML mapping.
    #[error("Invalid overview block: {0}")]
    Overview(String),

    /// A glob pattern error, wrapped from `glob::PatternError`.
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),
}

impl Error {
    /// Whether this error invalidates shared persisted state and must abort
    /// the whole command.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. } | Error::Corrupt { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
