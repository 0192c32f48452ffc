//! Default values for specsync configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::collections::BTreeMap;

use crate::config::LanguageConfig;

/// Name of the optional workspace configuration file.
pub const DEFAULT_CONFIG_FILENAME: &str = ".specsync.yaml";

/// Directory, relative to the workspace root, holding specification documents.
pub const DEFAULT_SPECS_DIR: &str = "specs";

/// Registry file name inside the specs directory.
pub const DEFAULT_REGISTRY_FILENAME: &str = "registry.json";

/// Document file name inside each specification directory.
pub const DEFAULT_DOCUMENT_FILENAME: &str = "spec.md";

/// Upper bound on a single git query.
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 10;

/// Paths never treated as source units, whatever the language.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/**",
    "**/.git/**",
    "target/**",
    "**/node_modules/**",
    "**/.venv/**",
    "**/venv/**",
    "**/__pycache__/**",
];

/// Built-in discovery rules, keyed by language name.
pub fn default_languages() -> BTreeMap<String, LanguageConfig> {
    let rule = |patterns: &[&str]| LanguageConfig {
        patterns: patterns.iter().map(|p| p.to_string()).collect(),
        exclude: Vec::new(),
    };

    BTreeMap::from([
        ("go".to_string(), rule(&["**/*.go"])),
        ("javascript".to_string(), rule(&["**/*.js", "**/*.mjs"])),
        ("python".to_string(), rule(&["**/*.py"])),
        ("rust".to_string(), rule(&["**/*.rs"])),
        ("typescript".to_string(), rule(&["**/*.ts", "**/*.tsx"])),
    ])
}
