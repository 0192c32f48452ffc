//! # Output
//!
//! Controls CLI output appearance and renders reconciliation results.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals
//!
//! ## Reports
//!
//! [`render_report`] produces the human-readable listing: a summary count
//! per classification followed by the details, grouped in report order.
//! [`render_json`] emits the same data as JSON for tooling.
//!
//! ```rust,ignore
//! use specsync::output::{OutputConfig, emoji};
//!
//! let config = OutputConfig::from_env_and_flag("auto");
//! println!("{} Reconciling...", emoji(&config, "🔍", "[SCAN]"));
//! ```

use std::env;
use std::fmt::Write as _;
use std::path::Path;

use crate::error::Result;
use crate::reconcile::{Classification, DriftRecord, ReconciliationReport};
use crate::sync::SyncOutcome;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors and emojis should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// # Arguments
    /// * `color_flag` - The value of the --color CLI flag: "always", "never", or "auto"
    ///
    /// # Behavior
    /// - `--color=always`: Force colors on (overrides NO_COLOR)
    /// - `--color=never`: Force colors off
    /// - `--color=auto`: Detect based on environment
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stdout is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    /// Detect whether color output is supported based on environment.
    fn detect_color_support() -> bool {
        // Check NO_COLOR first (https://no-color.org/)
        // The presence of the variable (even if empty) disables colors
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        // Check CLICOLOR=0 disables colors
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        // Check CLICOLOR_FORCE=1 forces colors
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        // Check TERM=dumb
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // Use console crate's detection for TTY and color support
        console::Term::stdout().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the appropriate string based on color configuration.
///
/// When colors are enabled, returns the emoji. When disabled, returns
/// the plain text alternative.
///
/// # Arguments
/// * `config` - The output configuration
/// * `emoji` - The emoji to use when colors are enabled
/// * `plain` - The plain text to use when colors are disabled
///
/// # Example
/// ```rust,ignore
/// let config = OutputConfig::from_env_and_flag("auto");
/// println!("{} Validating...", emoji(&config, "🔍", "[SCAN]"));
/// ```
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// Display a path relative to `root` when it lives inside it.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn section_title(classification: Classification) -> &'static str {
    match classification {
        Classification::Orphaned => "Orphaned (source deleted after being tracked)",
        Classification::Ambiguous => "Ambiguous (source missing, history unknown)",
        Classification::Stale => "Stale registry entries",
        Classification::Unregistered => "Unregistered sources",
        Classification::Unindexed => "Unindexed sources",
        Classification::RegisteredLive => "Registered and live",
    }
}

fn record_line(record: &DriftRecord) -> String {
    let mut line = format!(
        "  {:<10} {}:{}",
        record.spec_id.as_deref().unwrap_or("-"),
        record.language,
        record.identifier
    );
    if let Some(status) = record.evidence.vcs {
        let _ = write!(line, " (vcs: {})", status.as_str());
    }
    line
}

/// Render a sync outcome as text.
///
/// Registered-live records are only listed when `verbose` is set; their
/// count always appears in the summary.
pub fn render_report(
    outcome: &SyncOutcome,
    root: &Path,
    config: &OutputConfig,
    verbose: bool,
) -> String {
    let report: &ReconciliationReport = &outcome.report;
    let mut out = String::new();

    let counts: Vec<String> = Classification::ALL
        .iter()
        .map(|c| format!("{} {}", report.summary.get(*c), c))
        .collect();
    let _ = writeln!(
        out,
        "{} Summary: {}",
        emoji(config, "📊", "[INFO]"),
        counts.join(", ")
    );

    for classification in Classification::ALL {
        if classification == Classification::RegisteredLive && !verbose {
            continue;
        }
        let records: Vec<&DriftRecord> = report.records_with(classification).collect();
        if records.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{} ({}):", section_title(classification), records.len());
        for record in records {
            let _ = writeln!(out, "{}", record_line(record));
        }
    }

    if !report.registry_updates.is_empty() {
        let saved = outcome.registry_saved || outcome.prune.as_ref().is_some_and(|p| p.saved);
        let verb = if saved {
            "Registry updates"
        } else {
            "Pending registry updates"
        };
        let _ = writeln!(out, "\n{} ({}):", verb, report.registry_updates.len());
        for update in &report.registry_updates {
            let line = match (&update.previous, &update.current) {
                (None, Some(current)) => {
                    format!("  + {}:{} -> {}", update.language, update.identifier, current)
                }
                (Some(previous), None) => {
                    format!("  - {}:{} ({})", update.language, update.identifier, previous)
                }
                (Some(previous), Some(current)) => format!(
                    "  ~ {}:{} {} -> {}",
                    update.language, update.identifier, previous, current
                ),
                (None, None) => continue,
            };
            let _ = writeln!(out, "{}", line);
        }
    }

    if !report.partial_orphans.is_empty() {
        let _ = writeln!(out, "\nPartially orphaned (never pruned):");
        for partial in &report.partial_orphans {
            let missing: Vec<String> = partial.orphaned.iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "  {:<10} {} of {} source(s) gone: {}",
                partial.spec_id,
                partial.orphaned.len(),
                partial.orphaned.len() + partial.remaining.len(),
                missing.join(", ")
            );
        }
    }

    match &outcome.prune {
        Some(prune) => {
            let heading = if prune.dry_run { "Would remove" } else { "Removed" };
            if !prune.removed.is_empty() {
                let _ = writeln!(out, "\n{} {}:", emoji(config, "🗑️", "[PRUNE]"), heading);
                for document in &prune.removed {
                    let _ = writeln!(
                        out,
                        "  {:<10} {}",
                        document.spec_id,
                        display_path(&document.dir, root)
                    );
                }
            }
            if !prune.failures.is_empty() {
                let _ = writeln!(out, "\n{} Failed to remove:", emoji(config, "❌", "[ERR]"));
                for failure in &prune.failures {
                    let _ = writeln!(
                        out,
                        "  {:<10} {}: {}",
                        failure.spec_id,
                        display_path(&failure.dir, root),
                        failure.message
                    );
                }
            }
        }
        None if !report.prune_candidates.is_empty() => {
            // Only `--check` stops a requested prune before it runs.
            let hint = if outcome.prune_requested {
                "would be removed without --check"
            } else {
                "run with --prune to remove"
            };
            let _ = writeln!(out, "\nPrune candidates ({}):", hint);
            for candidate in &report.prune_candidates {
                let _ = writeln!(
                    out,
                    "  {:<10} {}",
                    candidate.spec_id,
                    display_path(&candidate.dir, root)
                );
            }
        }
        None => {}
    }

    if !report.diagnostics.is_empty() || !report.document_issues.is_empty() {
        let _ = writeln!(out, "\n{} Diagnostics:", emoji(config, "⚠️", "[WARN]"));
        for diagnostic in &report.diagnostics {
            let _ = writeln!(out, "  {}", diagnostic);
        }
        for issue in &report.document_issues {
            let _ = writeln!(out, "  {}", issue);
        }
    }

    out
}

/// Render a sync outcome as pretty-printed JSON.
pub fn render_json(outcome: &SyncOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_always() {
        let config = OutputConfig::from_env_and_flag("always");
        assert!(config.use_color);
    }

    #[test]
    fn test_color_never() {
        let config = OutputConfig::from_env_and_flag("never");
        assert!(!config.use_color);
    }

    #[test]
    fn test_emoji_helper_with_color() {
        let config = OutputConfig::with_color();
        assert_eq!(emoji(&config, "🔍", "[SCAN]"), "🔍");
    }

    #[test]
    fn test_emoji_helper_without_color() {
        let config = OutputConfig::without_color();
        assert_eq!(emoji(&config, "🔍", "[SCAN]"), "[SCAN]");
    }

    #[test]
    fn test_display_path_is_relative_to_root() {
        assert_eq!(
            display_path(Path::new("/ws/specs/SPEC-001-a"), Path::new("/ws")),
            "specs/SPEC-001-a"
        );
        assert_eq!(display_path(Path::new("other/x"), Path::new("/ws")), "other/x");
    }
}
