//! Identifier, slug and document-directory naming utilities

use std::sync::LazyLock;

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};
use regex::Regex;

/// `*` and `?` stay within one path segment; only `**` crosses `/`.
pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

static SPEC_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+-[0-9]{3,}$").expect("static regex"));

static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("static regex"));

static DOC_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+-[0-9]{3,})(?:-([a-z0-9]+(?:-[a-z0-9]+)*))?$").expect("static regex")
});

/// Match a `/`-separated identifier against a glob pattern
pub fn glob_match(pattern: &str, path: &str) -> Result<bool> {
    let pattern = Pattern::new(pattern).map_err(Error::Glob)?;
    Ok(pattern.matches_with(path, MATCH_OPTIONS))
}

/// Normalize a source identifier to its registry key form.
///
/// Backslashes become forward slashes, leading `./` segments are dropped
/// and repeated separators collapse, so `.\\pkg\\\\mod.py` and `pkg/mod.py`
/// name the same registry entry.
pub fn normalize_identifier(identifier: &str) -> String {
    let unified = identifier.replace('\\', "/");
    unified
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `id` has the `KIND-NNN` shape used by specification documents.
pub fn is_valid_spec_id(id: &str) -> bool {
    SPEC_ID.is_match(id)
}

/// Whether `slug` is lowercase alphanumeric words joined by single dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG.is_match(slug)
}

/// Turn arbitrary text into a filesystem-safe slug.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Split a document directory name into its id and optional slug suffix.
///
/// `SPEC-001-user-auth` yields `("SPEC-001", Some("user-auth"))`, while
/// `SPEC-001` yields `("SPEC-001", None)`. Names that do not start with a
/// valid id return `None`.
pub fn parse_doc_dir_name(name: &str) -> Option<(String, Option<String>)> {
    let captures = DOC_DIR.captures(name)?;
    let id = captures.get(1)?.as_str().to_string();
    let slug = captures.get(2).map(|m| m.as_str().to_string());
    Some((id, slug))
}

/// Build the canonical directory name for a document.
pub fn doc_dir_name(id: &str, slug: &str) -> String {
    if slug.is_empty() {
        id.to_string()
    } else {
        format!("{}-{}", id, slug)
    }
}
