//! # Document Index
//!
//! Specification documents live one per directory under the specs root:
//!
//! ```text
//! specs/
//!   registry.json
//!   SPEC-001-user-auth/
//!     spec.md
//!   SPEC-002-billing/
//!     spec.md
//! ```
//!
//! Each document starts with a YAML front-matter header declaring its
//! identity and the source units it describes:
//!
//! ```markdown
//! ---
//! id: SPEC-001
//! slug: user-auth
//! sources:
//!   - language: python
//!     identifier: app/auth.py
//!     module: app.auth
//!     variants:
//!       - name: public
//!         path: docs/auth.public.md
//! ---
//! # User auth
//! ```
//!
//! The header schema is strict: `slug` and `sources` are required, source
//! entries and variants reject unknown keys, and values are never coerced
//! between types. Keys the engine does not know at the top level are kept
//! in [`DocumentHeader::extra`] so a rewritten header loses nothing.
//!
//! ## Scanning
//!
//! [`scan`] never fails because of a single document. Each problem becomes a
//! [`DocumentIssue`] in the returned [`ScanOutcome`] next to the documents
//! that did parse. Identity mismatches between the directory name and the
//! header keep the document, with the header `id` taking precedence.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path::{
    doc_dir_name, is_valid_slug, is_valid_spec_id, normalize_identifier, parse_doc_dir_name,
};

/// A generated artifact tied to a source entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Variant {
    pub name: String,
    pub path: String,
}

/// One source unit declared by a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceEntry {
    /// Language namespace of the identifier.
    pub language: String,
    /// Registry key: a `/`-separated path relative to the workspace root.
    pub identifier: String,
    /// Language-specific canonical name (e.g. dotted module path).
    pub module: String,
    /// Generated artifacts carried through untouched.
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl SourceEntry {
    pub fn new(language: &str, identifier: &str, module: &str) -> Self {
        Self {
            language: language.to_string(),
            identifier: identifier.to_string(),
            module: module.to_string(),
            variants: Vec::new(),
        }
    }
}

/// Front-matter header of a specification document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sources: Vec<SourceEntry>,
    /// Any other top-level keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A parsed specification document
#[derive(Debug, Clone, PartialEq)]
pub struct SpecDocument {
    /// Authoritative id: the header `id` when present, else the directory's.
    pub id: String,
    /// Directory removed when the document is pruned.
    pub dir: PathBuf,
    /// The document file itself.
    pub path: PathBuf,
    pub header: DocumentHeader,
}

impl SpecDocument {
    /// Build a document in memory, laid out as `<id>-<slug>/spec.md`.
    pub fn new(id: &str, slug: &str, sources: Vec<SourceEntry>) -> Self {
        let dir = PathBuf::from(doc_dir_name(id, slug));
        Self {
            id: id.to_string(),
            path: dir.join(crate::defaults::DEFAULT_DOCUMENT_FILENAME),
            dir,
            header: DocumentHeader {
                id: Some(id.to_string()),
                slug: slug.to_string(),
                title: None,
                sources,
                extra: BTreeMap::new(),
            },
        }
    }

    pub fn slug(&self) -> &str {
        &self.header.slug
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.header.sources
    }
}

/// A per-document problem found while scanning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentIssue {
    /// The header could not be parsed or violates the schema. The document
    /// is left out of the index.
    #[error("{}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// The directory name and the header disagree. The document is kept
    /// under its header id.
    #[error(
        "{}: directory name `{dir_name}` does not match header id `{header_id}` / slug `{header_slug}`",
        path.display()
    )]
    IdentityMismatch {
        path: PathBuf,
        dir_name: String,
        header_id: String,
        header_slug: String,
    },

    /// Two documents claim the same id. The first in path order is kept.
    #[error("{}: id `{id}` is already used by {}", ignored.display(), kept.display())]
    DuplicateId {
        id: String,
        kept: PathBuf,
        ignored: PathBuf,
    },
}

impl DocumentIssue {
    /// Whether the affected document was dropped from the index.
    pub fn excludes_document(&self) -> bool {
        !matches!(self, DocumentIssue::IdentityMismatch { .. })
    }
}

/// Documents that parsed plus every per-document problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Parsed documents, sorted by id.
    pub documents: Vec<SpecDocument>,
    pub issues: Vec<DocumentIssue>,
}

impl ScanOutcome {
    /// Issues that removed a document from the index.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentIssue> {
        self.issues.iter().filter(|issue| issue.excludes_document())
    }

    /// Identity mismatches on documents that were kept.
    pub fn mismatches(&self) -> impl Iterator<Item = &DocumentIssue> {
        self.issues.iter().filter(|issue| !issue.excludes_document())
    }
}

/// Source of parsed specification documents
pub trait DocumentIndex {
    fn scan(&self) -> ScanOutcome;
}

/// Document index over a specs directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryIndex {
    specs_root: PathBuf,
    document_file: String,
}

impl DirectoryIndex {
    pub fn new(specs_root: impl Into<PathBuf>, document_file: &str) -> Self {
        Self {
            specs_root: specs_root.into(),
            document_file: document_file.to_string(),
        }
    }
}

impl DocumentIndex for DirectoryIndex {
    fn scan(&self) -> ScanOutcome {
        scan(&self.specs_root, &self.document_file)
    }
}

/// A fixed outcome serves as its own index.
impl DocumentIndex for ScanOutcome {
    fn scan(&self) -> ScanOutcome {
        self.clone()
    }
}

/// Split a document into its front-matter YAML and body.
///
/// The header must open on the very first line with `---` and close with a
/// line holding `---` or `...`.
pub fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text
        .strip_prefix("---\r\n")
        .or_else(|| text.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}

/// Parse and validate a document header from full document text.
///
/// `path` is only used in error messages.
pub fn parse_header(text: &str, path: &Path) -> Result<DocumentHeader> {
    let parse_error = |message: String| Error::DocumentParse {
        path: path.to_path_buf(),
        message,
    };

    let (yaml, _) = split_front_matter(text)
        .ok_or_else(|| parse_error("missing `---` front-matter header".to_string()))?;

    let mut header: DocumentHeader =
        serde_yaml::from_str(yaml).map_err(|e| parse_error(e.to_string()))?;

    if !is_valid_slug(&header.slug) {
        return Err(parse_error(format!(
            "slug `{}` must be lowercase alphanumeric words separated by single dashes",
            header.slug
        )));
    }
    if let Some(id) = &header.id {
        if !is_valid_spec_id(id) {
            return Err(parse_error(format!("id `{}` must look like KIND-NNN", id)));
        }
    }

    let mut seen = BTreeSet::new();
    for (index, source) in header.sources.iter_mut().enumerate() {
        if source.language.trim().is_empty() {
            return Err(parse_error(format!("sources[{}]: empty language", index)));
        }
        let identifier = normalize_identifier(&source.identifier);
        if identifier.is_empty() {
            return Err(parse_error(format!("sources[{}]: empty identifier", index)));
        }
        if !seen.insert((source.language.clone(), identifier.clone())) {
            return Err(parse_error(format!(
                "sources[{}]: {} `{}` is declared twice",
                index, source.language, identifier
            )));
        }
        source.identifier = identifier;
    }

    Ok(header)
}

/// Serialize a header back to front-matter form, including both fences.
pub fn render_header(header: &DocumentHeader) -> Result<String> {
    let yaml = serde_yaml::to_string(header)?;
    Ok(format!("---\n{}---\n", yaml))
}

/// Parse one document file located in `dir`.
///
/// Returns the document together with an identity mismatch, if any.
pub fn load_document(
    dir: &Path,
    path: &Path,
) -> std::result::Result<(SpecDocument, Option<DocumentIssue>), DocumentIssue> {
    let text = fs::read_to_string(path).map_err(|e| DocumentIssue::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let header = parse_header(&text, path).map_err(|e| DocumentIssue::Parse {
        path: path.to_path_buf(),
        message: match e {
            Error::DocumentParse { message, .. } => message,
            other => other.to_string(),
        },
    })?;

    let dir_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let from_dir = parse_doc_dir_name(&dir_name);

    let id = match (&header.id, &from_dir) {
        (Some(id), _) => id.clone(),
        (None, Some((dir_id, _))) => dir_id.clone(),
        (None, None) => {
            return Err(DocumentIssue::Parse {
                path: path.to_path_buf(),
                message: format!(
                    "cannot determine id: header has no `id` and directory `{}` is not named <ID>-<slug>",
                    dir_name
                ),
            })
        }
    };

    let agrees = match &from_dir {
        Some((dir_id, dir_slug)) => {
            *dir_id == id && dir_slug.as_ref().is_none_or(|slug| *slug == header.slug)
        }
        None => false,
    };
    let mismatch = (!agrees).then(|| DocumentIssue::IdentityMismatch {
        path: path.to_path_buf(),
        dir_name: dir_name.clone(),
        header_id: id.clone(),
        header_slug: header.slug.clone(),
    });

    Ok((
        SpecDocument {
            id,
            dir: dir.to_path_buf(),
            path: path.to_path_buf(),
            header,
        },
        mismatch,
    ))
}

/// Scan the specs root for documents named `document_file`.
///
/// Only `<specs_root>/<dir>/<document_file>` is considered, so pruning a
/// document directory can never remove another document. A missing specs
/// root yields an empty outcome.
pub fn scan(specs_root: &Path, document_file: &str) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    if !specs_root.is_dir() {
        debug!("Specs directory {} does not exist", specs_root.display());
        return outcome;
    }

    let mut by_id: BTreeMap<String, SpecDocument> = BTreeMap::new();

    let walker = WalkDir::new(specs_root)
        .min_depth(2)
        .max_depth(2)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(specs_root).to_path_buf();
                warn!("Skipping unreadable entry {}: {}", path.display(), err);
                outcome.issues.push(DocumentIssue::Parse {
                    path,
                    message: err.to_string(),
                });
                continue;
            }
        };

        if !entry.file_type().is_file() || entry.file_name() != document_file {
            continue;
        }
        let path = entry.path();
        let Some(dir) = path.parent() else {
            continue;
        };

        match load_document(dir, path) {
            Ok((document, mismatch)) => {
                if let Some(mismatch) = mismatch {
                    warn!("{}", mismatch);
                    outcome.issues.push(mismatch);
                }
                if let Some(existing) = by_id.get(&document.id) {
                    let issue = DocumentIssue::DuplicateId {
                        id: document.id.clone(),
                        kept: existing.path.clone(),
                        ignored: document.path.clone(),
                    };
                    warn!("{}", issue);
                    outcome.issues.push(issue);
                    continue;
                }
                debug!(
                    "Indexed {} with {} source(s)",
                    document.id,
                    document.sources().len()
                );
                by_id.insert(document.id.clone(), document);
            }
            Err(issue) => {
                warn!("{}", issue);
                outcome.issues.push(issue);
            }
        }
    }

    outcome.documents = by_id.into_values().collect();
    outcome
}
