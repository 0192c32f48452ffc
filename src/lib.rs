//! # Specification Registry and Source-Sync Engine
//!
//! This library keeps a persistent association between source units (files
//! in one or more languages) and the specification documents that describe
//! them, and reconciles that association as the source tree and the
//! document tree change independently. It powers the `specsync`
//! command-line tool and can be embedded by supplying its collaborators.
//!
//! ## Quick Example
//!
//! ```
//! use specsync::document::{SourceEntry, SpecDocument};
//! use specsync::git::{StaticOracle, VcsStatus};
//! use specsync::reconcile::{reconcile, Classification, DiscoveredSources, Mode};
//! use specsync::registry::Registry;
//!
//! let mut registry = Registry::new();
//! registry.insert("python", "mod.py", "SPEC-001");
//!
//! let documents = vec![SpecDocument::new(
//!     "SPEC-001",
//!     "mod",
//!     vec![SourceEntry::new("python", "mod.py", "mod")],
//! )];
//!
//! // `mod.py` is gone from the tree and git says it was committed.
//! let mut sources = DiscoveredSources::new("/ws");
//! sources.insert_walk("python", Default::default());
//! let oracle = StaticOracle::new().with_fallback(VcsStatus::TrackedThenDeleted);
//!
//! let report = reconcile(&registry, &documents, &sources, &oracle, &Mode::default());
//! assert_eq!(report.summary.get(Classification::Orphaned), 1);
//! assert_eq!(report.prune_candidates[0].spec_id, "SPEC-001");
//! ```
//!
//! ## Core Concepts
//!
//! - **Registry (`registry`)**: the persisted `(language, identifier) → spec id`
//!   cache, loaded once and saved atomically.
//! - **Document Index (`document`)**: parses each document's front-matter
//!   header. Documents are authoritative; the registry only caches them.
//! - **Version-Control Oracle (`git`)**: tells a deleted-after-commit source
//!   apart from one that was never tracked.
//! - **Source Discovery (`discovery`)**: enumerates source units per language.
//! - **Reconciler (`reconcile`)**: classifies every pair and computes registry
//!   repairs and prune candidates.
//! - **Prune Executor (`prune`)**: removes fully orphaned documents and their
//!   registry entries.
//!
//! ## Execution Flow
//!
//! [`sync::run`] drives one invocation:
//!
//! 1.  **Load**: read the registry; schema or corruption errors abort.
//! 2.  **Scan**: parse every document, collecting per-document failures.
//! 3.  **Discover**: walk the tree, or probe known identifiers only.
//! 4.  **Reconcile**: query version control for missing sources, then run
//!     the pure diff.
//! 5.  **Apply**: prune and save once, save the repaired registry, or write
//!     nothing in check and dry-run modes.

pub mod config;
pub mod defaults;
pub mod discovery;
pub mod document;
pub mod error;
pub mod git;
pub mod output;
pub mod overview;
pub mod path;
pub mod prune;
pub mod reconcile;
pub mod registry;
pub mod sync;

#[cfg(test)]
mod path_proptest;
#[cfg(test)]
mod reconcile_proptest;
