//! # Prune Executor
//!
//! Applies the destructive half of a reconciliation: deleting the document
//! directories of [`PruneCandidate`](crate::reconcile::PruneCandidate)s and
//! dropping their registry entries.
//!
//! Deletions are not transactional. Each candidate is handled on its own, a
//! failure is recorded and the next candidate still runs. The registry is
//! saved at most once, after every deletion was attempted, and only loses the
//! entries of documents that are confirmed gone. A run that changes nothing
//! leaves the registry file untouched. Re-running after a partial
//! failure finishes the remainder, since a directory that is already missing
//! counts as removed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::error::Result;
use crate::reconcile::{Mode, ReconciliationReport, SourceRef};
use crate::registry::{Registry, RegistryStore};

/// Removes a document directory
pub trait DocumentRemover {
    fn remove(&self, dir: &Path) -> io::Result<()>;
}

/// Deletes document directories from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskRemover;

impl DocumentRemover for DiskRemover {
    fn remove(&self, dir: &Path) -> io::Result<()> {
        match fs::remove_dir_all(dir) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            result => result,
        }
    }
}

/// A document that was (or in a dry run would be) removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunedDocument {
    pub spec_id: String,
    pub dir: PathBuf,
    pub registry_entries: Vec<SourceRef>,
}

/// A document whose directory could not be removed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneFailure {
    pub spec_id: String,
    pub dir: PathBuf,
    pub message: String,
}

/// What a prune did, or would do
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PruneResult {
    pub dry_run: bool,
    pub removed: Vec<PrunedDocument>,
    pub failures: Vec<PruneFailure>,
    /// Whether the registry was written.
    pub saved: bool,
    /// Registry after the removals.
    #[serde(skip)]
    pub registry: Registry,
}

impl PruneResult {
    /// Number of registry entries dropped.
    pub fn registry_entries_removed(&self) -> usize {
        self.removed.iter().map(|d| d.registry_entries.len()).sum()
    }
}

/// Prune every candidate in `report`, starting from `registry`.
///
/// In a dry run the exact actions are returned without touching the remover
/// or the store. Otherwise the registry is saved once at the end, when the
/// report's updates or the removals changed it; a save failure is returned as
/// an error after all deletions were attempted.
pub fn prune(
    report: &ReconciliationReport,
    mut registry: Registry,
    mode: &Mode,
    remover: &dyn DocumentRemover,
    store: &dyn RegistryStore,
) -> Result<PruneResult> {
    let mut removed = Vec::new();
    let mut failures = Vec::new();

    for candidate in &report.prune_candidates {
        if !mode.dry_run {
            if let Err(err) = remover.remove(&candidate.dir) {
                warn!(
                    "Failed to remove {} ({}): {}",
                    candidate.spec_id,
                    candidate.dir.display(),
                    err
                );
                failures.push(PruneFailure {
                    spec_id: candidate.spec_id.clone(),
                    dir: candidate.dir.clone(),
                    message: err.to_string(),
                });
                continue;
            }
            info!("Removed {} ({})", candidate.spec_id, candidate.dir.display());
        }

        for entry in &candidate.registry_entries {
            registry.remove(&entry.language, &entry.identifier);
        }
        removed.push(PrunedDocument {
            spec_id: candidate.spec_id.clone(),
            dir: candidate.dir.clone(),
            registry_entries: candidate.registry_entries.clone(),
        });
    }

    let changed = report.registry_changed()
        || removed.iter().any(|d| !d.registry_entries.is_empty());
    let saved = if mode.dry_run || !changed {
        false
    } else {
        store.save(&registry)?;
        true
    };

    Ok(PruneResult {
        dry_run: mode.dry_run,
        removed,
        failures,
        saved,
        registry,
    })
}
