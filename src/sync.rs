//! # Sync Orchestrator
//!
//! Runs one full reconciliation for a workspace:
//!
//! 1. load the registry (schema and corruption errors abort here, before
//!    anything is written),
//! 2. scan the specification documents,
//! 3. discover sources, by full walk or by per-identifier probes in
//!    existing-only mode,
//! 4. reconcile, querying version control only for missing sources,
//! 5. depending on the mode, write nothing (`check`, `dry_run`), prune and
//!    save once, or save the repaired registry if it changed.
//!
//! Every collaborator is passed in through [`Collaborators`], so the same
//! flow runs against the real filesystem and git or against in-memory fakes.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::config::{self, Config};
use crate::discovery::{GlobDiscovery, SourceDiscovery};
use crate::document::{DirectoryIndex, DocumentIndex};
use crate::error::Result;
use crate::git::VcsOracle;
use crate::prune::{self, DocumentRemover, PruneResult};
use crate::reconcile::{self, DiscoveredSources, Mode, ReconciliationReport};
use crate::registry::{FileRegistryStore, RegistryStore};

/// A workspace root together with its configuration
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub config: Config,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Open a workspace, reading `config_path` or the default config file.
    pub fn open(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => config::from_file(path)?,
            None => config::load_for_workspace(root)?,
        };
        Ok(Self::new(root, config))
    }

    pub fn specs_path(&self) -> PathBuf {
        self.config.specs_path(&self.root)
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config.registry_path(&self.root)
    }

    pub fn registry_store(&self) -> FileRegistryStore {
        FileRegistryStore::new(self.registry_path())
    }

    pub fn document_index(&self) -> DirectoryIndex {
        DirectoryIndex::new(self.specs_path(), &self.config.document_file)
    }

    pub fn discovery(&self) -> Result<GlobDiscovery> {
        GlobDiscovery::from_config(&self.config)
    }
}

/// Everything a sync run reads from or writes to
pub struct Collaborators<'a> {
    pub store: &'a dyn RegistryStore,
    pub index: &'a dyn DocumentIndex,
    pub discovery: &'a dyn SourceDiscovery,
    pub oracle: &'a dyn VcsOracle,
    pub remover: &'a dyn DocumentRemover,
}

/// Result of a sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub report: ReconciliationReport,
    /// Present when pruning was requested, simulated in a dry run.
    pub prune: Option<PruneResult>,
    pub registry_saved: bool,
    /// Whether the run found drift a `check` should fail on.
    pub drift_detected: bool,
    /// Whether pruning was requested, even if `check` kept it from running.
    pub prune_requested: bool,
}

/// Run one reconciliation over the workspace at `root`.
pub fn run(root: &Path, collaborators: &Collaborators<'_>, mode: &Mode) -> Result<SyncOutcome> {
    let registry = collaborators.store.load()?;
    debug!("Loaded registry with {} entries", registry.len());

    let scan = collaborators.index.scan();
    debug!(
        "Scanned {} document(s), {} issue(s)",
        scan.documents.len(),
        scan.issues.len()
    );

    let sources = DiscoveredSources::gather(
        root,
        collaborators.discovery,
        &registry,
        &scan.documents,
        mode,
    )?;

    let mut report = reconcile::reconcile(
        &registry,
        &scan.documents,
        &sources,
        collaborators.oracle,
        mode,
    );
    report.document_issues = scan.issues;
    let drift_detected = report.has_actionable_drift(mode);

    let mut outcome = SyncOutcome {
        report,
        prune: None,
        registry_saved: false,
        drift_detected,
        prune_requested: mode.prune,
    };

    if mode.check {
        return Ok(outcome);
    }

    if mode.prune {
        return apply_prune(outcome, collaborators, mode);
    }

    if mode.writes() && outcome.report.registry_changed() {
        collaborators.store.save(&outcome.report.registry)?;
        info!(
            "Applied {} registry update(s)",
            outcome.report.registry_updates.len()
        );
        outcome.registry_saved = true;
    }

    Ok(outcome)
}

/// Prune the candidates of an already computed outcome.
///
/// Reusing the report of a dry-run preview removes exactly the documents
/// the preview listed, whatever changed in the tree since.
pub fn apply_prune(
    mut outcome: SyncOutcome,
    collaborators: &Collaborators<'_>,
    mode: &Mode,
) -> Result<SyncOutcome> {
    let result = prune::prune(
        &outcome.report,
        outcome.report.registry.clone(),
        mode,
        collaborators.remover,
        collaborators.store,
    )?;
    outcome.registry_saved = result.saved;
    outcome.prune_requested = true;
    outcome.prune = Some(result);
    Ok(outcome)
}
