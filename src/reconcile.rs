//! # Reconciler
//!
//! The reconciler merges three views of the same facts:
//!
//! - the **registry**, a cache mapping `(language, identifier)` to a spec id,
//! - the **documents**, whose headers declare the sources they describe and
//!   which are authoritative,
//! - the **working tree**, as reported by source discovery and, for missing
//!   paths only, by the version-control oracle.
//!
//! Every pair seen in any of the three views gets one [`DriftRecord`].
//!
//! ## Phases
//!
//! All I/O happens first. [`DiscoveredSources::gather`] walks or probes the
//! tree and [`gather_vcs_evidence`] asks the oracle about declared sources
//! that are missing, nothing else. [`diff`] is then a pure function over
//! immutable inputs, which is what the tests exercise directly.
//!
//! ## Pruning rules
//!
//! A document becomes a [`PruneCandidate`] only when it declares at least one
//! source and every declared source is [`Classification::Orphaned`] within
//! the requested languages. A missing source whose history cannot be
//! established is [`Classification::Ambiguous`] and blocks pruning. Documents
//! with some, but not all, sources orphaned are reported as
//! [`PartialOrphan`]s and left alone.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;

use crate::discovery::{identifier_path, SourceDiscovery};
use crate::document::{DocumentIssue, SourceEntry, SpecDocument};
use crate::error::Result;
use crate::git::{VcsOracle, VcsStatus};
use crate::registry::Registry;

/// Options for one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mode {
    /// Only check identifiers already in the registry; no full walk.
    pub existing_only: bool,
    /// Prune documents whose sources are all orphaned.
    pub prune: bool,
    /// Compute every action without touching disk.
    pub dry_run: bool,
    /// Report drift without writing anything.
    pub check: bool,
    /// Languages to reconcile. Empty means all of them.
    pub languages: Vec<String>,
}

impl Mode {
    /// Whether `language` is in scope for this run.
    pub fn includes(&self, language: &str) -> bool {
        self.languages.is_empty() || self.languages.iter().any(|l| l == language)
    }

    /// Whether this run is allowed to write to disk.
    pub fn writes(&self) -> bool {
        !self.check && !self.dry_run
    }
}

/// How a `(language, identifier)` pair relates across the three views
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Declared, missing, and version control confirms it was tracked.
    Orphaned,
    /// Declared and missing, without enough history to prune.
    Ambiguous,
    /// In the registry, but no document declares it.
    Stale,
    /// On disk, but neither declared nor registered.
    Unregistered,
    /// Declared and on disk, but missing from the registry.
    Unindexed,
    /// Declared, registered and on disk.
    RegisteredLive,
}

impl Classification {
    /// Every classification in report order.
    pub const ALL: [Classification; 6] = [
        Classification::Orphaned,
        Classification::Ambiguous,
        Classification::Stale,
        Classification::Unregistered,
        Classification::Unindexed,
        Classification::RegisteredLive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Orphaned => "orphaned",
            Classification::Ambiguous => "ambiguous",
            Classification::Stale => "stale",
            Classification::Unregistered => "unregistered",
            Classification::Unindexed => "unindexed",
            Classification::RegisteredLive => "registered-live",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(language, identifier)` key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SourceRef {
    pub language: String,
    pub identifier: String,
}

impl SourceRef {
    pub fn new(language: &str, identifier: &str) -> Self {
        Self {
            language: language.to_string(),
            identifier: identifier.to_string(),
        }
    }
}

impl From<&SourceEntry> for SourceRef {
    fn from(entry: &SourceEntry) -> Self {
        Self::new(&entry.language, &entry.identifier)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.language, self.identifier)
    }
}

/// What was checked to reach a classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    /// Spec id the registry held before this run.
    pub registered: Option<String>,
    /// Whether a document declares the source.
    pub declared: bool,
    /// Whether the source exists in the working tree.
    pub on_disk: bool,
    /// Oracle answer, only present for missing declared sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcs: Option<VcsStatus>,
}

/// One classified pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftRecord {
    pub classification: Classification,
    pub language: String,
    pub identifier: String,
    /// Declaring spec, or the registered one for stale entries.
    pub spec_id: Option<String>,
    pub evidence: Evidence,
}

impl DriftRecord {
    fn sort_key(&self) -> (Classification, &str, &str, &str) {
        (
            self.classification,
            self.spec_id.as_deref().unwrap_or_default(),
            &self.language,
            &self.identifier,
        )
    }
}

/// A change made to the registry cache by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryUpdate {
    pub language: String,
    pub identifier: String,
    /// Spec id before the run; `None` for additions.
    pub previous: Option<String>,
    /// Spec id after the run; `None` for removals.
    pub current: Option<String>,
}

/// A document whose every source is orphaned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneCandidate {
    pub spec_id: String,
    /// Directory removed by the prune executor.
    pub dir: PathBuf,
    pub sources: Vec<SourceRef>,
    /// Registry entries dropped together with the document.
    pub registry_entries: Vec<SourceRef>,
}

/// A document with some, but not all, sources orphaned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartialOrphan {
    pub spec_id: String,
    pub orphaned: Vec<SourceRef>,
    pub remaining: Vec<SourceRef>,
}

/// Cross-document problems found while building the declared set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Two documents declare the same source. The lowest spec id owns it.
    #[error("{language}:{identifier} is declared by {kept} and {ignored}; keeping {kept}")]
    DuplicateDeclaration {
        language: String,
        identifier: String,
        kept: String,
        ignored: String,
    },
}

/// Record counts per classification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub orphaned: usize,
    pub ambiguous: usize,
    pub stale: usize,
    pub unregistered: usize,
    pub unindexed: usize,
    pub registered_live: usize,
}

impl Summary {
    pub fn get(&self, classification: Classification) -> usize {
        match classification {
            Classification::Orphaned => self.orphaned,
            Classification::Ambiguous => self.ambiguous,
            Classification::Stale => self.stale,
            Classification::Unregistered => self.unregistered,
            Classification::Unindexed => self.unindexed,
            Classification::RegisteredLive => self.registered_live,
        }
    }

    fn bump(&mut self, classification: Classification) {
        let slot = match classification {
            Classification::Orphaned => &mut self.orphaned,
            Classification::Ambiguous => &mut self.ambiguous,
            Classification::Stale => &mut self.stale,
            Classification::Unregistered => &mut self.unregistered,
            Classification::Unindexed => &mut self.unindexed,
            Classification::RegisteredLive => &mut self.registered_live,
        };
        *slot += 1;
    }
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub summary: Summary,
    /// Sorted by classification, spec id, language, then identifier.
    pub records: Vec<DriftRecord>,
    pub registry_updates: Vec<RegistryUpdate>,
    pub prune_candidates: Vec<PruneCandidate>,
    pub partial_orphans: Vec<PartialOrphan>,
    pub diagnostics: Vec<Diagnostic>,
    /// Problems from the document scan, filled in by the caller.
    pub document_issues: Vec<DocumentIssue>,
    /// External oracle queries issued while gathering evidence.
    pub vcs_queries: usize,
    /// The input registry with stale entries removed and declared ones
    /// added or corrected. Prune actions are not applied.
    #[serde(skip)]
    pub registry: Registry,
}

impl ReconciliationReport {
    /// Records of one classification, in report order.
    pub fn records_with(
        &self,
        classification: Classification,
    ) -> impl Iterator<Item = &DriftRecord> {
        self.records
            .iter()
            .filter(move |record| record.classification == classification)
    }

    /// Whether the repaired registry differs from the input one.
    pub fn registry_changed(&self) -> bool {
        !self.registry_updates.is_empty()
    }

    /// Whether a check run should fail: the registry needs repair, or
    /// pruning is enabled and something would be pruned.
    pub fn has_actionable_drift(&self, mode: &Mode) -> bool {
        self.registry_changed() || (mode.prune && !self.prune_candidates.is_empty())
    }
}

/// Existence facts about the working tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredSources {
    root: PathBuf,
    present: BTreeMap<String, BTreeSet<String>>,
    walked: BTreeSet<String>,
}

impl DiscoveredSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Workspace root the identifiers are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record the result of a full walk of one language.
    pub fn insert_walk(&mut self, language: &str, identifiers: BTreeSet<String>) {
        self.walked.insert(language.to_string());
        self.present
            .entry(language.to_string())
            .or_default()
            .extend(identifiers);
    }

    /// Record the result of probing a single identifier.
    pub fn insert_probe(&mut self, language: &str, identifier: &str, exists: bool) {
        if exists {
            self.present
                .entry(language.to_string())
                .or_default()
                .insert(identifier.to_string());
        }
    }

    pub fn exists(&self, language: &str, identifier: &str) -> bool {
        self.present
            .get(language)
            .is_some_and(|set| set.contains(identifier))
    }

    /// Whether `language` was enumerated rather than probed.
    pub fn is_walked(&self, language: &str) -> bool {
        self.walked.contains(language)
    }

    fn walks(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.present
            .iter()
            .filter(|(language, _)| self.walked.contains(*language))
            .map(|(language, set)| (language.as_str(), set))
    }

    /// Collect existence facts for one run.
    ///
    /// Languages known to `discovery` are walked in full. In existing-only
    /// mode, and for languages discovery has no rules for, each identifier
    /// from the registry or the documents is probed individually instead.
    /// Identifiers a walk skipped, for instance because of an exclude, are
    /// probed as well so a present file is never mistaken for a missing one.
    pub fn gather(
        root: &Path,
        discovery: &dyn SourceDiscovery,
        registry: &Registry,
        documents: &[SpecDocument],
        mode: &Mode,
    ) -> Result<Self> {
        let mut sources = Self::new(root);
        let known: BTreeSet<String> = discovery.languages().into_iter().collect();

        let mut wanted: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (language, identifier, _) in registry.iter() {
            wanted.entry(language).or_default().insert(identifier);
        }
        for source in documents.iter().flat_map(SpecDocument::sources) {
            wanted
                .entry(source.language.as_str())
                .or_default()
                .insert(source.identifier.as_str());
        }

        let mut languages: BTreeSet<&str> = wanted.keys().copied().collect();
        if !mode.existing_only {
            languages.extend(known.iter().map(String::as_str));
        }

        for language in languages.into_iter().filter(|l| mode.includes(l)) {
            if !mode.existing_only && known.contains(language) {
                let found = discovery.discover(root, language)?;
                sources.insert_walk(language, found);
            }
            for identifier in wanted.get(language).into_iter().flatten() {
                if !sources.exists(language, identifier) {
                    let exists = discovery.exists(root, language, identifier);
                    sources.insert_probe(language, identifier, exists);
                }
            }
        }

        Ok(sources)
    }
}

/// Declared sources keyed by `(language, identifier)`.
///
/// When several documents declare the same source, the lowest spec id wins.
fn declared_sources(documents: &[SpecDocument]) -> (BTreeMap<SourceRef, String>, Vec<Diagnostic>) {
    let mut ordered: Vec<&SpecDocument> = documents.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let mut declared: BTreeMap<SourceRef, String> = BTreeMap::new();
    let mut diagnostics = Vec::new();
    for document in ordered {
        for source in document.sources() {
            let key = SourceRef::from(source);
            match declared.get(&key) {
                Some(kept) if *kept != document.id => {
                    diagnostics.push(Diagnostic::DuplicateDeclaration {
                        language: key.language.clone(),
                        identifier: key.identifier.clone(),
                        kept: kept.clone(),
                        ignored: document.id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    declared.insert(key, document.id.clone());
                }
            }
        }
    }
    (declared, diagnostics)
}

/// Ask the oracle about every declared source that is missing.
///
/// Nothing else is queried, so the number of external calls is bounded by
/// the number of missing sources. In existing-only mode only sources that
/// are already registered are checked.
pub fn gather_vcs_evidence(
    registry: &Registry,
    documents: &[SpecDocument],
    sources: &DiscoveredSources,
    oracle: &dyn VcsOracle,
    mode: &Mode,
) -> BTreeMap<SourceRef, VcsStatus> {
    let (declared, _) = declared_sources(documents);

    declared
        .into_keys()
        .filter(|key| mode.includes(&key.language))
        .filter(|key| !sources.exists(&key.language, &key.identifier))
        .filter(|key| !mode.existing_only || registry.contains(&key.language, &key.identifier))
        .map(|key| {
            let path = identifier_path(sources.root(), &key.identifier);
            let status = oracle.classify(&path);
            debug!("Oracle: {} is {}", key, status.as_str());
            (key, status)
        })
        .collect()
}

/// Classify every pair and compute registry repairs and prune candidates.
///
/// Pure: reads its inputs and returns a new report.
pub fn diff(
    registry: &Registry,
    documents: &[SpecDocument],
    sources: &DiscoveredSources,
    vcs: &BTreeMap<SourceRef, VcsStatus>,
    mode: &Mode,
) -> ReconciliationReport {
    let (declared, diagnostics) = declared_sources(documents);
    let mut repaired = registry.clone();
    let mut records = Vec::new();
    let mut updates = Vec::new();
    let mut classes: BTreeMap<&SourceRef, Classification> = BTreeMap::new();

    // Registry entries nobody declares any more.
    for (language, identifier, spec_id) in registry.iter() {
        if !mode.includes(language) || declared.contains_key(&SourceRef::new(language, identifier))
        {
            continue;
        }
        records.push(DriftRecord {
            classification: Classification::Stale,
            language: language.to_string(),
            identifier: identifier.to_string(),
            spec_id: Some(spec_id.to_string()),
            evidence: Evidence {
                registered: Some(spec_id.to_string()),
                declared: false,
                on_disk: sources.exists(language, identifier),
                vcs: None,
            },
        });
        updates.push(RegistryUpdate {
            language: language.to_string(),
            identifier: identifier.to_string(),
            previous: Some(spec_id.to_string()),
            current: None,
        });
        repaired.remove(language, identifier);
    }

    // Declared sources against the tree and the registry.
    for (key, spec_id) in &declared {
        if !mode.includes(&key.language) {
            continue;
        }
        let registered = registry.get(&key.language, &key.identifier);
        let on_disk = sources.exists(&key.language, &key.identifier);
        let status = vcs.get(key).copied();

        let classification = if on_disk {
            match registered {
                Some(_) => Classification::RegisteredLive,
                None => Classification::Unindexed,
            }
        } else if mode.existing_only && registered.is_none() {
            continue;
        } else {
            match status {
                Some(VcsStatus::TrackedThenDeleted) => Classification::Orphaned,
                _ => Classification::Ambiguous,
            }
        };

        if registered != Some(spec_id.as_str()) {
            repaired.insert(&key.language, &key.identifier, spec_id);
            updates.push(RegistryUpdate {
                language: key.language.clone(),
                identifier: key.identifier.clone(),
                previous: registered.map(str::to_string),
                current: Some(spec_id.clone()),
            });
        }

        classes.insert(key, classification);
        records.push(DriftRecord {
            classification,
            language: key.language.clone(),
            identifier: key.identifier.clone(),
            spec_id: Some(spec_id.clone()),
            evidence: Evidence {
                registered: registered.map(str::to_string),
                declared: true,
                on_disk,
                vcs: status,
            },
        });
    }

    // Sources on disk that nothing knows about.
    if !mode.existing_only {
        for (language, identifiers) in sources.walks() {
            if !mode.includes(language) {
                continue;
            }
            for identifier in identifiers {
                let key = SourceRef::new(language, identifier);
                if declared.contains_key(&key) || registry.contains(language, identifier) {
                    continue;
                }
                records.push(DriftRecord {
                    classification: Classification::Unregistered,
                    language: key.language,
                    identifier: key.identifier,
                    spec_id: None,
                    evidence: Evidence {
                        registered: None,
                        declared: false,
                        on_disk: true,
                        vcs: None,
                    },
                });
            }
        }
    }

    // Per-document aggregation.
    let mut prune_candidates = Vec::new();
    let mut partial_orphans = Vec::new();
    for document in documents {
        let keys: Vec<SourceRef> = document.sources().iter().map(SourceRef::from).collect();
        let (orphaned, remaining): (Vec<SourceRef>, Vec<SourceRef>) = keys
            .iter()
            .cloned()
            .partition(|key| classes.get(key) == Some(&Classification::Orphaned));
        if orphaned.is_empty() {
            continue;
        }
        if remaining.is_empty() {
            let registry_entries = repaired
                .entries_for_spec(&document.id)
                .into_iter()
                .map(|(language, identifier)| SourceRef {
                    language,
                    identifier,
                })
                .collect();
            prune_candidates.push(PruneCandidate {
                spec_id: document.id.clone(),
                dir: document.dir.clone(),
                sources: keys,
                registry_entries,
            });
        } else {
            partial_orphans.push(PartialOrphan {
                spec_id: document.id.clone(),
                orphaned,
                remaining,
            });
        }
    }
    prune_candidates.sort_by(|a, b| a.spec_id.cmp(&b.spec_id));
    partial_orphans.sort_by(|a, b| a.spec_id.cmp(&b.spec_id));

    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    updates.sort_by(|a, b| {
        (&a.language, &a.identifier).cmp(&(&b.language, &b.identifier))
    });

    let mut summary = Summary::default();
    for record in &records {
        summary.bump(record.classification);
    }

    ReconciliationReport {
        summary,
        records,
        registry_updates: updates,
        prune_candidates,
        partial_orphans,
        diagnostics,
        document_issues: Vec::new(),
        vcs_queries: 0,
        registry: repaired,
    }
}

/// Gather version-control evidence and run the diff.
pub fn reconcile(
    registry: &Registry,
    documents: &[SpecDocument],
    sources: &DiscoveredSources,
    oracle: &dyn VcsOracle,
    mode: &Mode,
) -> ReconciliationReport {
    let before = oracle.queries();
    let vcs = gather_vcs_evidence(registry, documents, sources, oracle, mode);
    let mut report = diff(registry, documents, sources, &vcs, mode);
    report.vcs_queries = oracle.queries().saturating_sub(before);
    debug!(
        "Reconciled {} record(s), {} registry update(s), {} prune candidate(s)",
        report.records.len(),
        report.registry_updates.len(),
        report.prune_candidates.len()
    );
    report
}
