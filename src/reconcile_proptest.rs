//! Property-based tests for the reconciler's pruning rules.

#[cfg(test)]
mod proptest_tests {
    use std::collections::BTreeSet;

    use crate::document::{SourceEntry, SpecDocument};
    use crate::git::{NoVcs, StaticOracle, VcsStatus};
    use crate::reconcile::{reconcile, DiscoveredSources, Mode, SourceRef};
    use crate::registry::Registry;
    use proptest::prelude::*;

    /// Documents with 1..=4 sources each, plus which sources are still on disk.
    fn workspace() -> impl Strategy<Value = (Vec<SpecDocument>, BTreeSet<String>)> {
        prop::collection::vec(prop::collection::vec(any::<bool>(), 1..=4), 1..=5).prop_map(
            |layout| {
                let mut documents = Vec::new();
                let mut present = BTreeSet::new();
                for (d, sources) in layout.iter().enumerate() {
                    let id = format!("SPEC-{:03}", d + 1);
                    let entries = sources
                        .iter()
                        .enumerate()
                        .map(|(s, live)| {
                            let identifier = format!("d{}/s{}.py", d, s);
                            if *live {
                                present.insert(identifier.clone());
                            }
                            SourceEntry::new("python", &identifier, &identifier)
                        })
                        .collect();
                    documents.push(SpecDocument::new(&id, "doc", entries));
                }
                (documents, present)
            },
        )
    }

    fn sources(present: &BTreeSet<String>) -> DiscoveredSources {
        let mut sources = DiscoveredSources::new("/ws");
        sources.insert_walk("python", present.clone());
        sources
    }

    fn prune_mode() -> Mode {
        Mode {
            prune: true,
            ..Mode::default()
        }
    }

    proptest! {
        /// Property: a document with any discoverable source is never a candidate
        #[test]
        fn live_source_blocks_pruning((documents, present) in workspace()) {
            let oracle = StaticOracle::new().with_fallback(VcsStatus::TrackedThenDeleted);
            let report = reconcile(&Registry::new(), &documents, &sources(&present), &oracle, &prune_mode());

            for candidate in &report.prune_candidates {
                for source in &candidate.sources {
                    prop_assert!(
                        !present.contains(&source.identifier),
                        "{} is a candidate but {} is still on disk",
                        candidate.spec_id,
                        source.identifier
                    );
                }
            }
        }

        /// Property: every document whose sources are all gone is a candidate
        #[test]
        fn fully_orphaned_documents_are_candidates((documents, present) in workspace()) {
            let oracle = StaticOracle::new().with_fallback(VcsStatus::TrackedThenDeleted);
            let report = reconcile(&Registry::new(), &documents, &sources(&present), &oracle, &prune_mode());

            let expected: Vec<&str> = documents
                .iter()
                .filter(|d| d.sources().iter().all(|s| !present.contains(&s.identifier)))
                .map(|d| d.id.as_str())
                .collect();
            let actual: Vec<&str> = report.prune_candidates.iter().map(|c| c.spec_id.as_str()).collect();
            prop_assert_eq!(actual, expected);
        }

        /// Property: without version-control evidence nothing is ever pruned
        #[test]
        fn no_history_means_no_candidates((documents, present) in workspace()) {
            let report = reconcile(&Registry::new(), &documents, &sources(&present), &NoVcs, &prune_mode());
            prop_assert!(report.prune_candidates.is_empty());
        }

        /// Property: the repaired registry is exactly the declared set
        #[test]
        fn repaired_registry_matches_declarations((documents, present) in workspace()) {
            let mut registry = Registry::new();
            registry.insert("python", "stale.py", "SPEC-999");
            let report = reconcile(&registry, &documents, &sources(&present), &NoVcs, &Mode::default());

            let declared: BTreeSet<SourceRef> = documents
                .iter()
                .flat_map(|d| d.sources().iter().map(SourceRef::from))
                .collect();
            let registered: BTreeSet<SourceRef> = report
                .registry
                .iter()
                .map(|(language, identifier, _)| SourceRef::new(language, identifier))
                .collect();
            prop_assert_eq!(registered, declared);
        }
    }
}
