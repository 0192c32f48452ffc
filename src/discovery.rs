//! # Source Discovery
//!
//! Discovery enumerates the source units of one language under a workspace
//! root. The reconciler only consumes its output through the
//! [`SourceDiscovery`] trait, so per-language walkers can be swapped or
//! faked freely.
//!
//! Identifiers are `/`-separated paths relative to the workspace root, the
//! same form used as registry keys.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;
use walkdir::WalkDir;

use crate::config::{Config, LanguageConfig};
use crate::error::{Error, Result};
use crate::path::{normalize_identifier, MATCH_OPTIONS};

/// Enumerates source units per language
pub trait SourceDiscovery {
    /// Every identifier of `language` found under `root`.
    fn discover(&self, root: &Path, language: &str) -> Result<BTreeSet<String>>;

    /// Whether a single identifier exists, without a full walk.
    ///
    /// Excludes only shape enumeration: an excluded file that exists still
    /// exists.
    fn exists(&self, root: &Path, _language: &str, identifier: &str) -> bool {
        identifier_path(root, identifier).is_file()
    }

    /// Languages this discovery knows how to walk.
    fn languages(&self) -> Vec<String>;
}

/// Glob-driven discovery over the working tree
#[derive(Debug, Clone)]
pub struct GlobDiscovery {
    rules: BTreeMap<String, CompiledRule>,
    excludes: Vec<Pattern>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    patterns: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobDiscovery {
    /// Build discovery from explicit rules and global excludes.
    pub fn new(rules: &BTreeMap<String, LanguageConfig>, excludes: &[String]) -> Result<Self> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>> {
            patterns
                .iter()
                .map(|p| Pattern::new(p).map_err(Error::Glob))
                .collect()
        };

        let mut compiled = BTreeMap::new();
        for (language, rule) in rules {
            compiled.insert(
                language.clone(),
                CompiledRule {
                    patterns: compile(&rule.patterns)?,
                    exclude: compile(&rule.exclude)?,
                },
            );
        }

        Ok(Self {
            rules: compiled,
            excludes: compile(excludes)?,
        })
    }

    /// Build discovery from workspace configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.language_rules(), &config.global_excludes())
    }

    fn is_excluded(&self, rule: &CompiledRule, identifier: &str) -> bool {
        self.excludes
            .iter()
            .chain(rule.exclude.iter())
            .any(|pattern| matches(pattern, identifier))
    }

    fn is_selected(&self, rule: &CompiledRule, identifier: &str) -> bool {
        rule.patterns.iter().any(|pattern| matches(pattern, identifier))
            && !self.is_excluded(rule, identifier)
    }
}

fn matches(pattern: &Pattern, identifier: &str) -> bool {
    pattern.matches_with(identifier, MATCH_OPTIONS)
}

impl SourceDiscovery for GlobDiscovery {
    fn discover(&self, root: &Path, language: &str) -> Result<BTreeSet<String>> {
        let Some(rule) = self.rules.get(language) else {
            return Err(Error::Discovery {
                language: language.to_string(),
                message: "no discovery rules for this language".to_string(),
            });
        };

        let mut found = BTreeSet::new();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e.path(), root, &self.excludes));

        for entry in walker {
            let entry = entry.map_err(|e| Error::Discovery {
                language: language.to_string(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(identifier) = relative_identifier(root, entry.path()) else {
                continue;
            };
            if self.is_selected(rule, &identifier) {
                found.insert(identifier);
            }
        }

        debug!("Discovered {} {} source(s)", found.len(), language);
        Ok(found)
    }

    fn languages(&self) -> Vec<String> {
        self.rules.keys().cloned().collect()
    }
}

/// Prune whole directories matched by an exclude like `target/**`.
fn is_skipped_dir(path: &Path, root: &Path, excludes: &[Pattern]) -> bool {
    if !path.is_dir() {
        return false;
    }
    let Some(identifier) = relative_identifier(root, path) else {
        return false;
    };
    let probe = format!("{}/.", identifier);
    excludes.iter().any(|pattern| matches(pattern, &probe))
}

fn relative_identifier(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let identifier = normalize_identifier(&relative.to_string_lossy());
    (!identifier.is_empty()).then_some(identifier)
}

/// Fixed answers for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    sources: BTreeMap<String, BTreeSet<String>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an identifier as present on disk.
    pub fn with_source(mut self, language: &str, identifier: &str) -> Self {
        self.add(language, identifier);
        self
    }

    pub fn add(&mut self, language: &str, identifier: &str) {
        self.sources
            .entry(language.to_string())
            .or_default()
            .insert(identifier.to_string());
    }

    pub fn remove(&mut self, language: &str, identifier: &str) {
        if let Some(set) = self.sources.get_mut(language) {
            set.remove(identifier);
        }
    }
}

impl SourceDiscovery for StaticDiscovery {
    fn discover(&self, _root: &Path, language: &str) -> Result<BTreeSet<String>> {
        Ok(self.sources.get(language).cloned().unwrap_or_default())
    }

    fn exists(&self, _root: &Path, language: &str, identifier: &str) -> bool {
        self.sources
            .get(language)
            .is_some_and(|set| set.contains(identifier))
    }

    fn languages(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }
}

/// Absolute path of an identifier inside a workspace.
pub fn identifier_path(root: &Path, identifier: &str) -> PathBuf {
    identifier
        .split('/')
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}
