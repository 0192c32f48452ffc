//! # Workspace Configuration
//!
//! A workspace may carry an optional `.specsync.yaml` at its root. Every
//! field has a default, so a missing file is equivalent to:
//!
//! ```yaml
//! specs_dir: specs
//! registry: specs/registry.json
//! document_file: spec.md
//! git_timeout_secs: 10
//! exclude: []
//! languages: {}
//! ```
//!
//! `languages` adds or overrides per-language discovery rules:
//!
//! ```yaml
//! languages:
//!   python:
//!     patterns: ["src/**/*.py"]
//!     exclude: ["src/generated/**"]
//! ```
//!
//! Languages not listed fall back to the built-in patterns in
//! [`crate::defaults::default_languages`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{Error, Result};

/// Discovery rules for one language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LanguageConfig {
    /// Glob patterns, relative to the workspace root, selecting source units.
    pub patterns: Vec<String>,
    /// Glob patterns excluded for this language only.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Parsed `.specsync.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Directory holding one sub-directory per specification document.
    pub specs_dir: PathBuf,
    /// Registry file location.
    pub registry: PathBuf,
    /// File name of the document inside each specification directory.
    pub document_file: String,
    /// Upper bound on every git query, in seconds.
    pub git_timeout_secs: u64,
    /// Glob patterns excluded for every language.
    pub exclude: Vec<String>,
    /// Per-language overrides of the built-in discovery rules.
    pub languages: BTreeMap<String, LanguageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            specs_dir: PathBuf::from(defaults::DEFAULT_SPECS_DIR),
            registry: PathBuf::from(defaults::DEFAULT_SPECS_DIR).join(defaults::DEFAULT_REGISTRY_FILENAME),
            document_file: defaults::DEFAULT_DOCUMENT_FILENAME.to_string(),
            git_timeout_secs: defaults::DEFAULT_GIT_TIMEOUT_SECS,
            exclude: Vec::new(),
            languages: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Git query timeout as a `Duration`, never below one second.
    pub fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_secs.max(1))
    }

    /// Built-in language rules merged with the configured overrides.
    pub fn language_rules(&self) -> BTreeMap<String, LanguageConfig> {
        let mut rules = defaults::default_languages();
        for (name, rule) in &self.languages {
            rules.insert(name.clone(), rule.clone());
        }
        rules
    }

    /// Every exclude pattern applied to all languages: the built-ins, the
    /// configured ones and the specs directory itself.
    pub fn global_excludes(&self) -> Vec<String> {
        let mut excludes: Vec<String> = defaults::DEFAULT_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .collect();
        let specs = self.specs_dir.to_string_lossy().replace('\\', "/");
        let specs = specs.trim_end_matches('/');
        if !specs.is_empty() && specs != "." {
            excludes.push(format!("{}/**", specs));
        }
        excludes.extend(self.exclude.iter().cloned());
        excludes
    }

    /// Resolve the specs directory against a workspace root.
    pub fn specs_path(&self, root: &Path) -> PathBuf {
        root.join(&self.specs_dir)
    }

    /// Resolve the registry file against a workspace root.
    pub fn registry_path(&self, root: &Path) -> PathBuf {
        root.join(&self.registry)
    }
}

/// Parse configuration YAML. An empty document yields the defaults.
pub fn parse(yaml_content: &str) -> Result<Config> {
    if yaml_content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(yaml_content).map_err(|e| Error::Config {
        message: e.to_string(),
        hint: hint_for(&e.to_string()),
    })?;

    for (name, rule) in &config.languages {
        if rule.patterns.is_empty() {
            return Err(Error::Config {
                message: format!("language `{}` has no patterns", name),
                hint: Some("Add at least one glob, e.g. `patterns: [\"**/*.py\"]`".to_string()),
            });
        }
        for pattern in rule.patterns.iter().chain(rule.exclude.iter()) {
            glob::Pattern::new(pattern)?;
        }
    }
    for pattern in &config.exclude {
        glob::Pattern::new(pattern)?;
    }

    Ok(config)
}

/// Load configuration from a file.
pub fn from_file(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse(&content)
}

/// Load `.specsync.yaml` from a workspace root, falling back to defaults
/// when the file does not exist.
pub fn load_for_workspace(root: &Path) -> Result<Config> {
    let path = root.join(defaults::DEFAULT_CONFIG_FILENAME);
    if path.exists() {
        from_file(&path)
    } else {
        Ok(Config::default())
    }
}

fn hint_for(message: &str) -> Option<String> {
    if message.contains("unknown field") {
        Some(
            "Valid keys are specs_dir, registry, document_file, git_timeout_secs, exclude, languages"
                .to_string(),
        )
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.specs_dir, PathBuf::from("specs"));
        assert_eq!(config.registry, PathBuf::from("specs/registry.json"));
        assert_eq!(config.document_file, "spec.md");
        assert_eq!(config.git_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(parse("").unwrap(), Config::default());
        assert_eq!(parse("   \n").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_partial_config() {
        let config = parse(
            r#"
specs_dir: docs/specs
git_timeout_secs: 3
languages:
  python:
    patterns: ["src/**/*.py"]
    exclude: ["src/generated/**"]
"#,
        )
        .unwrap();

        assert_eq!(config.specs_dir, PathBuf::from("docs/specs"));
        assert_eq!(config.registry, PathBuf::from("specs/registry.json"));
        assert_eq!(config.git_timeout_secs, 3);

        let rules = config.language_rules();
        assert_eq!(rules["python"].patterns, vec!["src/**/*.py".to_string()]);
        assert!(rules.contains_key("rust"), "built-in languages remain");
    }

    #[test]
    fn test_unknown_field_has_hint() {
        let err = parse("langs: {}").unwrap_err();
        let display = err.to_string();
        assert!(display.contains("unknown field"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_language_without_patterns_is_rejected() {
        let err = parse("languages:\n  python:\n    patterns: []\n").unwrap_err();
        assert!(err.to_string().contains("no patterns"));
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        let err = parse("exclude: [\"[\"]\n").unwrap_err();
        assert!(matches!(err, Error::Glob(_)));
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = parse("git_timeout_secs: 0").unwrap();
        assert_eq!(config.git_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_global_excludes_cover_specs_dir() {
        let config = parse("specs_dir: docs/specs/").unwrap();
        assert!(config
            .global_excludes()
            .contains(&"docs/specs/**".to_string()));
    }

    #[test]
    fn test_load_for_workspace() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(
            load_for_workspace(temp_dir.path()).unwrap(),
            Config::default()
        );

        fs::write(temp_dir.path().join(".specsync.yaml"), "document_file: README.md\n").unwrap();
        let config = load_for_workspace(temp_dir.path()).unwrap();
        assert_eq!(config.document_file, "README.md");
    }
}
