//! # Registry Store
//!
//! The registry is the persisted cache mapping `(language, identifier)` to a
//! specification id. It lives in a single JSON file:
//!
//! ```json
//! {
//!   "version": "2.0",
//!   "languages": {
//!     "python": { "app/auth.py": "SPEC-001" }
//!   }
//! }
//! ```
//!
//! The registry is loaded once per invocation, mutated in memory and written
//! back with a single atomic save: the new content goes to a temporary file
//! in the destination directory which is then renamed over the old file, so
//! an interrupted write never leaves a half-written registry behind.
//!
//! Only schema version [`SCHEMA_VERSION`] is accepted. Older registries are
//! rejected with [`Error::SchemaMismatch`] rather than migrated.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The only registry schema version this engine reads and writes.
pub const SCHEMA_VERSION: &str = "2.0";

/// Identifier → specification id mapping for one language.
pub type LanguageEntries = BTreeMap<String, String>;

/// Persisted `(language, identifier) → spec id` cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Registry {
    /// Schema version string, always [`SCHEMA_VERSION`] once loaded.
    pub version: String,
    /// Language name → identifier → specification id.
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageEntries>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create an empty registry at the current schema version.
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            languages: BTreeMap::new(),
        }
    }

    /// Look up the specification registered for an identifier.
    pub fn get(&self, language: &str, identifier: &str) -> Option<&str> {
        self.languages
            .get(language)
            .and_then(|entries| entries.get(identifier))
            .map(String::as_str)
    }

    /// Whether the registry has an entry for this identifier.
    pub fn contains(&self, language: &str, identifier: &str) -> bool {
        self.get(language, identifier).is_some()
    }

    /// Register an identifier, returning the spec id it previously mapped to.
    pub fn insert(&mut self, language: &str, identifier: &str, spec_id: &str) -> Option<String> {
        self.languages
            .entry(language.to_string())
            .or_default()
            .insert(identifier.to_string(), spec_id.to_string())
    }

    /// Remove an identifier, returning the spec id it mapped to.
    ///
    /// A language left without entries is dropped so the file does not
    /// accumulate empty objects.
    pub fn remove(&mut self, language: &str, identifier: &str) -> Option<String> {
        let entries = self.languages.get_mut(language)?;
        let removed = entries.remove(identifier);
        if entries.is_empty() {
            self.languages.remove(language);
        }
        removed
    }

    /// Entries for one language, if any.
    pub fn entries(&self, language: &str) -> Option<&LanguageEntries> {
        self.languages.get(language)
    }

    /// Iterate every `(language, identifier, spec_id)` triple in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.languages.iter().flat_map(|(language, entries)| {
            entries
                .iter()
                .map(move |(identifier, spec)| (language.as_str(), identifier.as_str(), spec.as_str()))
        })
    }

    /// All `(language, identifier)` pairs registered to a specification.
    pub fn entries_for_spec(&self, spec_id: &str) -> Vec<(String, String)> {
        self.iter()
            .filter(|(_, _, spec)| *spec == spec_id)
            .map(|(language, identifier, _)| (language.to_string(), identifier.to_string()))
            .collect()
    }

    /// Language names present in the registry.
    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.languages.keys().map(String::as_str)
    }

    /// Total number of registered identifiers across all languages.
    pub fn len(&self) -> usize {
        self.languages.values().map(BTreeMap::len).sum()
    }

    /// Whether the registry holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load a registry from disk.
///
/// A missing file yields an empty registry at the current schema version.
/// Unreadable JSON, or JSON that does not have the registry shape, is
/// [`Error::Corrupt`]. A well-formed registry with another version is
/// [`Error::SchemaMismatch`].
pub fn load(path: &Path) -> Result<Registry> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!("No registry at {}, starting empty", path.display());
            return Ok(Registry::new());
        }
        Err(err) => return Err(Error::Io(err)),
    };

    parse(&content, path)
}

/// Parse registry JSON. `path` is only used for error messages.
pub fn parse(content: &str, path: &Path) -> Result<Registry> {
    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| Error::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    // Check the version before the shape so an old schema reports as a
    // mismatch even when its layout differs from the current one.
    let found = match value.get("version") {
        Some(serde_json::Value::String(version)) => version.clone(),
        Some(other) => {
            return Err(Error::Corrupt {
                path: path.to_path_buf(),
                message: format!("`version` must be a string, got {}", other),
            })
        }
        None => {
            return Err(Error::Corrupt {
                path: path.to_path_buf(),
                message: "missing `version` field".to_string(),
            })
        }
    };

    if found != SCHEMA_VERSION {
        return Err(Error::SchemaMismatch {
            path: path.to_path_buf(),
            found,
            expected: SCHEMA_VERSION.to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| Error::Corrupt {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Atomically write a registry to disk.
///
/// The JSON is written to a temporary file in the same directory, flushed
/// and then renamed over `path`. If anything fails before the rename the
/// previous registry file is left untouched.
pub fn save(registry: &Registry, path: &Path) -> Result<()> {
    save_with(registry, path, |file, bytes| file.write_all(bytes))
}

/// [`save`] with the write into the temporary file supplied by the caller.
///
/// The temporary file is removed when `write` fails.
fn save_with<W>(registry: &Registry, path: &Path, write: W) -> Result<()>
where
    W: FnOnce(&mut fs::File, &[u8]) -> std::io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut json = serde_json::to_string_pretty(registry)?;
    json.push('\n');

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    write(tmp.as_file_mut(), json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    info!(
        "Saved registry with {} entries to {}",
        registry.len(),
        path.display()
    );
    Ok(())
}

/// Where the registry is loaded from and saved to.
///
/// The reconciler and prune executor receive the registry as a value; the
/// store is only touched at the edges of a run, which lets tests swap in
/// [`MemoryRegistryStore`].
pub trait RegistryStore {
    /// Load the current registry.
    fn load(&self) -> Result<Registry>;
    /// Persist a registry, replacing the previous one atomically.
    fn save(&self, registry: &Registry) -> Result<()>;
}

/// Registry store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileRegistryStore {
    path: PathBuf,
}

impl FileRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for FileRegistryStore {
    fn load(&self) -> Result<Registry> {
        load(&self.path)
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        save(registry, &self.path)
    }
}

/// In-memory registry store for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    registry: Option<Registry>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a registry.
    pub fn with_registry(registry: Registry) -> Self {
        let store = Self::default();
        if let Ok(mut state) = store.state.lock() {
            state.registry = Some(registry);
        }
        store
    }

    /// Make every subsequent save fail with an I/O error.
    pub fn fail_saves(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_saves = true;
        }
    }

    /// The currently stored registry, if one was ever saved or seeded.
    pub fn current(&self) -> Option<Registry> {
        self.state.lock().ok().and_then(|s| s.registry.clone())
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state.lock().map(|s| s.saves).unwrap_or_default()
    }
}

impl RegistryStore for MemoryRegistryStore {
    fn load(&self) -> Result<Registry> {
        Ok(self.current().unwrap_or_default())
    }

    fn save(&self, registry: &Registry) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| {
            Error::Io(std::io::Error::other("registry store lock poisoned"))
        })?;
        if state.fail_saves {
            return Err(Error::Io(std::io::Error::other("simulated save failure")));
        }
        state.registry = Some(registry.clone());
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Registry {
        let mut registry = Registry::new();
        registry.insert("python", "mod.py", "SPEC-001");
        registry.insert("python", "pkg/util.py", "SPEC-002");
        registry.insert("rust", "src/lib.rs", "SPEC-003");
        registry
    }

    #[test]
    fn test_load_missing_file_returns_empty_registry() {
        let temp_dir = TempDir::new().unwrap();
        let registry = load(&temp_dir.path().join("registry.json")).unwrap();
        assert_eq!(registry.version, SCHEMA_VERSION);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("specs/registry.json");

        save(&sample(), &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, sample());
        assert_eq!(loaded.get("python", "mod.py"), Some("SPEC-001"));
    }

    #[test]
    fn test_saved_file_layout() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");

        save(&sample(), &path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(value["version"], "2.0");
        assert_eq!(value["languages"]["rust"]["src/lib.rs"], "SPEC-003");
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");

        save(&sample(), &path).unwrap();
        save(&Registry::new(), &path).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(&path, r#"{"version": "1.0", "modules": {"mod.py": "SPEC-001"}}"#).unwrap();

        let err = load(&path).unwrap_err();
        match err {
            Error::SchemaMismatch { found, expected, .. } => {
                assert_eq!(found, "1.0");
                assert_eq!(expected, "2.0");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_json_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load(&path), Err(Error::Corrupt { .. })));
    }

    #[test]
    fn test_wrong_shape_is_corrupt() {
        let path = Path::new("registry.json");
        let err = parse(r#"{"version": "2.0", "languages": {"python": ["mod.py"]}}"#, path)
            .unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));

        let err = parse(r#"{"languages": {}}"#, path).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));

        let err = parse(r#"{"version": 2}"#, path).unwrap_err();
        assert!(matches!(err, Error::Corrupt { .. }));
    }

    #[test]
    fn test_remove_drops_empty_language() {
        let mut registry = sample();
        assert_eq!(registry.remove("rust", "src/lib.rs"), Some("SPEC-003".to_string()));
        assert!(registry.entries("rust").is_none());
        assert_eq!(registry.remove("rust", "src/lib.rs"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_entries_for_spec() {
        let mut registry = sample();
        registry.insert("rust", "src/util.rs", "SPEC-001");
        assert_eq!(
            registry.entries_for_spec("SPEC-001"),
            vec![
                ("python".to_string(), "mod.py".to_string()),
                ("rust".to_string(), "src/util.rs".to_string()),
            ]
        );
    }

    #[test]
    fn test_failed_write_keeps_previous_registry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        save(&sample(), &path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        // Half of the new content lands in the temporary file, then the
        // write fails.
        let result = save_with(&Registry::new(), &path, |file, bytes| {
            file.write_all(&bytes[..bytes.len() / 2])?;
            Err(std::io::Error::other("disk full"))
        });
        assert!(matches!(result, Err(Error::Io(_))));

        assert_eq!(fs::read_to_string(&path).unwrap(), before);
        assert_eq!(load(&path).unwrap(), sample());

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("registry.json")]);
    }

    #[test]
    fn test_failed_rename_keeps_previous_registry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("registry.json");
        save(&sample(), &path).unwrap();

        // Persisting onto a non-empty directory fails at the rename step.
        let blocked = temp_dir.path().join("blocked");
        fs::create_dir_all(blocked.join("inner")).unwrap();
        assert!(save(&Registry::new(), &blocked).is_err());

        assert_eq!(load(&path).unwrap(), sample());
        let leftovers = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 2, "only registry.json and blocked/ remain");
    }

    #[test]
    fn test_memory_store_failure_keeps_previous_value() {
        let store = MemoryRegistryStore::with_registry(sample());
        store.fail_saves();

        assert!(store.save(&Registry::new()).is_err());
        assert_eq!(store.load().unwrap(), sample());
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileRegistryStore::new(temp_dir.path().join("registry.json"));
        assert!(store.load().unwrap().is_empty());
        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }
}
