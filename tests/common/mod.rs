//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new()
//!         .with_file("app/auth.py", "")
//!         .with_doc("SPEC-001", "auth", &[("python", "app/auth.py")]);
//!     fixture.command().args(["sync", "--no-git"]).assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::{document, registry_json};
    pub use super::TestFixture;
}

/// Render a specification document declaring `sources` as
/// `(language, identifier)` pairs.
#[allow(dead_code)]
pub fn document(id: &str, slug: &str, sources: &[(&str, &str)]) -> String {
    let mut text = format!("---\nid: {}\nslug: {}\nsources:", id, slug);
    if sources.is_empty() {
        text.push_str(" []\n");
    } else {
        text.push('\n');
        for (language, identifier) in sources {
            let module = identifier
                .rsplit_once('.')
                .map_or(*identifier, |(stem, _)| stem)
                .replace('/', ".");
            text.push_str(&format!(
                "  - language: {}\n    identifier: {}\n    module: {}\n",
                language, identifier, module
            ));
        }
    }
    text.push_str(&format!("---\n# {}\n", slug));
    text
}

/// Render registry JSON holding `(language, identifier, spec id)` entries.
#[allow(dead_code)]
pub fn registry_json(entries: &[(&str, &str, &str)]) -> String {
    let mut languages = serde_json::Map::new();
    for (language, identifier, spec_id) in entries {
        let table = languages
            .entry(language.to_string())
            .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
        if let serde_json::Value::Object(table) = table {
            table.insert(identifier.to_string(), serde_json::Value::from(*spec_id));
        }
    }
    let value = serde_json::json!({ "version": "2.0", "languages": languages });
    serde_json::to_string_pretty(&value).expect("registry serializes")
}

/// A temporary workspace with the default layout: documents under
/// `specs/<ID>-<slug>/spec.md` and the registry at `specs/registry.json`.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with an empty temporary directory.
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Add a `.specsync.yaml` configuration file with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.with_file(".specsync.yaml", content)
    }

    /// Add a file with the given path and content.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.temp_dir
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
        self
    }

    /// Add a specification document under `specs/<id>-<slug>/spec.md`.
    pub fn with_doc(self, id: &str, slug: &str, sources: &[(&str, &str)]) -> Self {
        let path = format!("specs/{}-{}/spec.md", id, slug);
        self.with_file(&path, &document(id, slug, sources))
    }

    /// Write `specs/registry.json`.
    pub fn with_registry(self, entries: &[(&str, &str, &str)]) -> Self {
        self.with_file("specs/registry.json", &registry_json(entries))
    }

    /// Get the path to the temporary directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn registry_path(&self) -> PathBuf {
        self.path().join("specs/registry.json")
    }

    /// Parsed registry JSON as written by the binary.
    pub fn registry(&self) -> serde_json::Value {
        let content = std::fs::read_to_string(self.registry_path()).expect("registry exists");
        serde_json::from_str(&content).expect("registry is JSON")
    }

    /// Create a child path in the temp directory.
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// Create a command configured to run in this fixture's directory.
    ///
    /// Environment that would change the workspace or colors is cleared.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("specsync");
        cmd.current_dir(self.path())
            .env_remove("SPECSYNC_WORKSPACE")
            .env_remove("SPECSYNC_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_with_doc() {
        let fixture = TestFixture::new().with_doc("SPEC-001", "auth", &[("python", "app/auth.py")]);
        let text = std::fs::read_to_string(fixture.path().join("specs/SPEC-001-auth/spec.md")).unwrap();
        assert!(text.contains("module: app.auth"));
    }

    #[test]
    fn test_registry_json_shape() {
        let json = registry_json(&[("python", "a.py", "SPEC-001")]);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["languages"]["python"]["a.py"], "SPEC-001");
    }
}
