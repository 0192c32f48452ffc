//! End-to-end tests for pruning documents whose sources were deleted after
//! being committed. These shell out to `git` and only run with
//! `--features integration-tests`.

mod common;
use common::prelude::*;
use std::path::Path;
use std::process::Command;

fn git(dir: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args(["-c", "commit.gpgsign=false"])
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .status()
        .expect("git is installed");
    assert!(status.success(), "git {:?} failed", args);
}

/// A committed workspace with two documents, each owning one source.
fn committed_fixture() -> TestFixture {
    let fixture = TestFixture::new()
        .with_file("app/auth.py", "")
        .with_file("app/billing.py", "")
        .with_doc("SPEC-001", "auth", &[("python", "app/auth.py")])
        .with_doc("SPEC-002", "billing", &[("python", "app/billing.py")]);
    git(fixture.path(), &["init", "--quiet"]);
    fixture.command().arg("sync").assert().success();
    git(fixture.path(), &["add", "-A"]);
    git(fixture.path(), &["commit", "--quiet", "-m", "initial"]);
    fixture
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_prune_removes_orphaned_document() {
    let fixture = committed_fixture();
    git(fixture.path(), &["rm", "--quiet", "app/billing.py"]);
    git(fixture.path(), &["commit", "--quiet", "-m", "drop billing"]);

    fixture
        .command()
        .args(["sync", "--prune", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[PRUNE] Removed:"))
        .stdout(predicate::str::contains("SPEC-002"));

    fixture
        .child("specs/SPEC-002-billing")
        .assert(predicate::path::missing());
    fixture
        .child("specs/SPEC-001-auth/spec.md")
        .assert(predicate::path::exists());

    let registry = fixture.registry();
    assert!(registry["languages"]["python"].get("app/billing.py").is_none());
    assert_eq!(registry["languages"]["python"]["app/auth.py"], "SPEC-001");

    // Nothing is left to do.
    fixture
        .command()
        .args(["sync", "--check"])
        .assert()
        .success();
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_prune_dry_run_keeps_document() {
    let fixture = committed_fixture();
    std::fs::remove_file(fixture.path().join("app/billing.py")).unwrap();

    fixture
        .command()
        .args(["sync", "--prune", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[PRUNE] Would remove:"));

    fixture
        .child("specs/SPEC-002-billing/spec.md")
        .assert(predicate::path::exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_check_fails_on_prune_candidate() {
    let fixture = committed_fixture();
    std::fs::remove_file(fixture.path().join("app/billing.py")).unwrap();

    fixture
        .command()
        .args(["sync", "--prune", "--check"])
        .assert()
        .code(1);

    fixture
        .child("specs/SPEC-002-billing/spec.md")
        .assert(predicate::path::exists());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_never_committed_source_is_not_pruned() {
    let fixture = committed_fixture();
    fixture
        .child("specs/SPEC-003-draft/spec.md")
        .write_str(&document("SPEC-003", "draft", &[("python", "app/draft.py")]))
        .unwrap();

    fixture
        .command()
        .args(["sync", "--prune", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("python:app/draft.py (vcs: never-tracked)"));

    fixture
        .child("specs/SPEC-003-draft/spec.md")
        .assert(predicate::path::exists());
}
