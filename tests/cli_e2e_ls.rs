//! End-to-end tests for the `ls` command.

mod common;
use common::prelude::*;

fn fixture() -> TestFixture {
    TestFixture::new().with_registry(&[
        ("python", "app/auth.py", "SPEC-001"),
        ("python", "app/billing/invoice.py", "SPEC-002"),
        ("typescript", "web/login.ts", "SPEC-001"),
    ])
}

#[test]
fn test_ls_lists_all_entries() {
    fixture()
        .command()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("python      SPEC-001  app/auth.py"))
        .stdout(predicate::str::contains("typescript  SPEC-001  web/login.ts"))
        .stdout(predicate::str::contains("3 entries"));
}

#[test]
fn test_ls_filter_by_language() {
    fixture()
        .command()
        .args(["ls", "--language", "typescript"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web/login.ts"))
        .stdout(predicate::str::contains("app/auth.py").not())
        .stdout(predicate::str::contains("1 entry"));
}

#[test]
fn test_ls_filter_by_spec() {
    fixture()
        .command()
        .args(["ls", "--spec", "SPEC-002"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app/billing/invoice.py"))
        .stdout(predicate::str::contains("web/login.ts").not());
}

#[test]
fn test_ls_pattern_stays_within_segment() {
    fixture()
        .command()
        .args(["ls", "--pattern", "app/*.py"])
        .assert()
        .success()
        .stdout(predicate::str::contains("app/auth.py"))
        .stdout(predicate::str::contains("invoice.py").not());

    fixture()
        .command()
        .args(["ls", "--pattern", "app/**/*.py", "--count"])
        .assert()
        .success()
        .stdout("2\n");
}

#[test]
fn test_ls_empty_registry() {
    TestFixture::new()
        .command()
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No registry entries."));
}

#[test]
fn test_ls_invalid_pattern() {
    fixture()
        .command()
        .args(["ls", "--pattern", "[unclosed"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid glob pattern"));
}
