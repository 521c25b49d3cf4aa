//! Error handling integration tests for dcp CLI.
//!
//! These tests verify proper error handling behaviors:
//! - Root validation (missing source, files where directories are expected)
//! - Same or nested roots are refused before anything is created
//! - Usage errors exit with code 2
//! - Per-file failures are counted without failing the run

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_source_not_found() {
    let dst = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg("/nonexistent/path/to/photos")
        .arg(dst.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[source_not_found]"))
        .stderr(predicate::str::contains("Source path does not exist"));
}

#[test]
fn test_missing_source_does_not_create_destination() {
    let base = TempDir::new().unwrap();
    let dst = base.path().join("never");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(base.path().join("missing"))
        .arg(&dst)
        .assert()
        .code(2);

    assert!(!dst.exists());
}

#[test]
fn test_source_is_a_file() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    let file = src.path().join("single.txt");
    fs::write(&file, "content").unwrap();

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(&file)
        .arg(dst.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[invalid_input]"))
        .stderr(predicate::str::contains("Source is not a directory"));
}

#[test]
fn test_destination_is_a_file() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");
    let target = fx.write_dst("occupied", "not a directory");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(fx.src.path())
        .arg(&target)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Destination is not a directory"));

    assert_eq!(fs::read_to_string(&target).unwrap(), "not a directory");
}

#[test]
fn test_same_directory_refused() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(fx.src.path())
        .arg(fx.src.path().join("."))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("same directory"));

    assert_eq!(fs::read_dir(fx.src.path()).unwrap().count(), 1);
}

#[test]
fn test_destination_nested_in_source_refused() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "a");
    let inner = fx.src.path().join("backup/inner");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(fx.src.path())
        .arg(&inner)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("error[invalid_input]"))
        .stderr(predicate::str::contains("nested inside"));

    assert!(!fx.src.path().join("backup").exists());
}

#[test]
fn test_source_nested_in_destination_refused() {
    let fx = TestFixture::new();
    fx.write_dst("incoming/a.txt", "a");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(fx.dst.path().join("incoming"))
        .arg(fx.dst.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nested inside"));

    assert_eq!(fx.dst_names(), Vec::<String>::new());
}

#[test]
fn test_missing_arguments_is_usage_error() {
    let src = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg(src.path()).assert().code(2);
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let fx = TestFixture::new();

    fx.dcp()
        .arg("--profile")
        .arg("turbo")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("turbo"));
}

#[test]
fn test_json_error_still_uses_error_line() {
    let dst = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg("--output")
        .arg("json")
        .arg("/nonexistent/source")
        .arg(dst.path())
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("error[source_not_found]"));
}

/// An unreadable source file is counted and skipped; the run still succeeds.
#[cfg(unix)]
#[test]
fn test_unreadable_source_file_counted() {
    use std::os::unix::fs::PermissionsExt;

    // Root reads through mode bits
    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let fx = TestFixture::new();
    fx.write_src("ok.txt", "readable");
    let locked = fx.write_src("locked.txt", "secret");
    fx.write_src("twin.txt", "secret");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let assert = fx.dcp().assert().success();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert.stdout(predicate::str::contains("Failed: 0 unreadable, 1 unhashable"));
    assert_eq!(
        fx.dst_contents(),
        vec![b"readable".to_vec(), b"secret".to_vec()]
    );
}

/// A destination file that cannot be read is ignored for duplicate
/// detection; the source file of the same size is still copied.
#[cfg(unix)]
#[test]
fn test_unreadable_destination_file_ignored() {
    use std::os::unix::fs::PermissionsExt;

    if unsafe { libc::geteuid() } == 0 {
        return;
    }

    let fx = TestFixture::new();
    fx.write_src("fresh.txt", "fresh");
    let locked = fx.write_dst("locked.txt", "stale");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    let output = fx.dcp().args(["--output", "json"]).output().unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["stats"]["plan"]["destination_hash_failures"], 1);
    assert_eq!(json["stats"]["files_copied"], 1);
    assert_eq!(
        fs::read_to_string(fx.dst.path().join("fresh.txt")).unwrap(),
        "fresh"
    );
}
