//! Basic functionality integration tests for dcp CLI.

#[path = "../common/mod.rs"]
mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestFixture;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_basic_directory_copy() {
    let fx = TestFixture::new();
    fx.write_src("hello.txt", "hello world");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join("hello.txt"), "hello world");
}

#[test]
fn test_nested_files_flattened_into_top_level() {
    let fx = TestFixture::new();
    fx.write_src("file1.txt", "content1");
    fx.write_src("subdir/file2.txt", "content-2");
    fx.write_src("subdir/nested/file3.txt", "content--3");

    fx.dcp().assert().success();

    assert_eq!(fx.dst_names(), vec!["file1.txt", "file2.txt", "file3.txt"]);
    assert!(!fx.dst.path().join("subdir").exists());
    fx.assert_file_content(&fx.dst.path().join("file3.txt"), "content--3");
}

#[test]
fn test_destination_created_if_missing() {
    let src = TempDir::new().unwrap();
    let base = TempDir::new().unwrap();
    fs::write(src.path().join("a.txt"), "a").unwrap();
    let dst = base.path().join("new/archive");

    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg("-q").arg(src.path()).arg(&dst).assert().success();

    assert!(dst.is_dir());
    assert_eq!(fs::read_to_string(dst.join("a.txt")).unwrap(), "a");
}

#[test]
fn test_empty_source_directory() {
    let fx = TestFixture::new();

    fx.dcp()
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to copy"));

    assert!(fx.dst_names().is_empty());
}

#[test]
fn test_summary_counts() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "same");
    fx.write_src("b/a-copy.txt", "same");
    fx.write_src("c.txt", "other content");

    fx.dcp()
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 3 source files"))
        .stdout(predicate::str::contains("Copied 2 files"))
        .stdout(predicate::str::contains("Skipped 1 duplicates"));
}

#[test]
fn test_name_collision_gets_numbered() {
    let fx = TestFixture::new();
    fx.write_src("report.txt", "this quarter");
    fx.write_dst("report.txt", "last quarter");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join("report.txt"), "last quarter");
    fx.assert_file_content(&fx.dst.path().join("report_1.txt"), "this quarter");
}

#[test]
fn test_same_name_in_different_subdirectories() {
    let fx = TestFixture::new();
    fx.write_src("2023/notes.md", "old notes");
    fx.write_src("2024/notes.md", "new notes!");

    fx.dcp().assert().success();

    assert_eq!(fx.dst_names(), vec!["notes.md", "notes_1.md"]);
    assert_eq!(
        fx.dst_contents(),
        vec![b"new notes!".to_vec(), b"old notes".to_vec()]
    );
}

#[test]
fn test_parallel_jobs_flag() {
    let fx = TestFixture::new();
    for i in 0..50 {
        fx.write_src(&format!("dir{}/file{}.dat", i % 5, i), format!("payload {}", i));
    }

    fx.dcp().arg("-j").arg("2").assert().success();

    assert_eq!(fx.count_files(fx.dst.path()), 50);
}

#[test]
fn test_fast_profile() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "fast");

    fx.dcp().arg("--profile").arg("fast").assert().success();

    fx.assert_file_content(&fx.dst.path().join("a.txt"), "fast");
}

#[test]
fn test_verbose_prints_configuration_and_details() {
    let fx = TestFixture::new();
    fx.write_src("a.txt", "x");

    fx.dcp()
        .arg("-v")
        .assert()
        .success()
        .stderr(predicate::str::contains("Effective configuration:"))
        .stdout(predicate::str::contains("Hashes computed"));
}

#[test]
fn test_help_mentions_usage() {
    let mut cmd = cargo_bin_cmd!("dcp");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("SOURCE"))
        .stdout(predicate::str::contains("DESTINATION"));
}
