//! Boundary cases integration tests for dcp CLI.
//!
//! These tests verify behavior at edge cases and boundary conditions:
//! - Empty files
//! - Files larger than the copy buffer
//! - Unicode, spaces and dotfiles in names
//! - Deep directory nesting
//! - Many files in a single directory
//! - Non-regular files (FIFOs)

use super::common::TestFixture;
use predicates::prelude::*;
use std::fs;

// =============================================================================
// Empty File Tests
// =============================================================================

#[test]
fn test_copy_single_empty_file() {
    let fx = TestFixture::new();
    fx.write_src("empty.txt", "");

    fx.dcp().assert().success();

    let copied = fx.dst.path().join("empty.txt");
    assert!(copied.exists());
    assert_eq!(fs::metadata(copied).unwrap().len(), 0);
}

#[test]
fn test_empty_file_not_copied_when_destination_has_one() {
    let fx = TestFixture::new();
    fx.write_src("new-empty.txt", "");
    fx.write_dst("placeholder", "");

    fx.dcp()
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to copy"));

    assert_eq!(fx.dst_names(), vec!["placeholder"]);
}

// =============================================================================
// Large File Tests
// =============================================================================

#[test]
fn test_file_larger_than_copy_buffer() {
    let fx = TestFixture::new();
    let content: Vec<u8> = (0..20 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    fx.write_src("big.bin", &content);

    fx.dcp().assert().success();

    assert_eq!(fs::read(fx.dst.path().join("big.bin")).unwrap(), content);
}

#[test]
fn test_large_duplicates_copied_once() {
    let fx = TestFixture::new();
    let content = vec![0xA5u8; 3 * 1024 * 1024];
    fx.write_src("a/big.img", &content);
    fx.write_src("b/big.img", &content);

    fx.dcp().assert().success();

    assert_eq!(fx.dst_names(), vec!["big.img"]);
}

#[test]
fn test_binary_content_preserved() {
    let fx = TestFixture::new();
    let content: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    fx.write_src("blob.dat", &content);

    fx.dcp().assert().success();

    assert_eq!(fs::read(fx.dst.path().join("blob.dat")).unwrap(), content);
}

// =============================================================================
// File Name Tests
// =============================================================================

#[test]
fn test_unicode_and_space_names() {
    let fx = TestFixture::new();
    fx.write_src("фото/снимок 1.jpg", "unicode");
    fx.write_src("my docs/résumé final.pdf", "resume!");
    fx.write_src("日本語.txt", "japanese text");

    fx.dcp().assert().success();

    assert_eq!(
        fx.dst_names(),
        vec!["résumé final.pdf", "снимок 1.jpg", "日本語.txt"]
    );
}

#[test]
fn test_dotfile_collision_appends_suffix() {
    let fx = TestFixture::new();
    fx.write_src(".bashrc", "export PATH=/new");
    fx.write_dst(".bashrc", "export PATH=/old/bin");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join(".bashrc"), "export PATH=/old/bin");
    fx.assert_file_content(&fx.dst.path().join(".bashrc_1"), "export PATH=/new");
}

#[test]
fn test_multi_dot_collision() {
    let fx = TestFixture::new();
    fx.write_src("logs.tar.gz", "new archive");
    fx.write_dst("logs.tar.gz", "old archive!");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join("logs.tar_1.gz"), "new archive");
}

#[test]
fn test_collision_skips_taken_suffixes() {
    let fx = TestFixture::new();
    fx.write_src("img.png", "third version");
    fx.write_dst("img.png", "first");
    fx.write_dst("img_1.png", "second!");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join("img_2.png"), "third version");
}

// =============================================================================
// Directory Shape Tests
// =============================================================================

#[test]
fn test_deep_nesting_flattened() {
    let fx = TestFixture::new();
    let deep: String = (0..40).map(|i| format!("level{}/", i)).collect();
    fx.write_src(&format!("{}bottom.txt", deep), "deep content");

    fx.dcp().assert().success();

    fx.assert_file_content(&fx.dst.path().join("bottom.txt"), "deep content");
}

#[test]
fn test_many_files_single_directory() {
    let fx = TestFixture::new();
    for i in 0..500 {
        fx.write_src(&format!("bulk/file{:04}.txt", i), format!("unique {}", i));
    }

    fx.dcp()
        .assert()
        .success()
        .stdout(predicate::str::contains("Copied 500 files"));

    assert_eq!(fx.count_files(fx.dst.path()), 500);
}

#[test]
fn test_empty_subdirectories_ignored() {
    let fx = TestFixture::new();
    fs::create_dir_all(fx.src.path().join("a/b/c")).unwrap();
    fs::create_dir_all(fx.src.path().join("d")).unwrap();
    fx.write_src("d/only.txt", "only");

    fx.dcp().assert().success();

    assert_eq!(fx.dst_names(), vec!["only.txt"]);
    assert!(!fx.dst.path().join("a").exists());
}

// =============================================================================
// Non-regular File Tests
// =============================================================================

#[cfg(unix)]
#[test]
fn test_fifo_skipped_as_non_regular() {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let fx = TestFixture::new();
    fx.write_src("regular.txt", "regular");
    let fifo = fx.src.path().join("pipe");
    let c_path = CString::new(fifo.as_os_str().as_bytes()).unwrap();
    assert_eq!(unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) }, 0);

    fx.dcp()
        .assert()
        .success()
        .stdout(predicate::str::contains("Scanned 1 source files"))
        .stdout(predicate::str::contains("1 non-regular files"));

    assert_eq!(fx.dst_names(), vec!["regular.txt"]);
    assert!(!fx.dst.path().join("pipe").exists());
}
