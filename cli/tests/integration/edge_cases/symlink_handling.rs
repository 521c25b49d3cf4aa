//! Symlink handling integration tests for dcp CLI.
//!
//! These tests verify proper handling of symbolic links:
//! - Symlinks are counted and skipped, never copied or followed
//! - Dangling symlinks do not fail the run
//! - Symlinks to directories are not descended into
//! - Symlinks at the destination still occupy their names

#[cfg(unix)]
mod unix_tests {
    use super::super::common::TestFixture;
    use predicates::prelude::*;
    use std::fs;
    use std::os::unix::fs::symlink;

    #[test]
    fn test_symlink_to_file_skipped() {
        let fx = TestFixture::new();
        fx.write_src("target.txt", "target content");
        symlink("target.txt", fx.src.path().join("link.txt")).unwrap();

        fx.dcp()
            .assert()
            .success()
            .stdout(predicate::str::contains("Scanned 1 source files"))
            .stdout(predicate::str::contains("1 symlinks"));

        assert_eq!(fx.dst_names(), vec!["target.txt"]);
        assert!(fs::symlink_metadata(fx.dst.path().join("link.txt")).is_err());
    }

    #[test]
    fn test_symlink_to_outside_file_not_followed() {
        let fx = TestFixture::new();
        let outside = tempfile::TempDir::new().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "outside the tree").unwrap();
        symlink(&secret, fx.src.path().join("secret.txt")).unwrap();

        fx.dcp()
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing to copy"));

        assert!(fx.dst_names().is_empty());
    }

    #[test]
    fn test_dangling_symlink_skipped() {
        let fx = TestFixture::new();
        fx.write_src("real.txt", "real");
        symlink("does-not-exist", fx.src.path().join("broken")).unwrap();

        fx.dcp()
            .assert()
            .success()
            .stdout(predicate::str::contains("1 symlinks"));

        assert_eq!(fx.dst_names(), vec!["real.txt"]);
    }

    #[test]
    fn test_symlink_to_directory_not_descended() {
        let fx = TestFixture::new();
        let outside = tempfile::TempDir::new().unwrap();
        fs::write(outside.path().join("inner.txt"), "inner").unwrap();
        symlink(outside.path(), fx.src.path().join("linked-dir")).unwrap();
        fx.write_src("own.txt", "own file");

        fx.dcp().assert().success();

        assert_eq!(fx.dst_names(), vec!["own.txt"]);
    }

    #[test]
    fn test_no_symlinks_reports_zero() {
        let fx = TestFixture::new();
        fx.write_src("plain.txt", "plain");

        fx.dcp()
            .assert()
            .success()
            .stdout(predicate::str::contains("0 symlinks"));
    }

    #[test]
    fn test_destination_symlink_never_deduplicated_against() {
        let fx = TestFixture::new();
        fx.write_src("photo.jpg", "pixels");
        let elsewhere = tempfile::TempDir::new().unwrap();
        let original = elsewhere.path().join("photo.jpg");
        fs::write(&original, "pixels").unwrap();
        symlink(&original, fx.dst.path().join("photo.jpg")).unwrap();

        fx.dcp().assert().success();

        // The link is not content of the destination, and its name is taken
        fx.assert_file_content(&fx.dst.path().join("photo_1.jpg"), "pixels");
        assert!(
            fs::symlink_metadata(fx.dst.path().join("photo.jpg"))
                .unwrap()
                .file_type()
                .is_symlink()
        );
    }

    #[test]
    fn test_dangling_destination_symlink_occupies_name() {
        let fx = TestFixture::new();
        fx.write_src("notes.txt", "notes");
        symlink("gone", fx.dst.path().join("notes.txt")).unwrap();

        fx.dcp().assert().success();

        fx.assert_file_content(&fx.dst.path().join("notes_1.txt"), "notes");
        assert_eq!(
            fs::read_link(fx.dst.path().join("notes.txt")).unwrap(),
            std::path::PathBuf::from("gone")
        );
    }
}
