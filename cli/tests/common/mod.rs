//! Common test utilities for integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A test fixture that provides source and destination directories.
pub struct TestFixture {
    pub src: TempDir,
    pub dst: TempDir,
}

impl TestFixture {
    /// Create a new test fixture with fresh source and destination directories.
    pub fn new() -> Self {
        Self {
            src: TempDir::new().expect("Failed to create temp source dir"),
            dst: TempDir::new().expect("Failed to create temp dest dir"),
        }
    }

    /// Write a file below the source root, creating parent directories.
    pub fn write_src(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_file(self.src.path(), relative, content)
    }

    /// Write a file below the destination root, creating parent directories.
    pub fn write_dst(&self, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
        write_file(self.dst.path(), relative, content)
    }

    /// A `dcp SOURCE DESTINATION` command with the progress bar and fsync disabled.
    pub fn dcp(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("dcp");
        cmd.arg("-q")
            .arg("--no-sync")
            .arg(self.src.path())
            .arg(self.dst.path());
        cmd
    }

    /// Sorted names of the regular files directly inside the destination.
    pub fn dst_names(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.dst.path())
            .expect("Failed to read directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Sorted contents of the regular files directly inside the destination.
    pub fn dst_contents(&self) -> Vec<Vec<u8>> {
        let mut contents: Vec<Vec<u8>> = fs::read_dir(self.dst.path())
            .expect("Failed to read directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| fs::read(e.path()).expect("Failed to read file"))
            .collect();
        contents.sort();
        contents
    }

    /// Count all files in a directory (non-recursive).
    pub fn count_files(&self, dir: &Path) -> usize {
        fs::read_dir(dir)
            .expect("Failed to read directory")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count()
    }

    /// Check if a file exists and has the expected content.
    pub fn assert_file_content(&self, path: &Path, expected: &str) {
        assert!(path.exists(), "File does not exist: {:?}", path);
        let actual = fs::read_to_string(path).expect("Failed to read file");
        assert_eq!(actual, expected, "File content mismatch");
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn write_file(root: &Path, relative: &str, content: impl AsRef<[u8]>) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(&path, content).expect("Failed to write file");
    path
}
