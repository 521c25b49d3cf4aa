//! Tree scanning into size-keyed buckets.
//!
//! A scan runs in two phases:
//!
//! 1. Walk the tree sequentially with `read_dir`, classifying each entry
//!    from its directory-entry type (no extra stat, symlinks never followed).
//! 2. Stat the regular-file candidates in parallel. Each rayon worker builds
//!    a private [`SizeIndex`]; the partial indices are merged once all
//!    workers finish, so the hot path takes no locks.

use crate::error::Result;
use crate::options::{DedupOptions, ScanMode};
use rayon::prelude::*;
use std::collections::HashMap;
use std::collections::hash_map;
use std::fs;
use std::path::{Path, PathBuf};

/// A regular file found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Full path of the file
    pub path: PathBuf,
    /// Exact size in bytes at scan time
    pub size: u64,
}

/// Regular files of one tree grouped by exact byte size.
///
/// Order within a bucket is unspecified.
#[derive(Debug, Clone, Default)]
pub struct SizeIndex {
    buckets: HashMap<u64, Vec<FileRecord>>,
    files: usize,
}

impl SizeIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record to the bucket for its size.
    pub fn insert(&mut self, record: FileRecord) {
        self.buckets.entry(record.size).or_default().push(record);
        self.files += 1;
    }

    /// Files of exactly `size` bytes (empty if none).
    pub fn get(&self, size: u64) -> &[FileRecord] {
        self.buckets.get(&size).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether any file of exactly `size` bytes was found.
    pub fn contains_size(&self, size: u64) -> bool {
        self.buckets.contains_key(&size)
    }

    /// Total number of files.
    pub fn len(&self) -> usize {
        self.files
    }

    /// Whether the index holds no files.
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// Number of distinct sizes.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Sum of all file sizes.
    pub fn total_bytes(&self) -> u64 {
        self.buckets
            .iter()
            .map(|(size, files)| size * files.len() as u64)
            .sum()
    }

    /// Iterate over `(size, files)` buckets.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[FileRecord])> {
        self.buckets
            .iter()
            .map(|(size, files)| (*size, files.as_slice()))
    }

    /// Move every record of `other` into `self`.
    pub fn merge(&mut self, other: SizeIndex) {
        self.files += other.files;
        for (size, files) in other.buckets {
            match self.buckets.entry(size) {
                hash_map::Entry::Occupied(mut entry) => entry.get_mut().extend(files),
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(files);
                }
            }
        }
    }
}

impl FromIterator<FileRecord> for SizeIndex {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut index = SizeIndex::new();
        for record in iter {
            index.insert(record);
        }
        index
    }
}

/// Entries seen by a scan, by classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanCounts {
    /// Regular files added to the index
    pub files: u64,
    /// Symbolic links (never followed, never indexed)
    pub symlinks: u64,
    /// Fifos, sockets, devices and other non-regular entries
    pub non_regular: u64,
    /// Directories or entries that could not be read
    pub unreadable: u64,
}

/// Result of [`scan_tree`].
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Regular files by size
    pub index: SizeIndex,
    /// Classification tallies
    pub counts: ScanCounts,
}

/// Output of the sequential walk
#[derive(Default)]
struct Collected {
    candidates: Vec<PathBuf>,
    symlinks: u64,
    non_regular: u64,
    unreadable: u64,
}

/// Scan `root` into a [`SizeIndex`].
///
/// Symlinks and non-regular entries are counted and excluded. With
/// [`ScanMode::TopLevel`] subdirectories are ignored entirely; with
/// [`ScanMode::Recursive`] they are walked (but a symlink to a directory is
/// still just a symlink).
///
/// Metadata retrieval runs on the current rayon pool.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) only if `root` itself cannot be
/// listed. Anything unreadable below the root is counted in
/// [`ScanCounts::unreadable`] and reported through the warning handler.
pub fn scan_tree(root: &Path, mode: ScanMode, options: &DedupOptions) -> Result<ScanReport> {
    let mut collected = Collected::default();

    let entries = fs::read_dir(root)?;
    collect_entries(entries, root, mode, options, &mut collected);

    let (index, vanished) = collected
        .candidates
        .par_iter()
        .fold(
            || (SizeIndex::new(), 0u64),
            |(mut index, mut vanished), path| {
                match fs::symlink_metadata(path) {
                    Ok(meta) if meta.file_type().is_file() => index.insert(FileRecord {
                        path: path.clone(),
                        size: meta.len(),
                    }),
                    Ok(_) => {
                        options.warn(&format!("{} changed type during scan", path.display()));
                        vanished += 1;
                    }
                    Err(e) => {
                        options.warn(&format!(
                            "Failed to read metadata from {}: {}",
                            path.display(),
                            e
                        ));
                        vanished += 1;
                    }
                }
                (index, vanished)
            },
        )
        .reduce(
            || (SizeIndex::new(), 0u64),
            |(mut left, left_vanished), (right, right_vanished)| {
                left.merge(right);
                (left, left_vanished + right_vanished)
            },
        );

    let counts = ScanCounts {
        files: index.len() as u64,
        symlinks: collected.symlinks,
        non_regular: collected.non_regular,
        unreadable: collected.unreadable + vanished,
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        root = %root.display(),
        files = counts.files,
        sizes = index.bucket_count(),
        symlinks = counts.symlinks,
        non_regular = counts.non_regular,
        unreadable = counts.unreadable,
        "scan complete"
    );

    Ok(ScanReport { index, counts })
}

/// Classify the entries of one directory, descending if `mode` allows
fn collect_entries(
    entries: fs::ReadDir,
    dir: &Path,
    mode: ScanMode,
    options: &DedupOptions,
    collected: &mut Collected,
) {
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                options.warn(&format!("Failed to read entry in {}: {}", dir.display(), e));
                collected.unreadable += 1;
                continue;
            }
        };
        let path = entry.path();

        // Check symlink FIRST: DirEntry::file_type never follows links
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                options.warn(&format!("Failed to read type of {}: {}", path.display(), e));
                collected.unreadable += 1;
                continue;
            }
        };

        if file_type.is_symlink() {
            collected.symlinks += 1;
        } else if file_type.is_dir() {
            if mode == ScanMode::Recursive {
                match fs::read_dir(&path) {
                    Ok(children) => collect_entries(children, &path, mode, options, collected),
                    Err(e) => {
                        options.warn(&format!(
                            "Failed to read directory {}: {}",
                            path.display(),
                            e
                        ));
                        collected.unreadable += 1;
                    }
                }
            }
        } else if file_type.is_file() {
            collected.candidates.push(path);
        } else {
            options.verbose(&format!("Skipping special file: {}", path.display()));
            collected.non_regular += 1;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
