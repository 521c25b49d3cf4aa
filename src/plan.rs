//! Duplicate detection: turning two size indices into a copy plan.
//!
//! # Strategy
//!
//! Every source size bucket is planned independently and in parallel:
//!
//! 1. A lone source file whose size does not occur at the destination, and
//!    that the registry has never seen, is admitted without reading a byte.
//!    A different size proves different content. The registry records the
//!    file unhashed so a later plan meeting the same size fingerprints it.
//! 2. Otherwise, the destination files of that size, and any file an earlier
//!    plan admitted unhashed, are fully hashed once and their fingerprints
//!    seeded into the [`DuplicateRegistry`].
//! 3. Each source file in the bucket gets a partial fingerprint. A partial
//!    match against a file already accepted in this run flags a probable
//!    duplicate, which is cheaply rejected if its full fingerprint is
//!    already registered. The full fingerprint is computed for every file
//!    regardless, since partial samples cannot prove equality.
//! 4. [`DuplicateRegistry::try_register`] makes the final call. Losing means
//!    duplicate; winning emits a [`CopyTask`].

use crate::error::HashError;
use crate::hash::{FullFingerprint, full_fingerprint_expecting, partial_fingerprint_expecting};
use crate::options::DedupOptions;
use crate::progress::{ProgressPhase, ProgressTracker};
use crate::registry::DuplicateRegistry;
use crate::scan::{FileRecord, SizeIndex};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// One planned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyTask {
    /// File to copy
    pub source: PathBuf,
    /// Preferred destination (`<dest root>/<source file name>`)
    ///
    /// The executor picks a numbered variant if this name is taken.
    pub destination: PathBuf,
    /// Size recorded at scan time
    pub size: u64,
}

/// Counters describing how a plan was reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanStats {
    /// Admitted because their size was unique across both trees
    pub unique_size: u64,
    /// Admitted after full-fingerprint confirmation
    pub hashed_unique: u64,
    /// Skipped: content already present at the destination
    pub duplicates_of_destination: u64,
    /// Skipped: content accepted earlier in this run from another source file
    pub duplicates_within_source: u64,
    /// Source files whose partial fingerprint matched an accepted file
    pub probable_duplicates: u64,
    /// Probable duplicates that turned out to differ
    pub partial_false_positives: u64,
    /// Source files excluded because they could not be fingerprinted
    pub hash_failures: u64,
    /// Destination files that could not be fingerprinted (ignored)
    pub destination_hash_failures: u64,
    /// Partial fingerprints computed
    pub partial_hashes: u64,
    /// Full fingerprints computed (source and destination)
    pub full_hashes: u64,
}

impl PlanStats {
    /// All skipped duplicates.
    pub fn duplicates(&self) -> u64 {
        self.duplicates_of_destination + self.duplicates_within_source
    }

    /// All admitted files (equals the number of tasks).
    pub fn admitted(&self) -> u64 {
        self.unique_size + self.hashed_unique
    }
}

/// Tasks to execute plus the statistics of how they were chosen.
#[derive(Debug, Clone, Default)]
pub struct CopyPlan {
    /// One task per admitted source file
    pub tasks: Vec<CopyTask>,
    /// Planning counters
    pub stats: PlanStats,
}

impl CopyPlan {
    /// Total bytes the plan will copy.
    pub fn total_bytes(&self) -> u64 {
        self.tasks.iter().map(|task| task.size).sum()
    }
}

/// Shared tallies, bumped lock-free by workers
#[derive(Default)]
struct Counters {
    unique_size: AtomicU64,
    hashed_unique: AtomicU64,
    duplicates_of_destination: AtomicU64,
    duplicates_within_source: AtomicU64,
    probable_duplicates: AtomicU64,
    partial_false_positives: AtomicU64,
    hash_failures: AtomicU64,
    destination_hash_failures: AtomicU64,
    partial_hashes: AtomicU64,
    full_hashes: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl Counters {
    fn snapshot(&self) -> PlanStats {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        PlanStats {
            unique_size: get(&self.unique_size),
            hashed_unique: get(&self.hashed_unique),
            duplicates_of_destination: get(&self.duplicates_of_destination),
            duplicates_within_source: get(&self.duplicates_within_source),
            probable_duplicates: get(&self.probable_duplicates),
            partial_false_positives: get(&self.partial_false_positives),
            hash_failures: get(&self.hash_failures),
            destination_hash_failures: get(&self.destination_hash_failures),
            partial_hashes: get(&self.partial_hashes),
            full_hashes: get(&self.full_hashes),
        }
    }
}

struct Planner<'a> {
    dest_root: &'a Path,
    registry: &'a DuplicateRegistry,
    options: &'a DedupOptions,
    counters: Counters,
    progress: ProgressTracker<'a>,
}

/// Decide which source files to copy into `dest_root`.
///
/// `registry` may already hold fingerprints (for example from an earlier
/// plan against the same destination); they are honored as existing
/// content. The registry is left populated with everything seen: files
/// admitted by size alone are recorded unhashed and fingerprinted by the
/// first later plan that meets their size.
///
/// The progress handler in `options` gets one [`ProgressPhase::Comparing`]
/// tick per source file.
///
/// Runs on the current rayon pool. Never fails: files that cannot be
/// fingerprinted are counted in [`PlanStats::hash_failures`] and left out.
pub fn plan_copies(
    source: &SizeIndex,
    destination: &SizeIndex,
    dest_root: &Path,
    registry: &DuplicateRegistry,
    options: &DedupOptions,
) -> CopyPlan {
    let planner = Planner {
        dest_root,
        registry,
        options,
        counters: Counters::default(),
        progress: ProgressTracker::start(
            options.progress_handler.as_ref(),
            ProgressPhase::Comparing,
            source.len() as u64,
        ),
    };

    let buckets: Vec<(u64, &[FileRecord])> = source.iter().collect();
    let tasks: Vec<CopyTask> = buckets
        .par_iter()
        .flat_map_iter(|&(size, files)| planner.plan_bucket(size, files, destination.get(size)))
        .collect();

    let stats = planner.counters.snapshot();

    #[cfg(feature = "tracing")]
    tracing::debug!(
        tasks = tasks.len(),
        duplicates = stats.duplicates(),
        partial_hashes = stats.partial_hashes,
        full_hashes = stats.full_hashes,
        "plan complete"
    );

    CopyPlan { tasks, stats }
}

impl Planner<'_> {
    fn plan_bucket(
        &self,
        size: u64,
        files: &[FileRecord],
        dest_files: &[FileRecord],
    ) -> Vec<CopyTask> {
        if let [only] = files {
            if dest_files.is_empty() && self.registry.claim_size(size, &only.path) {
                bump(&self.counters.unique_size);
                self.options
                    .verbose(&format!("unique size {} ({} bytes)", only.path.display(), size));
                self.progress.tick();
                return vec![self.task_for(only)];
            }
        }

        let dest_fingerprints = self.seed_destination(size, dest_files);
        self.seed_unhashed(size);

        files
            .par_iter()
            .filter_map(|record| {
                let task = self.plan_file(record, &dest_fingerprints);
                self.progress.tick();
                task
            })
            .collect()
    }

    /// Fingerprint files an earlier plan admitted by size alone
    fn seed_unhashed(&self, size: u64) {
        let pending = self.registry.take_unhashed(size);
        if pending.is_empty() {
            return;
        }

        let fingerprints: Vec<FullFingerprint> = pending
            .par_iter()
            .filter_map(|path| {
                bump(&self.counters.full_hashes);
                full_fingerprint_expecting(path, size)
                    .map_err(|e| {
                        self.options
                            .warn(&format!("Ignoring previously admitted file: {}", e))
                    })
                    .ok()
            })
            .collect();
        self.registry.seed(size, fingerprints);
    }

    /// Fully hash the destination files of one size and register them
    fn seed_destination(&self, size: u64, dest_files: &[FileRecord]) -> HashSet<FullFingerprint> {
        let fingerprints: HashSet<FullFingerprint> = dest_files
            .par_iter()
            .filter_map(|record| {
                bump(&self.counters.full_hashes);
                match full_fingerprint_expecting(&record.path, size) {
                    Ok(fingerprint) => Some(fingerprint),
                    Err(e) => {
                        bump(&self.counters.destination_hash_failures);
                        self.options
                            .warn(&format!("Ignoring destination file: {}", e));
                        None
                    }
                }
            })
            .collect();

        if !fingerprints.is_empty() {
            self.registry.seed(size, fingerprints.iter().copied());
        }
        fingerprints
    }

    fn plan_file(
        &self,
        record: &FileRecord,
        dest_fingerprints: &HashSet<FullFingerprint>,
    ) -> Option<CopyTask> {
        let size = record.size;

        bump(&self.counters.partial_hashes);
        let partial = match partial_fingerprint_expecting(&record.path, size) {
            Ok(partial) => partial,
            Err(e) => return self.hash_failed(e),
        };

        let probable = self.registry.has_partial(size, &partial);
        if probable {
            bump(&self.counters.probable_duplicates);
        }

        bump(&self.counters.full_hashes);
        let full = match full_fingerprint_expecting(&record.path, size) {
            Ok(full) => full,
            Err(e) => return self.hash_failed(e),
        };

        // Fingerprints are never removed from the registry
        let rejected = (probable && self.registry.contains(size, &full))
            || !self.registry.try_register(size, full);

        if rejected {
            if dest_fingerprints.contains(&full) {
                bump(&self.counters.duplicates_of_destination);
                self.options.verbose(&format!(
                    "duplicate {} (already at destination, {})",
                    record.path.display(),
                    full
                ));
            } else {
                bump(&self.counters.duplicates_within_source);
                self.options.verbose(&format!(
                    "duplicate {} (copied from another source file, {})",
                    record.path.display(),
                    full
                ));
            }
            return None;
        }

        self.registry.note_partial(size, partial);
        if probable {
            bump(&self.counters.partial_false_positives);
        }
        bump(&self.counters.hashed_unique);
        self.options
            .verbose(&format!("new content {} ({})", record.path.display(), full));
        Some(self.task_for(record))
    }

    fn hash_failed(&self, error: HashError) -> Option<CopyTask> {
        bump(&self.counters.hash_failures);
        self.options.warn(&format!("Skipping file: {}", error));
        None
    }

    fn task_for(&self, record: &FileRecord) -> CopyTask {
        let name = record
            .path
            .file_name()
            .unwrap_or(record.path.as_os_str());
        CopyTask {
            source: record.path.clone(),
            destination: self.dest_root.join(name),
            size: record.size,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
