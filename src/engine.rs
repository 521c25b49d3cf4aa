//! End-to-end orchestration of a dedup copy run.
//!
//! A run validates both roots, scans them concurrently and plans
//! ([`dedup_plan`]), then executes the plan ([`dedup_execute`]). Both phases
//! run on a worker pool sized by [`DedupOptions::parallel`].

use crate::copy::{CopyOutcome, execute_plan};
use crate::error::{Error, Result};
use crate::options::DedupOptions;
use crate::plan::{CopyPlan, PlanStats, plan_copies};
use crate::registry::DuplicateRegistry;
use crate::scan::{ScanCounts, scan_tree};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Summary of a run.
///
/// # Example
///
/// ```no_run
/// use dedupcopy::{dedup_copy, DedupOptions};
/// use std::path::Path;
///
/// let stats = dedup_copy(Path::new("photos"), Path::new("archive"), &DedupOptions::default())?;
/// println!("Copied {} files ({} bytes)", stats.files_copied, stats.bytes_copied);
/// println!("Skipped {} duplicates", stats.duplicates_skipped);
/// # Ok::<(), dedupcopy::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DedupStats {
    /// Regular files found in the source tree
    pub source_files: u64,
    /// Regular files found in the scanned part of the destination
    pub destination_files: u64,
    /// Files written to the destination
    pub files_copied: u64,
    /// Total bytes written
    pub bytes_copied: u64,
    /// Source files not copied because their content is already present
    pub duplicates_skipped: u64,
    /// Source symlinks (never followed, never copied)
    pub symlinks_skipped: u64,
    /// Source fifos, sockets and devices
    pub non_regular_skipped: u64,
    /// Entries in either tree that could not be read during the scan
    pub unreadable: u64,
    /// Source files that could not be fingerprinted
    pub hash_failures: u64,
    /// Planned copies that failed
    pub copy_failures: u64,
    /// How the plan was reached
    pub plan: PlanStats,
    /// Wall time of the run
    pub duration: Duration,
}

impl DedupStats {
    fn from_scans(source: &ScanCounts, destination: &ScanCounts, plan: &PlanStats) -> Self {
        Self {
            source_files: source.files,
            destination_files: destination.files,
            duplicates_skipped: plan.duplicates(),
            symlinks_skipped: source.symlinks,
            non_regular_skipped: source.non_regular,
            unreadable: source.unreadable + destination.unreadable,
            hash_failures: plan.hash_failures,
            plan: *plan,
            ..Self::default()
        }
    }

    fn record_outcomes(&mut self, outcomes: &[CopyOutcome]) {
        for outcome in outcomes {
            if outcome.is_copied() {
                self.files_copied += 1;
                self.bytes_copied += outcome.bytes();
            } else {
                self.copy_failures += 1;
            }
        }
    }

    /// Whether any file was left out because of an error.
    pub fn has_failures(&self) -> bool {
        self.unreadable + self.hash_failures + self.copy_failures > 0
    }
}

/// A plan together with the statistics of the scans that produced it.
///
/// Returned by [`dedup_plan`]; nothing has been copied.
#[derive(Debug, Clone)]
pub struct PlanReport {
    /// Canonical source root
    pub source_root: PathBuf,
    /// Canonical destination root
    pub destination_root: PathBuf,
    /// The tasks that a run would execute
    pub plan: CopyPlan,
    /// Scan and planning counters (copy counters are zero)
    pub stats: DedupStats,
}

/// Validate the roots of a run and return their canonical forms.
///
/// The destination is created (with parents) if it does not exist.
///
/// # Errors
///
/// - Source does not exist ([`Error::SourceNotFound`])
/// - Source is not a directory ([`Error::NotADirectory`])
/// - Destination exists but is not a directory ([`Error::DestinationNotADirectory`])
/// - Destination cannot be created ([`Error::CreateDestination`])
/// - Both resolve to the same directory ([`Error::SameDirectory`])
/// - One lies inside the other ([`Error::NestedDirectories`])
///
/// Nesting is checked before the destination is created, so a rejected
/// run leaves no directory behind.
pub fn prepare_roots(src: &Path, dst: &Path) -> Result<(PathBuf, PathBuf)> {
    let src_meta = match fs::metadata(src) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceNotFound(src.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !src_meta.is_dir() {
        return Err(Error::NotADirectory(src.to_path_buf()));
    }

    let dst_exists = match fs::metadata(dst) {
        Ok(meta) if !meta.is_dir() => {
            return Err(Error::DestinationNotADirectory(dst.to_path_buf()));
        }
        Ok(_) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };

    let src_root = src.canonicalize()?;
    let dst_resolved = if dst_exists {
        dst.canonicalize()?
    } else {
        resolve_missing(dst)?
    };
    check_disjoint(&src_root, &dst_resolved)?;

    if !dst_exists {
        fs::create_dir_all(dst).map_err(|source| Error::CreateDestination {
            path: dst.to_path_buf(),
            source,
        })?;
    }
    let dst_root = dst.canonicalize()?;
    // Recheck in case the created path resolves differently
    check_disjoint(&src_root, &dst_root)?;

    Ok((src_root, dst_root))
}

/// Canonical form of a path that does not exist yet: its deepest existing
/// ancestor, canonicalized, with the missing components appended
fn resolve_missing(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut missing = Vec::new();
    let mut existing = absolute.as_path();
    loop {
        match existing.canonicalize() {
            Ok(base) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(base, |acc: PathBuf, part| acc.join(part)));
            }
            Err(_) => match (existing.parent(), existing.file_name()) {
                (Some(parent), Some(name)) => {
                    missing.push(name.to_os_string());
                    existing = parent;
                }
                // `..` or a root that cannot be resolved; fall back to the raw path
                _ => return Ok(absolute),
            },
        }
    }
}

fn check_disjoint(src_root: &Path, dst_root: &Path) -> Result<()> {
    if src_root == dst_root {
        return Err(Error::SameDirectory(src_root.to_path_buf()));
    }
    if dst_root.starts_with(src_root) {
        return Err(Error::NestedDirectories {
            outer: src_root.to_path_buf(),
            inner: dst_root.to_path_buf(),
        });
    }
    if src_root.starts_with(dst_root) {
        return Err(Error::NestedDirectories {
            outer: dst_root.to_path_buf(),
            inner: src_root.to_path_buf(),
        });
    }
    Ok(())
}

/// Run `op` on a pool with `options.parallel` workers.
///
/// Uses rayon's global pool when it already has the requested size, and
/// falls back to it (with a warning) if a dedicated pool cannot be built.
fn with_pool<T, F>(options: &DedupOptions, op: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    if options.parallel != rayon::current_num_threads() {
        let custom_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.parallel)
            .build();

        match custom_pool {
            Ok(pool) => return pool.install(op),
            Err(e) => {
                options.warn(&format!(
                    "Failed to create thread pool ({e}), using global pool"
                ));
            }
        }
    }
    op()
}

/// Scan both trees concurrently and plan against a fresh registry
fn scan_and_plan(src_root: &Path, dst_root: &Path, options: &DedupOptions) -> Result<PlanReport> {
    let (source, destination) = rayon::join(
        || scan_tree(src_root, options.source_scan, options),
        || scan_tree(dst_root, options.destination_scan, options),
    );
    let (source, destination) = (source?, destination?);

    options.verbose(&format!(
        "scanned {} source files in {} size groups, {} destination files",
        source.index.len(),
        source.index.bucket_count(),
        destination.index.len()
    ));

    let registry = DuplicateRegistry::new();
    let plan = plan_copies(
        &source.index,
        &destination.index,
        dst_root,
        &registry,
        options,
    );
    let stats = DedupStats::from_scans(&source.counts, &destination.counts, &plan.stats);

    Ok(PlanReport {
        source_root: src_root.to_path_buf(),
        destination_root: dst_root.to_path_buf(),
        plan,
        stats,
    })
}

/// Copy every file of `src` whose content is not yet in `dst` into the top
/// level of `dst`.
///
/// Content already present at the destination, or copied earlier in the
/// same run from another source file, is skipped. Copies never overwrite:
/// a taken name gets a numbered variant (`report_1.txt`).
///
/// Equivalent to [`dedup_plan`] followed by [`dedup_execute`].
///
/// # Errors
///
/// Only the fatal conditions of [`prepare_roots`] and an unreadable root
/// are errors. Files that fail to hash or copy are counted in the returned
/// [`DedupStats`] and reported through the warning handler.
///
/// # Example
///
/// ```no_run
/// use dedupcopy::{dedup_copy, DedupOptions};
/// use std::path::Path;
///
/// let options = DedupOptions::default().with_parallel(8);
/// let stats = dedup_copy(Path::new("incoming"), Path::new("library"), &options)?;
/// assert_eq!(stats.copy_failures, 0);
/// # Ok::<(), dedupcopy::Error>(())
/// ```
pub fn dedup_copy(src: &Path, dst: &Path, options: &DedupOptions) -> Result<DedupStats> {
    let report = dedup_plan(src, dst, options)?;
    Ok(dedup_execute(&report, options))
}

/// Scan and plan without copying anything.
///
/// The destination is still created if missing (see [`prepare_roots`]).
pub fn dedup_plan(src: &Path, dst: &Path, options: &DedupOptions) -> Result<PlanReport> {
    let start = Instant::now();
    let (src_root, dst_root) = prepare_roots(src, dst)?;
    let mut report = with_pool(options, || scan_and_plan(&src_root, &dst_root, options))?;
    report.stats.duration = start.elapsed();
    Ok(report)
}

/// Execute a plan produced by [`dedup_plan`] and complete its statistics.
///
/// The returned duration covers planning and copying.
pub fn dedup_execute(report: &PlanReport, options: &DedupOptions) -> DedupStats {
    let start = Instant::now();
    let outcomes = with_pool(options, || execute_plan(&report.plan, options));

    let mut stats = report.stats.clone();
    stats.record_outcomes(&outcomes);
    stats.duration += start.elapsed();

    #[cfg(feature = "tracing")]
    tracing::info!(
        copied = stats.files_copied,
        bytes = stats.bytes_copied,
        duplicates = stats.duplicates_skipped,
        failures = stats.copy_failures,
        elapsed_ms = stats.duration.as_millis() as u64,
        "dedup copy complete"
    );

    stats
}
