//! Builder API for ergonomic dedup runs.
//!
//! The builder pattern provides a fluent interface for configuring and executing
//! a run. This is often more convenient than manually constructing
//! [`DedupOptions`].
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use dedupcopy::DedupBuilder;
//!
//! // Dedup copy with defaults
//! let stats = DedupBuilder::new("camera-roll", "photos").run()?;
//! println!("Copied {} files, skipped {} duplicates", stats.files_copied, stats.duplicates_skipped);
//! # Ok::<(), dedupcopy::Error>(())
//! ```
//!
//! ## With Options
//!
//! ```no_run
//! use dedupcopy::DedupBuilder;
//!
//! let stats = DedupBuilder::new("incoming", "library")
//!     .parallel(8)              // Use 8 threads
//!     .recursive_destination()  // Dedup against the whole library tree
//!     .no_fsync()               // Faster, less durable
//!     .run()?;
//! # Ok::<(), dedupcopy::Error>(())
//! ```
//!
//! ## Preview
//!
//! ```no_run
//! use dedupcopy::DedupBuilder;
//!
//! let report = DedupBuilder::new("incoming", "library").plan()?;
//! for task in &report.plan.tasks {
//!     println!("{} -> {}", task.source.display(), task.destination.display());
//! }
//! # Ok::<(), dedupcopy::Error>(())
//! ```

use crate::engine::{DedupStats, PlanReport, dedup_copy, dedup_plan};
use crate::error::Result;
use crate::options::{DedupOptions, ScanMode};
use crate::progress::ProgressHandler;
use std::path::{Path, PathBuf};

/// A builder for configuring and executing a dedup copy.
///
/// # Example
///
/// ```no_run
/// use dedupcopy::DedupBuilder;
///
/// let stats = DedupBuilder::new("/mnt/card/DCIM", "/data/photos")
///     .parallel(16)
///     .no_permissions()
///     .run()?;
/// # Ok::<(), dedupcopy::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DedupBuilder {
    src: PathBuf,
    dst: PathBuf,
    options: DedupOptions,
}

impl DedupBuilder {
    /// Create a new `DedupBuilder` with the given source and destination roots.
    ///
    /// Uses default options (parallel=16, top-level destination scan,
    /// preserve permissions and timestamps, fsync).
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Self {
        Self {
            src: src.as_ref().to_path_buf(),
            dst: dst.as_ref().to_path_buf(),
            options: DedupOptions::default(),
        }
    }

    /// Set the number of parallel threads to use.
    ///
    /// Default is 16. Set to 1 for a sequential run.
    #[must_use]
    pub fn parallel(mut self, threads: usize) -> Self {
        self.options = self.options.with_parallel(threads);
        self
    }

    /// Check for duplicates against the whole destination tree instead of
    /// its top level only.
    ///
    /// Copies still land in the destination's top level.
    #[must_use]
    pub fn recursive_destination(mut self) -> Self {
        self.options = self.options.with_destination_scan(ScanMode::Recursive);
        self
    }

    /// Disable fsync for faster copies.
    ///
    /// **Warning**: Data may be lost if the system crashes shortly after copying.
    #[must_use]
    pub fn no_fsync(mut self) -> Self {
        self.options = self.options.without_fsync();
        self
    }

    /// Disable timestamp preservation.
    #[must_use]
    pub fn no_timestamps(mut self) -> Self {
        self.options = self.options.without_timestamps();
        self
    }

    /// Disable permission preservation.
    ///
    /// Copied files get default permissions (subject to umask).
    #[must_use]
    pub fn no_permissions(mut self) -> Self {
        self.options = self.options.without_permissions();
        self
    }

    /// Set a custom warning handler.
    ///
    /// Receives one message per unreadable entry, hash failure and copy
    /// failure.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dedupcopy::DedupBuilder;
    ///
    /// let stats = DedupBuilder::new("src", "dst")
    ///     .on_warning(|msg| eprintln!("Warning: {}", msg))
    ///     .run()?;
    /// # Ok::<(), dedupcopy::Error>(())
    /// ```
    #[must_use]
    pub fn on_warning(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_warn_handler(handler);
        self
    }

    /// Enable verbose output for per-file decisions.
    ///
    /// The handler is called for every duplicate skipped, file copied and
    /// file admitted without hashing.
    #[must_use]
    pub fn verbose(mut self, handler: fn(&str)) -> Self {
        self.options = self.options.with_verbose_handler(handler);
        self
    }

    /// Report progress per compared file and per copied file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dedupcopy::{DedupBuilder, ProgressHandler};
    ///
    /// let stats = DedupBuilder::new("src", "dst")
    ///     .on_progress(ProgressHandler::new(|phase, done, total| {
    ///         eprintln!("{}: {}/{}", phase.as_str(), done, total);
    ///     }))
    ///     .run()?;
    /// # Ok::<(), dedupcopy::Error>(())
    /// ```
    #[must_use]
    pub fn on_progress(mut self, handler: ProgressHandler) -> Self {
        self.options = self.options.with_progress_handler(handler);
        self
    }

    /// Get a reference to the current options.
    pub fn options(&self) -> &DedupOptions {
        &self.options
    }

    /// Execute the run.
    ///
    /// # Errors
    ///
    /// See [`dedup_copy`]: only invalid roots and an unreadable root are
    /// errors.
    pub fn run(self) -> Result<DedupStats> {
        dedup_copy(&self.src, &self.dst, &self.options)
    }

    /// Scan and plan without copying.
    ///
    /// # Errors
    ///
    /// Same conditions as [`run`](Self::run).
    pub fn plan(self) -> Result<PlanReport> {
        dedup_plan(&self.src, &self.dst, &self.options)
    }
}
