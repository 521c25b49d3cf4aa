//! Configuration options for a dedup copy run.
//!
//! This module provides [`DedupOptions`] for configuring the engine and
//! [`ScanMode`] for choosing how deep each tree is scanned.
//!
//! # Example
//!
//! ```
//! use dedupcopy::{DedupOptions, ScanMode};
//!
//! let options = DedupOptions::default()
//!     .with_parallel(8)
//!     .with_destination_scan(ScanMode::Recursive)
//!     .without_fsync();
//! ```

use crate::progress::ProgressHandler;

/// How far below a root the scanner descends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanMode {
    /// Walk every nested directory.
    Recursive,
    /// Only entries directly inside the root.
    TopLevel,
}

/// Options for a dedup copy run.
///
/// Use [`Default::default()`] to get sensible defaults, then customize
/// using the builder methods.
///
/// # Default Values
///
/// | Field | Default | Description |
/// |-------|---------|-------------|
/// | `parallel` | 16 | Worker threads for scan, hash and copy |
/// | `source_scan` | `Recursive` | Whole source tree |
/// | `destination_scan` | `TopLevel` | Duplicates checked against top-level files only |
/// | `preserve_permissions` | `true` | Copy permission bits |
/// | `preserve_timestamps` | `true` | Copy mtime/atime |
/// | `fsync` | `true` | Sync to disk before the rename |
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DedupOptions {
    /// Number of worker threads (default: 16)
    ///
    /// Bounds the number of files open at once: each worker holds at most
    /// one source and one destination handle.
    pub parallel: usize,

    /// Scan depth for the source tree
    pub source_scan: ScanMode,

    /// Scan depth for the destination tree
    ///
    /// Files below the destination's top level are invisible to duplicate
    /// detection unless this is [`ScanMode::Recursive`].
    pub destination_scan: ScanMode,

    /// Whether to copy permission bits (default: true)
    pub preserve_permissions: bool,

    /// Whether to copy modification and access times (default: true)
    pub preserve_timestamps: bool,

    /// Whether to sync files to disk after writing (default: true)
    pub fsync: bool,

    /// Callback for warnings (optional)
    ///
    /// If not set and `tracing` feature is enabled, warnings are logged via tracing.
    /// Otherwise, warnings are silently ignored.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub warn_handler: Option<fn(&str)>,

    /// Callback for per-file decisions (optional)
    ///
    /// Receives one message per duplicate, copy and failure. Falls back to
    /// `tracing::debug!` when unset and the `tracing` feature is enabled.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub verbose_handler: Option<fn(&str)>,

    /// Callback for per-file progress (optional)
    #[cfg_attr(feature = "serde", serde(skip))]
    pub progress_handler: Option<ProgressHandler>,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            parallel: 16,
            source_scan: ScanMode::Recursive,
            destination_scan: ScanMode::TopLevel,
            preserve_permissions: true,
            preserve_timestamps: true,
            fsync: true,
            warn_handler: None,
            verbose_handler: None,
            progress_handler: None,
        }
    }
}

impl DedupOptions {
    /// Create options with a warning handler
    #[must_use]
    pub fn with_warn_handler(mut self, handler: fn(&str)) -> Self {
        self.warn_handler = Some(handler);
        self
    }

    /// Create options with a verbose handler
    #[must_use]
    pub fn with_verbose_handler(mut self, handler: fn(&str)) -> Self {
        self.verbose_handler = Some(handler);
        self
    }

    /// Create options with a progress handler
    #[must_use]
    pub fn with_progress_handler(mut self, handler: ProgressHandler) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    /// Set the number of worker threads
    ///
    /// Value is clamped to at least 1 to prevent panics.
    #[must_use]
    pub fn with_parallel(mut self, n: usize) -> Self {
        self.parallel = n.max(1);
        self
    }

    /// Set the source scan depth
    #[must_use]
    pub fn with_source_scan(mut self, mode: ScanMode) -> Self {
        self.source_scan = mode;
        self
    }

    /// Set the destination scan depth
    ///
    /// [`ScanMode::Recursive`] extends duplicate detection to the whole
    /// destination tree. Copies still land in the destination's top level.
    #[must_use]
    pub fn with_destination_scan(mut self, mode: ScanMode) -> Self {
        self.destination_scan = mode;
        self
    }

    /// Disable fsync for faster (but less durable) copies
    #[must_use]
    pub fn without_fsync(mut self) -> Self {
        self.fsync = false;
        self
    }

    /// Disable timestamp preservation
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.preserve_timestamps = false;
        self
    }

    /// Disable permission preservation
    ///
    /// Copied files then get the default permissions of a new file under
    /// the current umask.
    #[must_use]
    pub fn without_permissions(mut self) -> Self {
        self.preserve_permissions = false;
        self
    }

    pub(crate) fn warn(&self, msg: &str) {
        if let Some(handler) = self.warn_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("{}", msg);
        }
    }

    pub(crate) fn verbose(&self, msg: &str) {
        if let Some(handler) = self.verbose_handler {
            handler(msg);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("{}", msg);
        }
    }
}
