//! Progress reporting.
//!
//! A [`ProgressHandler`] set on [`DedupOptions`](crate::DedupOptions) is
//! called once when a phase starts (`done == 0`) and once per finished item:
//! per source file while comparing, per task while copying. The indicatif
//! helpers require the `progress` feature.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The phase a progress update belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Fingerprinting and deciding, one item per source file
    Comparing,
    /// Writing planned files, one item per task
    Copying,
}

impl ProgressPhase {
    /// Short label for display.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comparing => "Comparing",
            Self::Copying => "Copying",
        }
    }
}

/// Callback for progress updates: `(phase, done, total)`
pub type ProgressCallback = Arc<dyn Fn(ProgressPhase, u64, u64) + Send + Sync>;

/// Shared progress callback, cheap to clone.
///
/// Called concurrently from worker threads; `done` values of one phase are
/// distinct but may arrive out of order.
#[derive(Clone)]
pub struct ProgressHandler(ProgressCallback);

impl ProgressHandler {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(ProgressPhase, u64, u64) + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Drive an indicatif bar: its length, position and message follow the
    /// current phase.
    #[cfg(feature = "progress")]
    #[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
    pub fn for_bar(bar: indicatif::ProgressBar) -> Self {
        Self::new(move |phase, done, total| {
            if done == 0 {
                bar.set_length(total);
                bar.set_position(0);
                bar.set_message(phase.as_str());
            } else if done > bar.position() {
                bar.set_position(done);
            }
        })
    }

    fn report(&self, phase: ProgressPhase, done: u64, total: u64) {
        (self.0)(phase, done, total);
    }
}

impl fmt::Debug for ProgressHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ProgressHandler")
    }
}

/// Counts finished items of one phase
pub(crate) struct ProgressTracker<'a> {
    handler: Option<&'a ProgressHandler>,
    phase: ProgressPhase,
    total: u64,
    done: AtomicU64,
}

impl<'a> ProgressTracker<'a> {
    /// Announce the phase with its total
    pub(crate) fn start(
        handler: Option<&'a ProgressHandler>,
        phase: ProgressPhase,
        total: u64,
    ) -> Self {
        if let Some(handler) = handler {
            handler.report(phase, 0, total);
        }
        Self {
            handler,
            phase,
            total,
            done: AtomicU64::new(0),
        }
    }

    pub(crate) fn tick(&self) {
        if let Some(handler) = self.handler {
            let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
            handler.report(self.phase, done, self.total);
        }
    }
}

/// Create a default progress bar for the comparing and copying phases
#[cfg(feature = "progress")]
#[cfg_attr(docsrs, doc(cfg(feature = "progress")))]
#[must_use]
pub fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos}/{len} files ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}
