//! Parallel execution of a copy plan.

use crate::error::CopyError;
use crate::options::DedupOptions;
use crate::plan::{CopyPlan, CopyTask};
use crate::progress::{ProgressPhase, ProgressTracker};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use super::file::execute_task_internal;

/// What happened to one task.
#[derive(Debug)]
pub enum CopyOutcome {
    /// The file was written
    Copied {
        /// Source file
        source: PathBuf,
        /// Final destination path (may be a numbered variant)
        destination: PathBuf,
        /// Bytes written
        bytes: u64,
    },
    /// The task failed; other tasks are unaffected
    Failed {
        /// Source file
        source: PathBuf,
        /// Destination the task was aiming for
        destination: PathBuf,
        /// Why it failed
        error: CopyError,
    },
}

impl CopyOutcome {
    /// Whether the task wrote its file successfully.
    pub fn is_copied(&self) -> bool {
        matches!(self, Self::Copied { .. })
    }

    /// The source file of the task.
    pub fn source(&self) -> &Path {
        match self {
            Self::Copied { source, .. } | Self::Failed { source, .. } => source,
        }
    }

    /// Bytes written, zero for failures.
    pub fn bytes(&self) -> u64 {
        match self {
            Self::Copied { bytes, .. } => *bytes,
            Self::Failed { .. } => 0,
        }
    }
}

/// Execute every task of `plan` on the current rayon pool.
///
/// Returns one outcome per task, in plan order. Failures are reported
/// through the warning channel and never stop other tasks. The progress
/// handler gets one [`ProgressPhase::Copying`] tick per finished task.
pub fn execute_plan(plan: &CopyPlan, options: &DedupOptions) -> Vec<CopyOutcome> {
    let progress = ProgressTracker::start(
        options.progress_handler.as_ref(),
        ProgressPhase::Copying,
        plan.tasks.len() as u64,
    );
    plan.tasks
        .par_iter()
        .map(|task| {
            let outcome = run_task(task, options);
            progress.tick();
            outcome
        })
        .collect()
}

fn run_task(task: &CopyTask, options: &DedupOptions) -> CopyOutcome {
    match execute_task_internal(task, options) {
        Ok((destination, bytes)) => {
            options.verbose(&format!(
                "copied {} -> {}",
                task.source.display(),
                destination.display()
            ));
            CopyOutcome::Copied {
                source: task.source.clone(),
                destination,
                bytes,
            }
        }
        Err(error) => {
            options.warn(&format!("Failed to copy {}: {}", task.source.display(), error));
            CopyOutcome::Failed {
                source: task.source.clone(),
                destination: task.destination.clone(),
                error,
            }
        }
    }
}
