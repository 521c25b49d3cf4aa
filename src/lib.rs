//! # dedupcopy
//!
//! Parallel, content-aware deduplicating directory copy for Rust.
//!
//! Merges a source tree into a destination directory, copying each distinct
//! file content at most once. Content already present at the destination, or
//! already copied from another source file, is skipped.
//!
//! ## Core Features
//!
//! - **Size-first filtering**: a file whose size occurs nowhere else is copied without being read twice
//! - **Two-tier fingerprints**: xxh3 over the head and tail flags probable duplicates, BLAKE3 over the whole file decides
//! - **Race-free decisions**: one registry check-and-insert per file, so identical files never both get copied
//! - **Parallel everything**: scanning, hashing and copying run on one rayon pool (default 16 threads)
//! - **Atomic writes**: temp file + `persist_noclobber`, never overwriting an existing name
//! - **Collision naming**: a taken name becomes `name_1.ext`, `name_2.ext`, ...
//! - **Permission and timestamp preserving**
//!
//! ## Quick Start with Builder API
//!
//! ```no_run
//! use dedupcopy::DedupBuilder;
//!
//! let stats = DedupBuilder::new("incoming", "library").run()?;
//! println!(
//!     "Copied {} files ({} bytes), skipped {} duplicates",
//!     stats.files_copied, stats.bytes_copied, stats.duplicates_skipped
//! );
//! # Ok::<(), dedupcopy::Error>(())
//! ```
//!
//! ## Function API
//!
//! ```no_run
//! use dedupcopy::{dedup_copy, DedupOptions, ScanMode};
//! use std::path::Path;
//!
//! let options = DedupOptions::default()
//!     .with_parallel(8)                               // Limit parallelism
//!     .with_destination_scan(ScanMode::Recursive)     // Dedup against the whole tree
//!     .without_fsync();                               // Faster but less durable
//!
//! let stats = dedup_copy(Path::new("incoming"), Path::new("library"), &options)?;
//! # Ok::<(), dedupcopy::Error>(())
//! ```
//!
//! The building blocks ([`scan_tree`], [`plan_copies`], [`execute_plan`],
//! [`DuplicateRegistry`]) are public for callers that need their own
//! orchestration.
//!
//! ## What Gets Copied
//!
//! - Regular files anywhere below the source root, flattened into the
//!   destination's top level
//! - Symlinks are never followed and never copied; fifos, sockets and
//!   devices are skipped. Both are counted in [`DedupStats`].
//! - By default only the destination's top-level files count as existing
//!   content. See [`DedupOptions::with_destination_scan`].
//!
//! ## Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tracing` | Structured logging with tracing crate |
//! | `progress` | indicatif helpers: `ProgressHandler::for_bar`, `create_progress_bar` |
//! | `serde` | Serialize/Deserialize for [`DedupOptions`] and [`DedupStats`] |
//! | `full` | Enable all optional features |

#![cfg_attr(docsrs, feature(doc_cfg))]

mod builder;
mod copy;
mod engine;
mod error;
mod hash;
mod options;
mod plan;
mod progress;
mod registry;
mod scan;
pub mod utils;

pub use builder::DedupBuilder;
pub use copy::{CopyOutcome, execute_plan, execute_task, unique_destination};
pub use engine::{
    DedupStats, PlanReport, dedup_copy, dedup_execute, dedup_plan, prepare_roots,
};
pub use error::{CopyError, Error, ErrorCode, HashError, Result, is_no_space_error};
pub use hash::{
    FullFingerprint, PARTIAL_WINDOW, PartialFingerprint, buffer_size, full_fingerprint,
    full_fingerprint_expecting, page_size, partial_fingerprint, partial_fingerprint_expecting,
};
pub use options::{DedupOptions, ScanMode};
pub use plan::{CopyPlan, CopyTask, PlanStats, plan_copies};
pub use progress::{ProgressCallback, ProgressHandler, ProgressPhase};
#[cfg(feature = "progress")]
pub use progress::create_progress_bar;
pub use registry::DuplicateRegistry;
pub use scan::{FileRecord, ScanCounts, ScanReport, SizeIndex, scan_tree};
