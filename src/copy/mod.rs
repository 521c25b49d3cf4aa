//! Copy execution.
//!
//! This module writes planned files into the destination with atomic
//! writes: a temp file in the destination directory is renamed into place
//! with no-clobber semantics, so existing files are never overwritten and
//! name collisions resolve to numbered variants.

mod exec;
mod file;
mod utils;

// Re-export public API
pub use exec::{CopyOutcome, execute_plan};
pub use file::{execute_task, unique_destination};
