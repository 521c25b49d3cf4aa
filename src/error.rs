//! Error types for dedupcopy.
//!
//! This module provides three error enums, one per failure scope:
//!
//! | Scope | Type | Effect on the run |
//! |-------|------|-------------------|
//! | Run | [`Error`] | Fatal, returned before or instead of any copying |
//! | Fingerprint | [`HashError`] | The file is excluded from planning and counted |
//! | Copy task | [`CopyError`] | The task is reported failed, siblings continue |
//!
//! [`ErrorCode`] gives every error a stable machine-readable name.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for dedupcopy operations.
///
/// This is a type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Check if an IO error indicates "no space left on device".
///
/// This helper function detects storage-full conditions across platforms.
///
/// # Platform Support
///
/// | Platform | Error Detection |
/// |----------|-----------------|
/// | Unix | `ENOSPC` (errno 28) |
/// | Windows | `ERROR_DISK_FULL` (0x70) |
///
/// # Example
///
/// ```no_run
/// use std::io;
/// use dedupcopy::is_no_space_error;
///
/// let error = io::Error::new(io::ErrorKind::StorageFull, "disk full");
/// assert!(is_no_space_error(&error));
/// ```
pub fn is_no_space_error(error: &io::Error) -> bool {
    if error.kind() == io::ErrorKind::StorageFull {
        return true;
    }

    #[cfg(unix)]
    {
        // The raw OS error might be available even if kind() isn't StorageFull
        if let Some(raw_error) = error.raw_os_error() {
            const ENOSPC: i32 = 28;
            return raw_error == ENOSPC;
        }
    }

    #[cfg(windows)]
    {
        if let Some(raw_error) = error.raw_os_error() {
            const ERROR_DISK_FULL: i32 = 112;
            return raw_error == ERROR_DISK_FULL;
        }
    }

    false
}

/// Stable, machine-readable classification of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// Bad arguments or unusable root paths
    InvalidInput,
    /// Source root does not exist
    SourceNotFound,
    /// Permission denied on a file or directory
    PermissionDenied,
    /// Destination ran out of space
    NoSpace,
    /// Any other IO failure
    IoError,
    /// Failure outside the file system (for example, encoding a report)
    Internal,
}

impl ErrorCode {
    /// The snake_case name used in CLI output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::SourceNotFound => "source_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::NoSpace => "no_space",
            Self::IoError => "io_error",
            Self::Internal => "internal",
        }
    }

    /// Classify an IO error.
    pub fn from_io(error: &io::Error) -> Self {
        if is_no_space_error(error) {
            Self::NoSpace
        } else if error.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied
        } else {
            Self::IoError
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal errors that stop a run.
///
/// These are all detected before the first byte is copied. Per-file
/// problems during hashing or copying never surface as an [`Error`]; they
/// are counted in [`DedupStats`](crate::DedupStats) instead.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// IO error while reading a root directory
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source path does not exist
    #[error("Source path does not exist: {0}")]
    SourceNotFound(PathBuf),

    /// Source is not a directory
    #[error("Source is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Destination exists but is not a directory
    #[error("Destination is not a directory: {0}")]
    DestinationNotADirectory(PathBuf),

    /// Destination did not exist and could not be created
    #[error("Failed to create destination {path}: {source}")]
    CreateDestination {
        /// Destination root
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Source and destination resolve to the same directory
    #[error("Source and destination are the same directory: {0}")]
    SameDirectory(PathBuf),

    /// One root lies inside the other
    #[error("{inner} is nested inside {outer}")]
    NestedDirectories {
        /// The enclosing root
        outer: PathBuf,
        /// The root found inside `outer`
        inner: PathBuf,
    },
}

impl Error {
    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(e) => ErrorCode::from_io(e),
            Self::CreateDestination { source, .. } => ErrorCode::from_io(source),
            Self::SourceNotFound(_) => ErrorCode::SourceNotFound,
            Self::NotADirectory(_)
            | Self::DestinationNotADirectory(_)
            | Self::SameDirectory(_)
            | Self::NestedDirectories { .. } => ErrorCode::InvalidInput,
        }
    }
}

/// Failure to fingerprint a single file.
///
/// The planner never admits a file it could not fingerprint: the file is
/// left out of both duplicate detection and copying.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HashError {
    /// The file could not be opened or a read failed mid-stream
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being hashed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The file length no longer matches the length recorded at scan time
    #[error("{path} changed during the run: expected {expected} bytes, read {actual}")]
    SizeChanged {
        /// File being hashed
        path: PathBuf,
        /// Size recorded by the scanner
        expected: u64,
        /// Bytes actually present
        actual: u64,
    },
}

impl HashError {
    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io { source, .. } => ErrorCode::from_io(source),
            Self::SizeChanged { .. } => ErrorCode::IoError,
        }
    }
}

/// Failure of a single copy task.
///
/// Only the task that produced the error is affected.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CopyError {
    /// Source could not be opened or stat'ed
    #[error("Failed to open source {path}: {source}")]
    Open {
        /// Source file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to create temporary file
    #[error("Failed to create temporary file in {path}: {source}")]
    TempFile {
        /// Directory where temp file creation was attempted
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Reading the source or writing the temp file failed
    #[error("Failed to copy bytes from {path}: {source}")]
    Stream {
        /// Source file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Failed to persist temporary file
    #[error("Failed to persist temporary file to {path}: {source}")]
    Persist {
        /// Target path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Task destination has no file name to derive candidates from
    #[error("Destination has no file name: {0}")]
    NoFileName(PathBuf),

    /// Content was copied but permissions or timestamps could not be applied
    #[error("Copied {path} but failed to apply attributes: {source}")]
    Metadata {
        /// Final destination path (the file exists)
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

impl CopyError {
    /// Classify this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Open { source, .. }
            | Self::TempFile { source, .. }
            | Self::Stream { source, .. }
            | Self::Persist { source, .. }
            | Self::Metadata { source, .. } => ErrorCode::from_io(source),
            Self::NoFileName(_) => ErrorCode::InvalidInput,
        }
    }

    /// Whether the destination file exists despite the failure.
    pub fn content_copied(&self) -> bool {
        matches!(self, Self::Metadata { .. })
    }
}
