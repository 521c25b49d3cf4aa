//! Single task execution.
//!
//! A task is written into a temp file next to its destination and then
//! renamed with `persist_noclobber`, so a destination name is never
//! overwritten and never observed half-written.

use crate::error::CopyError;
use crate::options::DedupOptions;
use crate::plan::CopyTask;
use crate::utils::path::{numbered_name, safe_path};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::utils::{copy_file_contents, preserve_permissions, preserve_timestamps};

/// Pick a name in `dir` for `file_name` that nothing occupies yet.
///
/// Tries `file_name`, then `stem_1.ext`, `stem_2.ext`, ... and returns the
/// first candidate for which no entry of any type exists. The answer can be
/// stale by the time it is used; [`execute_task`] handles that by moving on
/// to the next candidate.
///
/// # Example
///
/// ```
/// use dedupcopy::unique_destination;
/// use std::ffi::OsStr;
///
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::write(dir.path().join("report.txt"), "taken").unwrap();
///
/// let path = unique_destination(dir.path(), OsStr::new("report.txt"));
/// assert_eq!(path, dir.path().join("report_1.txt"));
/// ```
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    first_free(dir, file_name, 0).1
}

/// First free candidate at or after index `start`, with its index
fn first_free(dir: &Path, file_name: &OsStr, start: u64) -> (u64, PathBuf) {
    let mut n = start;
    loop {
        let candidate = dir.join(numbered_name(file_name, n));
        if fs::symlink_metadata(&candidate).is_err() {
            return (n, candidate);
        }
        n += 1;
    }
}

/// Copy one planned file, returning the path it was written to.
///
/// The final name is `task.destination` or, if that is taken, the first
/// free numbered variant (see [`unique_destination`]).
///
/// # Errors
///
/// - Source cannot be opened ([`CopyError::Open`])
/// - Temp file creation fails ([`CopyError::TempFile`])
/// - Reading or writing fails ([`CopyError::Stream`])
/// - Atomic rename fails ([`CopyError::Persist`])
/// - Permissions or timestamps cannot be applied ([`CopyError::Metadata`]).
///   The copied content stays at the final path in this case.
pub fn execute_task(task: &CopyTask, options: &DedupOptions) -> Result<PathBuf, CopyError> {
    execute_task_internal(task, options).map(|(path, _)| path)
}

/// Internal task execution that also returns the bytes copied.
/// Used by execute_plan to build outcomes.
pub(crate) fn execute_task_internal(
    task: &CopyTask,
    options: &DedupOptions,
) -> Result<(PathBuf, u64), CopyError> {
    let (dst_dir, file_name) = match (task.destination.parent(), task.destination.file_name()) {
        (Some(dir), Some(name)) => (dir, name),
        _ => return Err(CopyError::NoFileName(task.destination.clone())),
    };

    let open_error = |source: io::Error| CopyError::Open {
        path: task.source.clone(),
        source,
    };
    let src_file = File::open(safe_path(&task.source)).map_err(open_error)?;
    // Taken before reading so the source atime is the pre-copy one
    let src_meta = src_file.metadata().map_err(open_error)?;

    let temp_file = create_temp_file(dst_dir, options)?;

    let stream_error = |source: io::Error| CopyError::Stream {
        path: task.source.clone(),
        source,
    };
    let bytes_copied = copy_file_contents(&src_file, temp_file.as_file()).map_err(stream_error)?;

    // Ensure data is on disk before rename
    if options.fsync {
        temp_file.as_file().sync_all().map_err(stream_error)?;
    }

    let final_path = persist_unique(temp_file, dst_dir, file_name)?;

    if let Err(source) = apply_attributes(&src_meta, &final_path, options) {
        return Err(CopyError::Metadata {
            path: final_path,
            source,
        });
    }

    Ok((final_path, bytes_copied))
}

/// Files whose final name starts with this refuse their attributes
#[cfg(test)]
pub(crate) const ATTRIBUTE_FAILURE_MARKER: &str = "attr-failure";

fn apply_attributes(
    src_meta: &fs::Metadata,
    final_path: &Path,
    options: &DedupOptions,
) -> io::Result<()> {
    #[cfg(test)]
    if final_path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with(ATTRIBUTE_FAILURE_MARKER))
    {
        return Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "attributes refused",
        ));
    }

    let final_path = safe_path(final_path);
    if options.preserve_permissions {
        preserve_permissions(src_meta, &final_path)?;
    }
    if options.preserve_timestamps {
        preserve_timestamps(src_meta, &final_path)?;
    }
    Ok(())
}

fn create_temp_file(dst_dir: &Path, options: &DedupOptions) -> Result<NamedTempFile, CopyError> {
    let safe_dst_dir = safe_path(dst_dir);
    let temp_error = |source: io::Error| CopyError::TempFile {
        path: dst_dir.to_path_buf(),
        source,
    };

    if options.preserve_permissions {
        // Default tempfile creation (0o600); source permissions are applied after the rename
        return NamedTempFile::new_in(&safe_dst_dir).map_err(temp_error);
    }

    // 0o666 lets the umask decide, as for any newly created file
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tempfile::Builder::new()
            .permissions(fs::Permissions::from_mode(0o666))
            .tempfile_in(&safe_dst_dir)
            .map_err(temp_error)
    }
    #[cfg(not(unix))]
    {
        NamedTempFile::new_in(&safe_dst_dir).map_err(temp_error)
    }
}

/// Rename `temp_file` to the first free candidate name, moving on whenever
/// another writer claims a candidate first
fn persist_unique(
    mut temp_file: NamedTempFile,
    dst_dir: &Path,
    file_name: &OsStr,
) -> Result<PathBuf, CopyError> {
    let mut start = 0;
    loop {
        let (n, candidate) = first_free(dst_dir, file_name, start);
        match temp_file.persist_noclobber(safe_path(&candidate)) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                temp_file = e.file;
                start = n + 1;
            }
            Err(e) => {
                return Err(CopyError::Persist {
                    path: candidate,
                    source: e.error,
                });
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
